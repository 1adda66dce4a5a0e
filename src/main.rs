mod api;
mod cli;
mod config;
mod error;
mod render;
mod store;
mod tracker;

use crate::cli::onboard::run_onboarding;
use crate::cli::{CatalogCommands, Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::error::TrackerError;
use crate::store::{CATALOG_TABLE, LOG_TABLE, RECAP_TABLE, TableStore};
use crate::tracker::Tracker;
use crate::tracker::catalog::{ActivityCatalogEntry, save_catalog};
use crate::tracker::log::{Approval, display_order};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            let _ = run_onboarding()?;
            Ok(())
        }
        Commands::Config { command } => handle_config_command(command),
        Commands::Status => handle_status(),
        Commands::Doctor => handle_doctor(),
        Commands::Catalog { command } => handle_catalog_command(command),
        Commands::Log { limit } => handle_log(limit),
        Commands::Submit {
            activity,
            date,
            approval,
        } => handle_submit(&activity, date, &approval),
        Commands::Recap { recompute } => handle_recap(recompute),
        Commands::Serve => {
            let config = load_or_default_config()?;
            run_service(config).await
        }
    }
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.save()?;

            let masked = if key.contains("token") {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_status() -> Result<()> {
    let config = load_or_default_config()?;
    let mut table_store = store::connect(&config)?;
    let (tracker, load_error) = Tracker::load(table_store.as_mut());

    println!("PointTracker status");
    println!("- store: {}", tracker.describe_store());
    println!("- activities: {}", tracker.catalog().len());
    println!("- log_entries: {}", tracker.log().len());
    println!(
        "- latest_entry_date: {}",
        tracker
            .log()
            .iter()
            .map(|entry| entry.date)
            .max()
            .map(|date| date.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    println!(
        "- recap_days: {}",
        tracker
            .stored_recap()
            .map(|rows| rows.len().to_string())
            .unwrap_or_else(|error| format!("unreadable ({error})"))
    );

    if let Some(error) = load_error {
        println!("[WARN] {error}");
    }

    Ok(())
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path()?;
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing".to_string());
    }

    let config = load_or_default_config()?;

    let mut table_store = match store::connect(&config) {
        Ok(table_store) => {
            println!("[OK] {} store reachable: {}", config.backend, table_store.describe());
            table_store
        }
        Err(error) => {
            println!("[WARN] store check failed: {error}");
            println!("doctor result: {} warning(s)", issues.len() + 1);
            return Ok(());
        }
    };

    for table in [CATALOG_TABLE, LOG_TABLE, RECAP_TABLE] {
        match table_store.read_rows(table) {
            Ok(rows) if rows.is_empty() => {
                println!("[WARN] sheet {table} has no header row (run `PointTracker onboard`)");
                issues.push(format!("{table} header missing"));
            }
            Ok(rows) => println!("[OK] sheet {table}: {} data row(s)", rows.len() - 1),
            Err(error) => {
                println!("[WARN] sheet {table} unreadable: {error:#}");
                issues.push(format!("{table} unreadable"));
            }
        }
    }

    let (tracker, load_error) = Tracker::load(table_store.as_mut());
    match load_error {
        Some(error) => {
            println!("[WARN] {error}");
            issues.push("worksheets unreadable".to_string());
        }
        None if tracker.catalog().is_empty() => {
            println!("[WARN] activity catalog is empty, submissions are disabled");
            issues.push("catalog empty".to_string());
        }
        None => println!("[OK] activity catalog: {} activities", tracker.catalog().len()),
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}

fn handle_catalog_command(command: CatalogCommands) -> Result<()> {
    let config = load_or_default_config()?;
    let mut table_store = store::connect(&config)?;
    let (mut tracker, load_error) = Tracker::load(table_store.as_mut());

    match command {
        CatalogCommands::List => {
            if let Some(error) = load_error {
                println!("[WARN] {error}");
            } else if tracker.catalog().is_empty() {
                println!("[WARN] Could not load Activity List from {CATALOG_TABLE}.");
            }
            println!("{}", render::render_catalog(tracker.catalog()));
            Ok(())
        }
        CatalogCommands::Set { name, points } => {
            if let Some(error) = load_error {
                return Err(error).context("Refusing to rewrite a catalog that could not be read");
            }
            let name = name.trim().to_string();
            if name.is_empty() {
                bail!("Activity name must not be empty");
            }

            let mut catalog = tracker.catalog().clone();
            catalog.insert(ActivityCatalogEntry {
                name: name.clone(),
                points,
            });
            save_catalog(tracker.store(), &catalog)?;

            info!(activity = %name, points, "catalog updated");
            println!("Catalog saved: {name} = {points}");
            Ok(())
        }
    }
}

fn handle_log(limit: Option<usize>) -> Result<()> {
    let config = load_or_default_config()?;
    let mut table_store = store::connect(&config)?;
    let (tracker, load_error) = Tracker::load(table_store.as_mut());

    if let Some(error) = load_error {
        println!("[WARN] {error}");
    }

    let entries = display_order(tracker.log())
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .collect::<Vec<_>>();

    println!("Log History");
    println!("{}", render::render_log(&entries));
    Ok(())
}

fn handle_submit(activity: &str, date: Option<String>, approval: &str) -> Result<()> {
    let config = load_or_default_config()?;
    let target_date = parse_optional_date(date)?;
    let approval = approval.parse::<Approval>()?;

    let mut table_store = store::connect(&config)?;
    let (mut tracker, load_error) = Tracker::load(table_store.as_mut());

    if let Some(error) = load_error {
        return Err(error.into());
    }
    if tracker.catalog().is_empty() {
        warn!("activity catalog is empty");
        return Err(TrackerError::CatalogUnavailable.into());
    }

    let submission = tracker.submit(target_date, activity, approval)?;
    println!("Saved: {activity} (No {})", submission.assigned_id);

    if let Err(error) = tracker.refresh() {
        warn!(error = %error, "reload after submit failed");
    }

    println!("\nPoints Recap");
    println!(
        "{}",
        render::render_recap(&submission.recap, config.chart_width)
    );
    Ok(())
}

fn handle_recap(recompute: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let mut table_store = store::connect(&config)?;
    let (mut tracker, load_error) = Tracker::load(table_store.as_mut());

    if recompute {
        if let Some(error) = load_error {
            return Err(error).context("Recap was not recomputed");
        }
        let rows = tracker.recompute()?;
        println!("Recap recomputed: {} day(s)", rows.len());
    } else if let Some(error) = load_error {
        println!("[WARN] {error}");
    }

    let recap = tracker.stored_recap()?;
    println!("Points Recap");
    println!("{}", render::render_recap(&recap, config.chart_width));
    Ok(())
}

async fn run_service(config: Config) -> Result<()> {
    let shared_config = Arc::new(config);

    info!("PointTracker service started");

    tokio::select! {
        api_result = api::run_server(Arc::clone(&shared_config)) => {
            api_result?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

fn parse_optional_date(input: Option<String>) -> Result<NaiveDate> {
    input
        .as_deref()
        .map(|date| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("Invalid date format: {date}. Example: 2024-01-01"))
        })
        .transpose()?
        .map_or_else(|| Ok(Local::now().date_naive()), Ok)
}

fn load_or_default_config() -> Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(_) => {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }
}
