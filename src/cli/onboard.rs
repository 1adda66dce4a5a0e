use crate::config::{Backend, Config, SHEETS_TOKEN_ENV, expand_home};
use crate::store;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

pub fn run_onboarding() -> Result<Config> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to PointTracker onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let mut config = Config::default();

    println!("\n[1/3] Select storage backend");
    let backends = ["Local SQLite file", "Google Sheets"];
    let selected_index = Select::with_theme(&theme)
        .with_prompt("  Where should activities be stored?")
        .default(0)
        .items(&backends)
        .interact()
        .context("Failed to select storage backend")?;
    config.backend = if selected_index == 1 {
        Backend::Sheets
    } else {
        Backend::Sqlite
    };
    println!("  ✓ Backend: {}", config.backend);

    println!("\n[2/3] Storage location");
    match config.backend {
        Backend::Sqlite => {
            let db_path_input: String = Input::with_theme(&theme)
                .with_prompt("  SQLite file")
                .default(config.db_path.display().to_string())
                .interact_text()
                .context("Failed to read database path")?;
            config.db_path = expand_home(&db_path_input);
            println!("  ✓ {}", config.db_path.display());
        }
        Backend::Sheets => {
            let spreadsheet_id: String = Input::with_theme(&theme)
                .with_prompt("  Spreadsheet id (from the sheet URL)")
                .validate_with(|input: &String| -> std::result::Result<(), &str> {
                    if input.trim().is_empty() {
                        Err("Spreadsheet id is required")
                    } else {
                        Ok(())
                    }
                })
                .interact_text()
                .context("Failed to read spreadsheet id")?;
            config.set_value("spreadsheet_id", &spreadsheet_id)?;

            let token: String = Input::with_theme(&theme)
                .with_prompt(format!(
                    "  OAuth access token (leave empty to use {SHEETS_TOKEN_ENV})"
                ))
                .allow_empty(true)
                .interact_text()
                .context("Failed to read access token")?;
            config.set_value("sheets_access_token", &token)?;
            println!("  ✓ Spreadsheet {spreadsheet_id}");
        }
    }

    config.save()?;

    println!("\n[3/3] Prepare sheets");
    let initialize = Confirm::with_theme(&theme)
        .with_prompt("  Connect now and create missing sheet headers?")
        .default(true)
        .interact()
        .context("Failed to read sheet initialization input")?;

    if initialize {
        let mut table_store = store::connect(&config)?;
        let initialized = store::bootstrap_headers(table_store.as_mut())?;
        if initialized.is_empty() {
            println!("  ✓ All sheets already have headers");
        } else {
            println!("  ✓ Initialized: {}", initialized.join(", "));
        }
    } else {
        println!("  ✓ Skipped sheet initialization");
    }

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    println!("  Add activities with PointTracker catalog set <name> <points>.");
    println!("  Run PointTracker status to check current state.");
    println!("──────────────────────────────────────────");

    Ok(config)
}
