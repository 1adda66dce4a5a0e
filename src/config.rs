use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR: &str = ".PointTracker";
const CONFIG_FILE: &str = "config.json";
const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const SHEETS_TOKEN_ENV: &str = "POINTTRACKER_SHEETS_TOKEN";
const MIN_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Sqlite,
    Sheets,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => f.write_str("sqlite"),
            Backend::Sheets => f.write_str("sheets"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "sqlite" | "local" => Ok(Backend::Sqlite),
            "sheets" | "gsheets" | "google_sheets" => Ok(Backend::Sheets),
            other => bail!("Unsupported backend: {other}. Use sqlite or sheets"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub db_path: PathBuf,
    pub spreadsheet_id: Option<String>,
    pub sheets_api_base_url: String,
    pub sheets_access_token: Option<String>,
    pub sheets_timeout_seconds: u64,
    pub api_port: u16,
    pub chart_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            db_path: default_root_dir().join("db").join("points.db"),
            spreadsheet_id: None,
            sheets_api_base_url: DEFAULT_SHEETS_API_BASE_URL.to_string(),
            sheets_access_token: None,
            sheets_timeout_seconds: 20,
            api_port: 7891,
            chart_width: 40,
        }
    }
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        Ok(default_root_dir().join(CONFIG_FILE))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(&config_path)?;

        Ok(())
    }

    /// Access token for the Sheets backend. The environment wins over the file.
    pub fn resolve_sheets_token(&self) -> Option<String> {
        std::env::var(SHEETS_TOKEN_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                self.sheets_access_token
                    .clone()
                    .filter(|value| !value.trim().is_empty())
            })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "backend" => {
                self.backend = value.parse()?;
            }
            "db_path" => {
                self.db_path = expand_home(value.trim());
            }
            "spreadsheet_id" => {
                self.spreadsheet_id = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "sheets_api_base_url" => {
                self.sheets_api_base_url = value.trim().trim_end_matches('/').to_string();
            }
            "sheets_access_token" => {
                self.sheets_access_token = (!value.trim().is_empty()).then_some(value.to_string());
            }
            "sheets_timeout_seconds" => {
                self.sheets_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("sheets_timeout_seconds must be a number"))?
                    .max(MIN_TIMEOUT_SECONDS);
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "chart_width" => {
                let width = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("chart_width must be a number"))?;
                if width == 0 {
                    bail!("chart_width must be at least 1");
                }
                self.chart_width = width;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: backend, db_path|db.path, spreadsheet_id|sheets.spreadsheet_id, sheets_api_base_url|sheets.base_url, sheets_access_token|sheets.access_token, sheets_timeout_seconds|sheets.timeout_seconds, api_port|api.port, chart_width|recap.chart_width"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "backend" => Some(self.backend.to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "spreadsheet_id" => Some(
                self.spreadsheet_id
                    .clone()
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "sheets_api_base_url" => Some(self.sheets_api_base_url.clone()),
            "sheets_access_token" => Some(
                self.sheets_access_token
                    .as_ref()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "sheets_timeout_seconds" => Some(self.sheets_timeout_seconds.to_string()),
            "api_port" => Some(self.api_port.to_string()),
            "chart_width" => Some(self.chart_width.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "backend" | "store.backend" => "backend",
        "db_path" | "db.path" => "db_path",
        "spreadsheet_id" | "sheets.spreadsheet_id" => "spreadsheet_id",
        "sheets_api_base_url" | "sheets.base_url" => "sheets_api_base_url",
        "sheets_access_token" | "sheets.access_token" => "sheets_access_token",
        "sheets_timeout_seconds" | "sheets.timeout_seconds" => "sheets_timeout_seconds",
        "api_port" | "api.port" => "api_port",
        "chart_width" | "recap.chart_width" => "chart_width",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
