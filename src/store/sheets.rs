use super::TableStore;
use crate::config::{Config, SHEETS_TOKEN_ENV};
use anyhow::{Context, Result, anyhow, bail};
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub access_token: String,
    pub timeout_seconds: u64,
}

impl SheetsSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .filter(|value| !value.trim().is_empty())
            .context(
                "Spreadsheet id is missing. Set `PointTracker config set sheets.spreadsheet_id <ID>`.",
            )?;
        let access_token = config.resolve_sheets_token().with_context(|| {
            format!(
                "Sheets access token is missing. Set `PointTracker config set sheets.access_token <TOKEN>` or `{SHEETS_TOKEN_ENV}`."
            )
        })?;

        Ok(Self {
            base_url: config.sheets_api_base_url.clone(),
            spreadsheet_id,
            access_token,
            timeout_seconds: config.sheets_timeout_seconds.max(5),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    values: Option<Vec<Vec<Value>>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    properties: Option<SpreadsheetProperties>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    title: Option<String>,
}

/// Google Sheets v4 values API. Every call runs on its own worker thread so the
/// blocking client never touches the async runtime.
pub struct SheetsTableStore {
    settings: SheetsSettings,
    title: String,
}

impl SheetsTableStore {
    pub fn connect(settings: SheetsSettings) -> Result<Self> {
        let mut url = spreadsheet_url(&settings.base_url, &settings.spreadsheet_id, &[])?;
        url.query_pairs_mut()
            .append_pair("fields", "spreadsheetId,properties.title");

        let body = execute(&settings, Method::GET, url, None)
            .context("Failed to open spreadsheet")?;
        let meta: SpreadsheetMeta =
            serde_json::from_value(body).context("Failed to parse spreadsheet metadata")?;
        let title = meta
            .properties
            .and_then(|properties| properties.title)
            .unwrap_or_else(|| settings.spreadsheet_id.clone());

        info!(spreadsheet = %title, "spreadsheet opened");
        Ok(Self { settings, title })
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        spreadsheet_url(
            &self.settings.base_url,
            &self.settings.spreadsheet_id,
            &["values", range],
        )
    }

    fn get_values(&self, range: &str, major_dimension: &str) -> Result<Vec<Vec<Value>>> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut()
            .append_pair("majorDimension", major_dimension)
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE")
            .append_pair("dateTimeRenderOption", "FORMATTED_STRING");

        let body = execute(&self.settings, Method::GET, url, None)?;
        let value_range: ValueRange = serde_json::from_value(body)
            .with_context(|| format!("Failed to parse values of range: {range}"))?;

        Ok(value_range.values.unwrap_or_default())
    }
}

impl TableStore for SheetsTableStore {
    fn describe(&self) -> String {
        format!("sheets:{}", self.title)
    }

    fn read_rows(&self, table: &str) -> Result<Vec<Vec<Value>>> {
        self.get_values(&sheet_range(table, None), "ROWS")
    }

    fn col_values(&self, table: &str, column: usize) -> Result<Vec<Value>> {
        let letter = column_letter(column)?;
        let range = sheet_range(table, Some(&format!("{letter}:{letter}")));

        Ok(self
            .get_values(&range, "COLUMNS")?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    fn append_row(&mut self, table: &str, row: Vec<Value>) -> Result<()> {
        let range = sheet_range(table, Some("A1"));
        let mut url = self.values_url(&format!("{range}:append"))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        execute(
            &self.settings,
            Method::POST,
            url,
            Some(json!({ "values": [row] })),
        )
        .with_context(|| format!("Failed to append row to sheet: {table}"))?;
        Ok(())
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        let url = self.values_url(&format!("{}:clear", sheet_range(table, None)))?;

        execute(&self.settings, Method::POST, url, Some(json!({})))
            .with_context(|| format!("Failed to clear sheet: {table}"))?;
        Ok(())
    }

    fn write_all(&mut self, table: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let range = sheet_range(table, Some("A1"));
        let mut url = self.values_url(&range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        execute(
            &self.settings,
            Method::PUT,
            url,
            Some(json!({ "range": range, "majorDimension": "ROWS", "values": rows })),
        )
        .with_context(|| format!("Failed to write sheet: {table}"))?;
        Ok(())
    }
}

fn execute(
    settings: &SheetsSettings,
    method: Method,
    url: Url,
    body: Option<Value>,
) -> Result<Value> {
    let access_token = settings.access_token.clone();
    let timeout_seconds = settings.timeout_seconds;

    std::thread::spawn(move || execute_blocking(&access_token, timeout_seconds, method, url, body))
        .join()
        .map_err(|_| anyhow!("Sheets worker thread panicked"))?
}

fn execute_blocking(
    access_token: &str,
    timeout_seconds: u64,
    method: Method,
    url: Url,
    body: Option<Value>,
) -> Result<Value> {
    if access_token.trim().is_empty() {
        bail!("Sheets access token is empty");
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {access_token}"))
            .context("Failed to build Authorization header")?,
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .build()
        .context("Failed to create Sheets HTTP client")?;

    debug!(method = %method, url = %url, "sheets request");

    let request = client.request(method, url);
    let request = match body {
        Some(payload) => request.json(&payload),
        None => request,
    };

    let response = request.send().context("Sheets API request failed")?;
    let status = response.status();
    let text = response
        .text()
        .context("Failed to read Sheets response body")?;

    if !status.is_success() {
        bail!("Sheets API error {}: {}", status, text);
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).with_context(|| format!("Failed to parse Sheets response: {text}"))
}

fn spreadsheet_url(base_url: &str, spreadsheet_id: &str, tail: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base_url.trim_end_matches('/'))
        .with_context(|| format!("Invalid Sheets API base URL: {base_url}"))?;

    url.path_segments_mut()
        .map_err(|_| anyhow!("Sheets API base URL cannot carry a path: {base_url}"))?
        .pop_if_empty()
        .push("spreadsheets")
        .push(spreadsheet_id)
        .extend(tail);

    Ok(url)
}

/// A1 range for a sheet, quoting the sheet name when it is not a plain word.
fn sheet_range(table: &str, cells: Option<&str>) -> String {
    let plain = table
        .chars()
        .all(|character| character.is_ascii_alphanumeric() || character == '_');
    let name = if plain {
        table.to_string()
    } else {
        format!("'{}'", table.replace('\'', "''"))
    };

    match cells {
        Some(cells) => format!("{name}!{cells}"),
        None => name,
    }
}

fn column_letter(column: usize) -> Result<String> {
    if column == 0 {
        bail!("Column numbers start at 1");
    }

    let mut remaining = column;
    let mut letters = Vec::new();
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push(char::from(b'A' + offset as u8));
        remaining = (remaining - 1) / 26;
    }

    Ok(letters.into_iter().rev().collect())
}

#[cfg(test)]
mod tests {
    use super::{SheetsSettings, column_letter, sheet_range, spreadsheet_url};
    use crate::config::{Backend, Config};

    #[test]
    fn column_letters_follow_spreadsheet_naming() {
        assert_eq!(column_letter(1).unwrap(), "A");
        assert_eq!(column_letter(26).unwrap(), "Z");
        assert_eq!(column_letter(27).unwrap(), "AA");
        assert_eq!(column_letter(703).unwrap(), "AAA");
        assert!(column_letter(0).is_err());
    }

    #[test]
    fn sheet_names_with_spaces_are_quoted() {
        assert_eq!(sheet_range("LogActivity", Some("A:A")), "LogActivity!A:A");
        assert_eq!(sheet_range("Rekap Sheet", None), "'Rekap Sheet'");
        assert_eq!(sheet_range("Bob's", Some("A1")), "'Bob''s'!A1");
    }

    #[test]
    fn values_url_escapes_the_range_segment() {
        let url = spreadsheet_url(
            "https://sheets.googleapis.com/v4/",
            "sheet-id",
            &["values", "'Rekap Sheet'!A1:append"],
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/'Rekap%20Sheet'!A1:append"
        );
    }

    #[test]
    fn settings_require_a_spreadsheet_id() {
        let config = Config {
            backend: Backend::Sheets,
            sheets_access_token: Some("token".to_string()),
            ..Config::default()
        };

        let error = SheetsSettings::from_config(&config).unwrap_err();
        assert!(error.to_string().contains("Spreadsheet id is missing"));
    }
}
