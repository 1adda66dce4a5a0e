#[cfg(test)]
pub mod memory;
pub mod queries;
pub mod sheets;
pub mod sqlite;

use crate::config::{Backend, Config};
use crate::error::TrackerError;
use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use std::sync::Mutex;
use tracing::info;

pub const CATALOG_TABLE: &str = "ListActivity";
pub const LOG_TABLE: &str = "LogActivity";
pub const RECAP_TABLE: &str = "RecapPoint";

pub const CATALOG_HEADER: [&str; 2] = ["Activity", "Points"];
pub const LOG_HEADER: [&str; 5] = ["No", "Date", "Activity", "Point", "Approval"];
pub const RECAP_HEADER: [&str; 3] = ["No", "Date", "Rekap Point"];

/// A row zipped with its sheet header.
pub type Record = Map<String, Value>;

/// Sheet-oriented storage. The first row of each sheet is its header.
pub trait TableStore {
    fn describe(&self) -> String;

    /// Every row of the sheet, header included, in sheet order.
    fn read_rows(&self, table: &str) -> Result<Vec<Vec<Value>>>;

    fn append_row(&mut self, table: &str, row: Vec<Value>) -> Result<()>;

    fn clear(&mut self, table: &str) -> Result<()>;

    /// Overwrites rows starting at the top of the sheet. Rows past the
    /// written block are left as they were.
    fn write_all(&mut self, table: &str, rows: Vec<Vec<Value>>) -> Result<()>;

    fn read_all(&self, table: &str) -> Result<Vec<Record>> {
        self.read_rows(table).map(records_from_rows)
    }

    /// Cells of a 1-based column, header cell included.
    fn col_values(&self, table: &str, column: usize) -> Result<Vec<Value>> {
        let index = column
            .checked_sub(1)
            .context("Column numbers start at 1")?;

        Ok(self
            .read_rows(table)?
            .into_iter()
            .filter_map(|row| row.into_iter().nth(index))
            .collect())
    }
}

pub fn records_from_rows(rows: Vec<Vec<Value>>) -> Vec<Record> {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let header = header.iter().map(cell_text).collect::<Vec<_>>();

    rows.map(|row| {
        let mut cells = row.into_iter();
        header
            .iter()
            .map(|name| {
                let cell = cells.next().unwrap_or_else(|| Value::String(String::new()));
                (name.clone(), cell)
            })
            .collect::<Record>()
    })
    .collect()
}

/// Text form of a cell as it would be displayed in a sheet.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn header_row(names: &[&str]) -> Vec<Value> {
    names
        .iter()
        .map(|name| Value::String((*name).to_string()))
        .collect()
}

/// Writes the header row into each of the three sheets that has no rows yet.
pub fn bootstrap_headers(store: &mut dyn TableStore) -> Result<Vec<&'static str>> {
    let layouts: [(&'static str, &[&str]); 3] = [
        (CATALOG_TABLE, &CATALOG_HEADER),
        (LOG_TABLE, &LOG_HEADER),
        (RECAP_TABLE, &RECAP_HEADER),
    ];

    let mut initialized = Vec::new();
    for (table, header) in layouts {
        if store.read_rows(table)?.is_empty() {
            store.write_all(table, vec![header_row(header)])?;
            info!(table, "sheet header initialized");
            initialized.push(table);
        }
    }

    Ok(initialized)
}

pub fn connect(config: &Config) -> Result<Box<dyn TableStore + Send>, TrackerError> {
    let store: Box<dyn TableStore + Send> = match config.backend {
        Backend::Sqlite => Box::new(
            sqlite::SqliteTableStore::open(&config.db_path).map_err(TrackerError::Connection)?,
        ),
        Backend::Sheets => Box::new(
            sheets::SheetsSettings::from_config(config)
                .and_then(sheets::SheetsTableStore::connect)
                .map_err(TrackerError::Connection)?,
        ),
    };

    info!(store = %store.describe(), "table store connected");
    Ok(store)
}

/// Lazily connected store shared for the lifetime of the process.
pub struct StoreHandle {
    config: Config,
    store: Mutex<Option<Box<dyn TableStore + Send>>>,
}

impl StoreHandle {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Mutex::new(None),
        }
    }

    pub fn with_store<T>(
        &self,
        action: impl FnOnce(&mut dyn TableStore) -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        let mut guard = self
            .store
            .lock()
            .map_err(|_| TrackerError::Connection(anyhow!("Store handle lock was poisoned")))?;

        if guard.is_none() {
            *guard = Some(connect(&self.config)?);
        }

        match guard.as_mut() {
            Some(store) => action(store.as_mut()),
            None => Err(TrackerError::Connection(anyhow!("Store is not connected"))),
        }
    }
}
