use super::{TableStore, queries};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Local backend that keeps each sheet as ordered JSON-encoded rows.
pub struct SqliteTableStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteTableStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;

        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init_schema()?;

        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }
}

impl TableStore for SqliteTableStore {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    fn read_rows(&self, table: &str) -> Result<Vec<Vec<Value>>> {
        let mut statement = self.conn.prepare(queries::SELECT_ROWS)?;

        let encoded = statement
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to query sheet: {table}"))?;

        encoded
            .iter()
            .map(|cells| {
                serde_json::from_str::<Vec<Value>>(cells)
                    .with_context(|| format!("Failed to decode row of sheet {table}: {cells}"))
            })
            .collect()
    }

    fn append_row(&mut self, table: &str, row: Vec<Value>) -> Result<()> {
        let cells = serde_json::to_string(&row).context("Failed to encode row")?;
        self.conn
            .execute(queries::APPEND_ROW, params![table, cells])
            .with_context(|| format!("Failed to append row to sheet: {table}"))?;

        Ok(())
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        self.conn
            .execute(queries::DELETE_SHEET, params![table])
            .with_context(|| format!("Failed to clear sheet: {table}"))?;

        Ok(())
    }

    fn write_all(&mut self, table: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        let transaction = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        rows.iter().enumerate().try_for_each(|(index, row)| {
            let cells = serde_json::to_string(row).context("Failed to encode row")?;
            transaction
                .execute(queries::UPSERT_ROW, params![table, index as i64, cells])
                .with_context(|| format!("Failed to write row {index} of sheet: {table}"))
                .map(|_| ())
        })?;

        transaction
            .commit()
            .with_context(|| format!("Failed to commit sheet: {table}"))?;
        Ok(())
    }
}
