use super::TableStore;
use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::HashMap;

/// Test double that keeps sheets in memory and counts mutating calls.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: HashMap<String, Vec<Vec<Value>>>,
    pub writes: usize,
    pub fail_reads: bool,
}

impl MemoryTableStore {
    pub fn with_table(mut self, table: &str, rows: Vec<Vec<Value>>) -> Self {
        self.tables.insert(table.to_string(), rows);
        self
    }
}

impl TableStore for MemoryTableStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn read_rows(&self, table: &str) -> Result<Vec<Vec<Value>>> {
        if self.fail_reads {
            bail!("Sheet {table} is unreachable");
        }

        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }

    fn append_row(&mut self, table: &str, row: Vec<Value>) -> Result<()> {
        self.writes += 1;
        self.tables.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    fn clear(&mut self, table: &str) -> Result<()> {
        self.writes += 1;
        self.tables.remove(table);
        Ok(())
    }

    fn write_all(&mut self, table: &str, rows: Vec<Vec<Value>>) -> Result<()> {
        self.writes += 1;
        let existing = self.tables.entry(table.to_string()).or_default();
        let kept = existing.split_off(rows.len().min(existing.len()));
        *existing = rows.into_iter().chain(kept).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryTableStore;
    use crate::store::TableStore;
    use serde_json::json;

    #[test]
    fn write_all_overwrites_from_the_top() {
        let mut store = MemoryTableStore::default().with_table(
            "RecapPoint",
            vec![vec![json!("a")], vec![json!("b")], vec![json!("c")]],
        );

        store
            .write_all("RecapPoint", vec![vec![json!("x")], vec![json!("y")]])
            .unwrap();

        assert_eq!(
            store.read_rows("RecapPoint").unwrap(),
            vec![vec![json!("x")], vec![json!("y")], vec![json!("c")]]
        );
        assert_eq!(store.writes, 1);
    }
}
