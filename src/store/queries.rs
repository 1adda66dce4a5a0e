pub const CREATE_SHEET_ROWS: &str = r#"
CREATE TABLE IF NOT EXISTS sheet_rows (
  sheet      TEXT NOT NULL,
  row_index  INTEGER NOT NULL,
  cells      TEXT NOT NULL,
  PRIMARY KEY (sheet, row_index)
);
"#;

pub const SELECT_ROWS: &str =
    "SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY row_index ASC";

pub const APPEND_ROW: &str = "INSERT INTO sheet_rows (sheet, row_index, cells)
     VALUES (?1, (SELECT COALESCE(MAX(row_index) + 1, 0) FROM sheet_rows WHERE sheet = ?1), ?2)";

pub const UPSERT_ROW: &str = "INSERT INTO sheet_rows (sheet, row_index, cells)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(sheet, row_index)
     DO UPDATE SET cells=excluded.cells";

pub const DELETE_SHEET: &str = "DELETE FROM sheet_rows WHERE sheet = ?1";

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_SHEET_ROWS]
}
