use crate::error::TrackerError;
use crate::store::{LOG_TABLE, Record, TableStore, cell_text};
use crate::tracker::coerce::{
    coerce_int, format_date, int_or_default, parse_calendar_date, parse_entry_id,
};
use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Approval {
    Good,
    Average,
    #[serde(rename = "Not Good")]
    NotGood,
}

impl Approval {
    pub fn label(self) -> &'static str {
        match self {
            Approval::Good => "Good",
            Approval::Average => "Average",
            Approval::NotGood => "Not Good",
        }
    }
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Approval {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        let normalized = value
            .trim()
            .to_lowercase()
            .replace(['_', '-', ' '], "");

        match normalized.as_str() {
            "good" => Ok(Approval::Good),
            "average" => Ok(Approval::Average),
            "notgood" => Ok(Approval::NotGood),
            _ => Err(anyhow!(
                "Invalid approval: {value:?}. Use Good, Average or Not Good"
            )),
        }
    }
}

/// Identity of a log entry. `Pending` marks an entry synthesized locally after
/// a submit; the next reload replaces it with what storage holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum EntryId {
    Pending,
    Confirmed(i64),
    Unreadable,
}

impl EntryId {
    pub fn is_pending(self) -> bool {
        matches!(self, EntryId::Pending)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Confirmed(id) => write!(f, "{id}"),
            EntryId::Pending => f.write_str("pending"),
            EntryId::Unreadable => f.write_str("?"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub activity: String,
    pub points: i64,
    pub approval: Approval,
}

pub fn load_log(store: &dyn TableStore) -> Result<Vec<LogEntry>, TrackerError> {
    store
        .read_all(LOG_TABLE)
        .map_err(TrackerError::Read)?
        .iter()
        .enumerate()
        .map(|(index, record)| {
            entry_from_record(record)
                .with_context(|| format!("{LOG_TABLE} row {}", index + 2))
                .map_err(TrackerError::Read)
        })
        .collect()
}

fn entry_from_record(record: &Record) -> anyhow::Result<LogEntry> {
    let id = record
        .get("No")
        .and_then(coerce_int)
        .map_or(EntryId::Unreadable, EntryId::Confirmed);
    let date = record
        .get("Date")
        .context("missing Date column")
        .and_then(parse_calendar_date)?;
    let activity = record.get("Activity").map(cell_text).unwrap_or_default();
    let points = int_or_default(record.get("Point"), 0);
    let approval = record
        .get("Approval")
        .map(cell_text)
        .context("missing Approval column")?
        .parse::<Approval>()?;

    Ok(LogEntry {
        id,
        date,
        activity,
        points,
        approval,
    })
}

/// `1 + max` over the id column, skipping the header and anything that is not
/// a plain unsigned integer. An empty column starts at 1.
pub fn next_entry_id(id_column: &[Value]) -> i64 {
    id_column
        .iter()
        .skip(1)
        .filter_map(parse_entry_id)
        .max()
        .map_or(1, |max| max + 1)
}

pub fn append_entry(
    store: &mut dyn TableStore,
    date: NaiveDate,
    activity: &str,
    points: i64,
    approval: Approval,
) -> Result<i64, TrackerError> {
    let id_column = store.col_values(LOG_TABLE, 1).map_err(TrackerError::Read)?;
    let id = next_entry_id(&id_column);

    let row = vec![
        json!(id),
        Value::String(format_date(date)),
        Value::String(activity.to_string()),
        json!(points),
        Value::String(approval.label().to_string()),
    ];
    store
        .append_row(LOG_TABLE, row)
        .map_err(TrackerError::Write)?;

    info!(id, date = %date, activity, points, approval = %approval, "log entry appended");
    Ok(id)
}

/// Entries newest date first. Entries on the same date keep storage order.
pub fn display_order(log: &[LogEntry]) -> Vec<&LogEntry> {
    let mut entries = log.iter().collect::<Vec<_>>();
    entries.sort_by(|left, right| right.date.cmp(&left.date));
    entries
}

#[cfg(test)]
mod tests {
    use super::{Approval, EntryId, append_entry, display_order, load_log, next_entry_id};
    use crate::error::TrackerError;
    use crate::store::memory::MemoryTableStore;
    use crate::store::{LOG_HEADER, LOG_TABLE, TableStore, header_row};
    use chrono::NaiveDate;
    use serde_json::json;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn log_store(rows: Vec<Vec<serde_json::Value>>) -> MemoryTableStore {
        let mut all = vec![header_row(&LOG_HEADER)];
        all.extend(rows);
        MemoryTableStore::default().with_table(LOG_TABLE, all)
    }

    #[test]
    fn first_id_is_one() {
        assert_eq!(next_entry_id(&[]), 1);
        assert_eq!(next_entry_id(&[json!("No")]), 1);
        assert_eq!(next_entry_id(&[json!("No"), json!("abc"), json!("")]), 1);
    }

    #[test]
    fn next_id_ignores_non_numeric_values() {
        let column = [json!("No"), json!("3"), json!("abc"), json!(7), json!("-9")];

        assert_eq!(next_entry_id(&column), 8);
    }

    #[test]
    fn append_writes_the_stored_row_shape() {
        let mut store = log_store(vec![vec![
            json!(4),
            json!("2024-01-01"),
            json!("Reading"),
            json!(5),
            json!("Good"),
        ]]);

        let id = append_entry(&mut store, date(2), "Exercise", 10, Approval::NotGood).unwrap();

        assert_eq!(id, 5);
        assert_eq!(store.writes, 1);
        assert_eq!(
            store.read_rows(LOG_TABLE).unwrap().last().unwrap(),
            &vec![
                json!(5),
                json!("2024-01-02"),
                json!("Exercise"),
                json!(10),
                json!("Not Good")
            ]
        );
    }

    #[test]
    fn appended_entry_round_trips_through_load() {
        let mut store = log_store(Vec::new());

        append_entry(&mut store, date(15), "Reading", 5, Approval::Average).unwrap();
        let log = load_log(&store).unwrap();

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, EntryId::Confirmed(1));
        assert_eq!(log[0].date, date(15));
        assert_eq!(log[0].activity, "Reading");
        assert_eq!(log[0].points, 5);
        assert_eq!(log[0].approval, Approval::Average);
    }

    #[test]
    fn load_coerces_points_and_ids() {
        let store = log_store(vec![
            vec![
                json!("x"),
                json!("2024/01/03"),
                json!("Reading"),
                json!("abc"),
                json!("not good"),
            ],
            vec![
                json!("2"),
                json!("2024-01-04"),
                json!(42),
                json!("7"),
                json!("Good"),
            ],
        ]);

        let log = load_log(&store).unwrap();

        assert_eq!(log[0].id, EntryId::Unreadable);
        assert_eq!(log[0].points, 0);
        assert_eq!(log[0].approval, Approval::NotGood);
        assert_eq!(log[1].id, EntryId::Confirmed(2));
        assert_eq!(log[1].activity, "42");
        assert_eq!(log[1].points, 7);
    }

    #[test]
    fn bad_date_fails_the_whole_load() {
        let store = log_store(vec![
            vec![json!(1), json!("2024-01-01"), json!("A"), json!(1), json!("Good")],
            vec![json!(2), json!("soon"), json!("B"), json!(1), json!("Good")],
        ]);

        let error = load_log(&store).unwrap_err();

        assert!(matches!(error, TrackerError::Read(_)));
        assert!(error.to_string().contains("LogActivity row 3"));
    }

    #[test]
    fn display_order_is_date_descending_and_stable() {
        let store = log_store(vec![
            vec![json!(1), json!("2024-01-01"), json!("A"), json!(1), json!("Good")],
            vec![json!(2), json!("2024-01-03"), json!("B"), json!(1), json!("Good")],
            vec![json!(3), json!("2024-01-01"), json!("C"), json!(1), json!("Good")],
        ]);
        let log = load_log(&store).unwrap();

        let names = display_order(&log)
            .into_iter()
            .map(|entry| entry.activity.as_str())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["B", "A", "C"]);
    }

    #[test]
    fn approval_accepts_spelling_variants() {
        for raw in ["Not Good", "NotGood", "not_good", "NOT-GOOD"] {
            assert_eq!(raw.parse::<Approval>().unwrap(), Approval::NotGood);
        }
        assert!("Excellent".parse::<Approval>().is_err());
        assert_eq!(Approval::NotGood.to_string(), "Not Good");
    }
}
