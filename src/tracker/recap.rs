use crate::error::TrackerError;
use crate::store::{RECAP_HEADER, RECAP_TABLE, TableStore, header_row};
use crate::tracker::coerce::{format_date, int_or_default, parse_calendar_date};
use crate::tracker::log::LogEntry;
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecapRow {
    pub no: i64,
    pub date: NaiveDate,
    pub total_points: i64,
}

/// Per-date point totals in ascending date order, numbered from 1.
pub fn build_recap(log: &[LogEntry]) -> Vec<RecapRow> {
    log.iter()
        .fold(BTreeMap::new(), |mut acc, entry| {
            *acc.entry(entry.date).or_insert(0_i64) += entry.points;
            acc
        })
        .into_iter()
        .zip(1_i64..)
        .map(|((date, total_points), no)| RecapRow {
            no,
            date,
            total_points,
        })
        .collect()
}

/// Rebuilds the recap sheet from the full log. An empty log writes nothing so
/// a transient empty read never wipes an existing recap.
pub fn recompute_recap(
    store: &mut dyn TableStore,
    log: &[LogEntry],
) -> Result<Vec<RecapRow>, TrackerError> {
    if log.is_empty() {
        debug!("log is empty, recap left untouched");
        return Ok(Vec::new());
    }

    let recap = build_recap(log);

    store.clear(RECAP_TABLE).map_err(TrackerError::Write)?;
    store
        .write_all(RECAP_TABLE, recap_rows(&recap))
        .map_err(TrackerError::Write)?;

    info!(days = recap.len(), entries = log.len(), "recap recomputed");
    Ok(recap)
}

pub fn load_recap(store: &dyn TableStore) -> Result<Vec<RecapRow>, TrackerError> {
    store
        .read_all(RECAP_TABLE)
        .map_err(TrackerError::Read)?
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let date = record
                .get("Date")
                .context("missing Date column")
                .and_then(parse_calendar_date)
                .with_context(|| format!("{RECAP_TABLE} row {}", index + 2))
                .map_err(TrackerError::Read)?;

            Ok(RecapRow {
                no: int_or_default(record.get("No"), 0),
                date,
                total_points: int_or_default(record.get("Rekap Point"), 0),
            })
        })
        .collect()
}

fn recap_rows(recap: &[RecapRow]) -> Vec<Vec<Value>> {
    std::iter::once(header_row(&RECAP_HEADER))
        .chain(recap.iter().map(|row| {
            vec![
                json!(row.no),
                Value::String(format_date(row.date)),
                json!(row.total_points),
            ]
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{RecapRow, build_recap, load_recap, recompute_recap};
    use crate::store::memory::MemoryTableStore;
    use crate::store::{RECAP_TABLE, TableStore};
    use crate::tracker::log::{Approval, EntryId, LogEntry};
    use chrono::NaiveDate;
    use serde_json::json;

    fn entry(day: u32, points: i64) -> LogEntry {
        LogEntry {
            id: EntryId::Confirmed(i64::from(day)),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            activity: "Reading".to_string(),
            points,
            approval: Approval::Good,
        }
    }

    #[test]
    fn same_date_collapses_into_one_row() {
        let recap = build_recap(&[entry(1, 5), entry(1, 10)]);

        assert_eq!(
            recap,
            vec![RecapRow {
                no: 1,
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                total_points: 15
            }]
        );
    }

    #[test]
    fn rows_are_ascending_and_preserve_the_grand_total() {
        let log = [entry(9, 3), entry(2, 4), entry(9, -1), entry(5, 0), entry(2, 8)];
        let recap = build_recap(&log);

        let dates = recap.iter().map(|row| row.date.to_string()).collect::<Vec<_>>();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-05", "2024-01-09"]);
        assert_eq!(recap.iter().map(|row| row.no).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(
            recap.iter().map(|row| row.total_points).sum::<i64>(),
            log.iter().map(|entry| entry.points).sum::<i64>()
        );
    }

    #[test]
    fn empty_log_performs_no_writes() {
        let existing = vec![
            vec![json!("No"), json!("Date"), json!("Rekap Point")],
            vec![json!(1), json!("2023-12-31"), json!(20)],
        ];
        let mut store = MemoryTableStore::default().with_table(RECAP_TABLE, existing.clone());

        let recap = recompute_recap(&mut store, &[]).unwrap();

        assert!(recap.is_empty());
        assert_eq!(store.writes, 0);
        assert_eq!(store.read_rows(RECAP_TABLE).unwrap(), existing);
    }

    #[test]
    fn recompute_replaces_the_previous_recap() {
        let mut store = MemoryTableStore::default().with_table(
            RECAP_TABLE,
            vec![
                vec![json!("No"), json!("Date"), json!("Rekap Point")],
                vec![json!(1), json!("2023-12-30"), json!(1)],
                vec![json!(2), json!("2023-12-31"), json!(2)],
                vec![json!(3), json!("2024-01-01"), json!(3)],
            ],
        );

        recompute_recap(&mut store, &[entry(1, 5), entry(1, 10)]).unwrap();

        assert_eq!(
            store.read_rows(RECAP_TABLE).unwrap(),
            vec![
                vec![json!("No"), json!("Date"), json!("Rekap Point")],
                vec![json!(1), json!("2024-01-01"), json!(15)],
            ]
        );
        assert_eq!(store.writes, 2);
        assert_eq!(load_recap(&store).unwrap()[0].total_points, 15);
    }
}
