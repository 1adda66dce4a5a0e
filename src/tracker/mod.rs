pub mod catalog;
pub mod coerce;
pub mod log;
pub mod recap;

use crate::error::TrackerError;
use crate::store::TableStore;
use crate::tracker::catalog::Catalog;
use crate::tracker::log::{Approval, EntryId, LogEntry};
use crate::tracker::recap::RecapRow;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub assigned_id: i64,
    pub entry: LogEntry,
    pub recap: Vec<RecapRow>,
}

/// One interaction session over an injected store: the catalog and log as
/// last loaded, plus any locally appended entries not yet reloaded.
pub struct Tracker<'a> {
    store: &'a mut dyn TableStore,
    catalog: Catalog,
    log: Vec<LogEntry>,
}

impl<'a> Tracker<'a> {
    pub fn new(store: &'a mut dyn TableStore) -> Self {
        Self {
            store,
            catalog: Catalog::default(),
            log: Vec::new(),
        }
    }

    /// Builds a session and loads it. A failed load leaves the session empty
    /// and hands the error back alongside it for display.
    pub fn load(store: &'a mut dyn TableStore) -> (Self, Option<TrackerError>) {
        let mut tracker = Self::new(store);
        let error = tracker.refresh().err();
        (tracker, error)
    }

    /// Re-reads catalog and log from storage. Pending entries are dropped in
    /// favour of the stored rows. On failure both fall back to empty.
    pub fn refresh(&mut self) -> Result<(), TrackerError> {
        let loaded = catalog::load_catalog(&*self.store)
            .and_then(|catalog| log::load_log(&*self.store).map(|log| (catalog, log)));

        match loaded {
            Ok((catalog, log)) => {
                self.catalog = catalog;
                self.log = log;
                Ok(())
            }
            Err(error) => {
                warn!(error = %error, "failed to load worksheets");
                self.catalog = Catalog::default();
                self.log = Vec::new();
                Err(error)
            }
        }
    }

    pub fn submit(
        &mut self,
        date: NaiveDate,
        activity: &str,
        approval: Approval,
    ) -> Result<Submission, TrackerError> {
        if self.catalog.is_empty() {
            return Err(TrackerError::CatalogUnavailable);
        }
        let points = self.catalog.points_for(activity)?;

        let assigned_id = log::append_entry(&mut *self.store, date, activity, points, approval)?;

        let entry = LogEntry {
            id: EntryId::Pending,
            date,
            activity: activity.to_string(),
            points,
            approval,
        };
        self.log.push(entry.clone());

        let recap = recap::recompute_recap(&mut *self.store, &self.log)?;

        Ok(Submission {
            assigned_id,
            entry,
            recap,
        })
    }

    pub fn recompute(&mut self) -> Result<Vec<RecapRow>, TrackerError> {
        recap::recompute_recap(&mut *self.store, &self.log)
    }

    pub fn stored_recap(&self) -> Result<Vec<RecapRow>, TrackerError> {
        recap::load_recap(&*self.store)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn pending_count(&self) -> usize {
        self.log.iter().filter(|entry| entry.id.is_pending()).count()
    }

    pub fn describe_store(&self) -> String {
        self.store.describe()
    }

    pub fn store(&mut self) -> &mut dyn TableStore {
        &mut *self.store
    }
}

#[cfg(test)]
mod tests {
    use super::Tracker;
    use crate::error::TrackerError;
    use crate::store::memory::MemoryTableStore;
    use crate::store::{
        CATALOG_TABLE, LOG_HEADER, LOG_TABLE, RECAP_TABLE, TableStore, header_row,
    };
    use crate::tracker::log::{Approval, EntryId};
    use chrono::NaiveDate;
    use serde_json::json;

    fn new_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn seeded_store() -> MemoryTableStore {
        MemoryTableStore::default()
            .with_table(
                CATALOG_TABLE,
                vec![
                    vec![json!("Activity"), json!("Points")],
                    vec![json!("Reading"), json!(5)],
                    vec![json!("Exercise"), json!(10)],
                ],
            )
            .with_table(LOG_TABLE, vec![header_row(&LOG_HEADER)])
    }

    #[test]
    fn first_submission_creates_entry_and_recap() {
        let mut store = seeded_store();

        let submission = {
            let (mut tracker, error) = Tracker::load(&mut store);
            assert!(error.is_none());
            tracker
                .submit(new_year(), "Reading", Approval::Good)
                .unwrap()
        };

        assert_eq!(submission.assigned_id, 1);
        assert_eq!(submission.recap.len(), 1);
        assert_eq!(submission.recap[0].no, 1);
        assert_eq!(submission.recap[0].total_points, 5);

        assert_eq!(
            store.read_rows(LOG_TABLE).unwrap()[1],
            vec![
                json!(1),
                json!("2024-01-01"),
                json!("Reading"),
                json!(5),
                json!("Good")
            ]
        );
        assert_eq!(
            store.read_rows(RECAP_TABLE).unwrap(),
            vec![
                vec![json!("No"), json!("Date"), json!("Rekap Point")],
                vec![json!(1), json!("2024-01-01"), json!(5)],
            ]
        );
    }

    #[test]
    fn pending_entry_is_confirmed_after_refresh() {
        let mut store = seeded_store();
        let (mut tracker, _) = Tracker::load(&mut store);

        let submission = tracker
            .submit(new_year(), "Exercise", Approval::Average)
            .unwrap();
        assert_eq!(submission.entry.id, EntryId::Pending);
        assert_eq!(tracker.pending_count(), 1);

        tracker.refresh().unwrap();

        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(tracker.log().len(), 1);
        assert_eq!(tracker.log()[0].id, EntryId::Confirmed(1));
        assert_eq!(tracker.log()[0].points, 10);
    }

    #[test]
    fn recap_includes_the_pending_entry() {
        let mut store = seeded_store();
        store
            .append_row(
                LOG_TABLE,
                vec![json!(1), json!("2024-01-01"), json!("Reading"), json!(5), json!("Good")],
            )
            .unwrap();
        let (mut tracker, _) = Tracker::load(&mut store);

        let submission = tracker
            .submit(new_year(), "Exercise", Approval::NotGood)
            .unwrap();

        assert_eq!(submission.assigned_id, 2);
        assert_eq!(submission.recap.len(), 1);
        assert_eq!(submission.recap[0].total_points, 15);
        assert_eq!(tracker.stored_recap().unwrap(), submission.recap);
    }

    #[test]
    fn empty_catalog_disables_submission() {
        let mut store = MemoryTableStore::default();
        let (mut tracker, error) = Tracker::load(&mut store);
        assert!(error.is_none());

        let result = tracker.submit(new_year(), "Reading", Approval::Good);

        assert!(matches!(result, Err(TrackerError::CatalogUnavailable)));
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn unknown_activity_writes_nothing() {
        let mut store = seeded_store();
        let (mut tracker, _) = Tracker::load(&mut store);

        let result = tracker.submit(new_year(), "Sleeping", Approval::Good);

        assert!(matches!(result, Err(TrackerError::Lookup { .. })));
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn read_failure_degrades_to_empty_session() {
        let mut store = seeded_store();
        store
            .append_row(
                LOG_TABLE,
                vec![json!(1), json!("someday"), json!("Reading"), json!(5), json!("Good")],
            )
            .unwrap();

        let (tracker, error) = Tracker::load(&mut store);

        assert!(matches!(error, Some(TrackerError::Read(_))));
        assert!(tracker.catalog().is_empty());
        assert!(tracker.log().is_empty());
    }

    #[test]
    fn recompute_on_empty_session_keeps_stored_recap() {
        let mut store = MemoryTableStore::default().with_table(
            RECAP_TABLE,
            vec![
                vec![json!("No"), json!("Date"), json!("Rekap Point")],
                vec![json!(1), json!("2024-01-01"), json!(5)],
            ],
        );
        let (mut tracker, _) = Tracker::load(&mut store);

        assert!(tracker.recompute().unwrap().is_empty());
        assert_eq!(tracker.stored_recap().unwrap().len(), 1);
        drop(tracker);
        assert_eq!(store.writes, 0);
    }
}
