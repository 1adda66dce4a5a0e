use crate::error::TrackerError;
use crate::store::{CATALOG_HEADER, CATALOG_TABLE, TableStore, cell_text, header_row};
use crate::tracker::coerce::int_or_default;
use anyhow::Context;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityCatalogEntry {
    pub name: String,
    pub points: i64,
}

/// Activity name to point value, in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entries: Vec<ActivityCatalogEntry>,
}

impl Catalog {
    pub fn from_entries(entries: impl IntoIterator<Item = ActivityCatalogEntry>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |mut catalog, entry| {
                catalog.insert(entry);
                catalog
            })
    }

    /// A repeated name keeps its original position and takes the newer points.
    pub fn insert(&mut self, entry: ActivityCatalogEntry) {
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.name == entry.name)
        {
            Some(existing) => existing.points = entry.points,
            None => self.entries.push(entry),
        }
    }

    pub fn points_for(&self, activity: &str) -> Result<i64, TrackerError> {
        self.entries
            .iter()
            .find(|entry| entry.name == activity)
            .map(|entry| entry.points)
            .ok_or_else(|| TrackerError::Lookup {
                activity: activity.to_string(),
            })
    }

    pub fn entries(&self) -> &[ActivityCatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub fn load_catalog(store: &dyn TableStore) -> Result<Catalog, TrackerError> {
    let records = store
        .read_all(CATALOG_TABLE)
        .map_err(TrackerError::Read)?;

    let entries = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let name = record
                .get("Activity")
                .map(cell_text)
                .with_context(|| format!("{CATALOG_TABLE} row {} has no Activity column", index + 2))?;
            let points = int_or_default(record.get("Points"), 0);

            Ok(ActivityCatalogEntry { name, points })
        })
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(TrackerError::Read)?;

    Ok(Catalog::from_entries(
        entries
            .into_iter()
            .filter(|entry| !entry.name.trim().is_empty()),
    ))
}

/// Replaces the catalog sheet with the given entries.
pub fn save_catalog(store: &mut dyn TableStore, catalog: &Catalog) -> Result<(), TrackerError> {
    let rows = std::iter::once(header_row(&CATALOG_HEADER))
        .chain(
            catalog
                .entries()
                .iter()
                .map(|entry| vec![Value::String(entry.name.clone()), json!(entry.points)]),
        )
        .collect::<Vec<_>>();

    store.clear(CATALOG_TABLE).map_err(TrackerError::Write)?;
    store
        .write_all(CATALOG_TABLE, rows)
        .map_err(TrackerError::Write)
}
