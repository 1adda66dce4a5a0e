use thiserror::Error;

/// Failures surfaced to the user. Infrastructure code reports `anyhow::Error`
/// and the tracker maps it into one of these at the store boundary.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Connection error: {0:#}")]
    Connection(anyhow::Error),
    #[error("Error reading worksheets: {0:#}")]
    Read(anyhow::Error),
    #[error("Error writing worksheets: {0:#}")]
    Write(anyhow::Error),
    #[error("Activity not found in catalog: {activity}")]
    Lookup { activity: String },
    #[error("Could not load Activity List. Submission is disabled until the catalog is available")]
    CatalogUnavailable,
}
