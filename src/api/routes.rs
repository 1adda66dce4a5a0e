use crate::config::Config;
use crate::error::TrackerError;
use crate::store::StoreHandle;
use crate::tracker::Tracker;
use crate::tracker::catalog::ActivityCatalogEntry;
use crate::tracker::log::{Approval, LogEntry, display_order};
use crate::tracker::recap::RecapRow;
use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub store: Arc<StoreHandle>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/catalog", get(catalog))
        .route("/api/v1/log", get(log_history).post(log_submit))
        .route("/api/v1/recap", get(recap))
        .route("/api/v1/recap/recompute", post(recap_recompute))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SubmitPayload {
    activity: String,
    date: Option<String>,
    approval: Option<String>,
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    store: String,
    activities: usize,
    log_entries: usize,
    latest_entry_date: Option<NaiveDate>,
    recap_days: usize,
    warning: Option<String>,
    api_port: u16,
}

#[derive(Debug, Serialize)]
struct CatalogPayload {
    activities: Vec<ActivityCatalogEntry>,
    warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct LogPayload {
    count: usize,
    entries: Vec<LogEntry>,
    warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecapPayload {
    days: usize,
    rows: Vec<RecapRow>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    saved: bool,
    assigned_id: i64,
    entry: LogEntry,
    recap: Vec<RecapRow>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let api_port = state.config.api_port;

    let payload = with_tracker(&state, move |tracker, load_error| {
        let recap_days = tracker.stored_recap().map(|rows| rows.len()).unwrap_or(0);

        Ok(StatusPayload {
            store: tracker.describe_store(),
            activities: tracker.catalog().len(),
            log_entries: tracker.log().len(),
            latest_entry_date: tracker.log().iter().map(|entry| entry.date).max(),
            recap_days,
            warning: load_error.map(|error| error.to_string()),
            api_port,
        })
    })
    .await?;

    Ok(Json(payload))
}

async fn catalog(State(state): State<ApiState>) -> ApiResult<Json<CatalogPayload>> {
    let payload = with_tracker(&state, |tracker, load_error| {
        let warning = match load_error {
            Some(error) => Some(error.to_string()),
            None if tracker.catalog().is_empty() => {
                Some(TrackerError::CatalogUnavailable.to_string())
            }
            None => None,
        };

        Ok(CatalogPayload {
            activities: tracker.catalog().entries().to_vec(),
            warning,
        })
    })
    .await?;

    Ok(Json(payload))
}

async fn log_history(State(state): State<ApiState>) -> ApiResult<Json<LogPayload>> {
    let payload = with_tracker(&state, |tracker, load_error| {
        let entries = display_order(tracker.log())
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();

        Ok(LogPayload {
            count: entries.len(),
            entries,
            warning: load_error.map(|error| error.to_string()),
        })
    })
    .await?;

    Ok(Json(payload))
}

async fn log_submit(
    State(state): State<ApiState>,
    Json(payload): Json<SubmitPayload>,
) -> ApiResult<Json<SubmitResponse>> {
    let date = payload
        .date
        .as_deref()
        .map(parse_date)
        .transpose()
        .map_err(|error| ApiError::BadRequest(format!("{error:#}")))?
        .unwrap_or_else(|| Local::now().date_naive());
    let approval = payload
        .approval
        .as_deref()
        .map(str::parse::<Approval>)
        .transpose()
        .map_err(|error| ApiError::BadRequest(error.to_string()))?
        .unwrap_or(Approval::Good);
    let activity = payload.activity;

    let submission = with_tracker(&state, move |tracker, load_error| {
        if let Some(error) = load_error {
            return Err(error);
        }

        let submission = tracker.submit(date, &activity, approval)?;
        if let Err(error) = tracker.refresh() {
            tracing::warn!(error = %error, "reload after submit failed");
        }

        Ok(submission)
    })
    .await?;

    Ok(Json(SubmitResponse {
        saved: true,
        assigned_id: submission.assigned_id,
        entry: submission.entry,
        recap: submission.recap,
    }))
}

async fn recap(State(state): State<ApiState>) -> ApiResult<Json<RecapPayload>> {
    let rows = with_tracker(&state, |tracker, _| tracker.stored_recap()).await?;

    Ok(Json(RecapPayload {
        days: rows.len(),
        rows,
    }))
}

async fn recap_recompute(State(state): State<ApiState>) -> ApiResult<Json<RecapPayload>> {
    let rows = with_tracker(&state, |tracker, load_error| match load_error {
        Some(error) => Err(error),
        None => tracker.recompute(),
    })
    .await?;

    Ok(Json(RecapPayload {
        days: rows.len(),
        rows,
    }))
}

/// Loads a session on the blocking pool and runs `action` against it while
/// holding the shared store.
async fn with_tracker<T, F>(state: &ApiState, action: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Tracker<'_>, Option<TrackerError>) -> Result<T, TrackerError> + Send + 'static,
{
    let store = Arc::clone(&state.store);

    let outcome = tokio::task::spawn_blocking(move || {
        store.with_store(|store| {
            let (mut tracker, load_error) = Tracker::load(store);
            action(&mut tracker, load_error)
        })
    })
    .await
    .context("Tracker worker task failed")?;

    Ok(outcome?)
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date format: {input}. Example: 2024-01-01"))
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Unavailable(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value)
    }
}

impl From<TrackerError> for ApiError {
    fn from(value: TrackerError) -> Self {
        match value {
            TrackerError::Lookup { .. } | TrackerError::CatalogUnavailable => {
                Self::BadRequest(value.to_string())
            }
            TrackerError::Connection(_) => Self::Unavailable(value.to_string()),
            TrackerError::Read(_) | TrackerError::Write(_) => Self::Internal(value.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Unavailable(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Internal(error) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": format!("{error:#}") })),
            )
                .into_response(),
        }
    }
}
