//! JSON endpoints over the check-in flow.

use std::sync::Arc;
use std::time::Duration;

use attendance_client::clock::Clock;
use attendance_client::dates::{self, DisplayOptions};
use attendance_client::form::CheckInForm;
use attendance_client::sessions::{self, SessionMatcher, Suggestion, SuggestionStatus};
use attendance_client::{AttendanceApi, AttendanceRecord, NewRecord, records_for_date};
use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;

use crate::error::{ServerError, ServerResult};

pub struct AppState {
    pub api: Arc<dyn AttendanceApi>,
    pub matcher: SessionMatcher,
    pub clock: Arc<dyn Clock>,
    /// Latest suggestion, kept current by the refresher.
    pub suggestions: watch::Receiver<Suggestion>,
    pub metrics: Option<PrometheusHandle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchDto {
    id: String,
    label: String,
    start_minutes: u16,
    end_minutes: u16,
    days: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestionDto {
    batch_id: String,
    status: SuggestionStatus,
    label: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RecordsQuery {
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordView {
    #[serde(flatten)]
    record: AttendanceRecord,
    display_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordsDto {
    date: String,
    display_date: String,
    records: Vec<RecordView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CheckInRequest {
    name: String,
    email: String,
    batch: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckInDto {
    row_number: Option<u64>,
    record: NewRecord,
    display_date: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackRequest {
    feedback: String,
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> ServerResult<impl IntoResponse> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ServerError::NotFound("metrics recorder not installed".into()))?;
    Ok(([("content-type", "text/plain; version=0.0.4")], handle.render()))
}

#[debug_handler]
async fn list_batches(State(state): State<Arc<AppState>>) -> Json<Vec<BatchDto>> {
    let batches = sessions::batch_options(state.matcher.windows())
        .into_iter()
        .map(|w| BatchDto {
            id: w.id.clone(),
            label: w.label.clone(),
            start_minutes: w.start_minutes,
            end_minutes: w.end_minutes,
            days: w.days.iter().map(|d| d.to_string()).collect(),
        })
        .collect();
    Json(batches)
}

#[debug_handler]
async fn current_suggestion(State(state): State<Arc<AppState>>) -> Json<SuggestionDto> {
    let suggestion = state.suggestions.borrow().clone();
    let message = state.matcher.message(&suggestion, state.clock.week_time());
    let label = sessions::batch_label(&suggestion.batch_id, state.matcher.windows())
        .map(str::to_string);
    Json(SuggestionDto {
        batch_id: suggestion.batch_id,
        status: suggestion.status,
        label,
        message,
    })
}

#[debug_handler]
async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecordsQuery>,
) -> ServerResult<Json<RecordsDto>> {
    let date = match query.date.as_deref().map(str::trim) {
        Some(date) if !date.is_empty() => dates::normalize_date(date),
        _ => state.clock.today(),
    };
    let all = state.api.get_all().await?;
    let options = DisplayOptions::default();
    let records = records_for_date(&all, &date)
        .into_iter()
        .map(|record| RecordView {
            display_date: dates::format_for_display(&record.date, &options),
            record,
        })
        .collect();
    Ok(Json(RecordsDto {
        display_date: dates::format_for_display(&date, &options),
        date,
        records,
    }))
}

#[debug_handler]
async fn check_in(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CheckInRequest>,
) -> ServerResult<(StatusCode, Json<CheckInDto>)> {
    let today = state.clock.today();
    let mut form = CheckInForm::new(state.matcher.clone(), today.clone());
    let suggestion = state.suggestions.borrow().clone();
    form.apply_suggestion(suggestion);
    form.set_name(req.name.trim());
    form.set_email(req.email.trim());
    if let Some(batch) = req.batch.filter(|b| !b.trim().is_empty()) {
        form.choose_batch(batch.trim());
    }
    if let Some(date) = req.date.filter(|d| !d.trim().is_empty()) {
        form.set_date(date.trim());
    }

    let submission = form.submit(&today)?;
    let record = submission.record;
    let receipt = state.api.create(record.clone()).await?;
    tracing::info!(
        row = ?receipt.row_number,
        batch = %record.batch,
        date = %record.date,
        "attendance recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(CheckInDto {
            row_number: receipt.row_number,
            display_date: dates::format_for_display(&record.date, &DisplayOptions::default()),
            record,
        }),
    ))
}

#[debug_handler]
async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(row): Path<u64>,
) -> ServerResult<StatusCode> {
    state.api.delete(row).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn update_feedback(
    State(state): State<Arc<AppState>>,
    Path(row): Path<u64>,
    Json(req): Json<FeedbackRequest>,
) -> ServerResult<StatusCode> {
    state.api.update_feedback(row, &req.feedback).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the application router. Requests running longer than
/// `request_timeout` are answered with 408.
pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/batches", get(list_batches))
        .route("/api/suggestion", get(current_suggestion))
        .route("/api/records", get(list_records).post(check_in))
        .route("/api/records/{row}", delete(delete_record))
        .route("/api/records/{row}/feedback", put(update_feedback))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .with_state(state)
}
