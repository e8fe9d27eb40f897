//! `AttendanceApi` trait, record types and the studio check-in logic.

use async_trait::async_trait;
use chrono::{Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod clock;
pub mod config;
pub mod dates;
pub mod form;
pub mod http_client;
pub mod observability;
pub mod preferences;
pub mod refresh;
pub mod sessions;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("api error: {0}")]
    Api(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
}

/// A check-in as submitted by the form.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewRecord {
    pub name: String,
    pub email: String,
    pub batch: String,
    /// Canonical `YYYY-MM-DD`.
    pub date: String,
}

/// A stored check-in, after ingestion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub row_number: Option<u64>,
    pub name: String,
    pub email: String,
    pub batch: String,
    pub date: String,
    pub timestamp: Option<String>,
    pub feedback: Option<String>,
}

/// A record exactly as the spreadsheet backend sends it. Column names show
/// up both lower-case and capitalized, and cells may hold numbers.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(default, rename = "rowNumber", deserialize_with = "deserialize_opt_row")]
    pub row_number: Option<u64>,
    #[serde(default, rename = "RowNumber", deserialize_with = "deserialize_opt_row")]
    pub row_number_cap: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub name: Option<String>,
    #[serde(default, rename = "Name", deserialize_with = "deserialize_opt_text")]
    pub name_cap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub email: Option<String>,
    #[serde(default, rename = "Email", deserialize_with = "deserialize_opt_text")]
    pub email_cap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub batch: Option<String>,
    #[serde(default, rename = "Batch", deserialize_with = "deserialize_opt_text")]
    pub batch_cap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub date: Option<String>,
    #[serde(default, rename = "Date", deserialize_with = "deserialize_opt_text")]
    pub date_cap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub timestamp: Option<String>,
    #[serde(default, rename = "Timestamp", deserialize_with = "deserialize_opt_text")]
    pub timestamp_cap: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_text")]
    pub feedback: Option<String>,
    #[serde(default, rename = "Feedback", deserialize_with = "deserialize_opt_text")]
    pub feedback_cap: Option<String>,
}

impl RawRecord {
    /// Ingest using the local zone for date normalization.
    pub fn into_record(self) -> AttendanceRecord {
        self.into_record_in(&Local)
    }

    /// Coalesce the two column spellings (lower-case wins when non-empty)
    /// and bring the date into canonical form.
    pub fn into_record_in<Tz: TimeZone>(self, tz: &Tz) -> AttendanceRecord {
        let date = coalesce(self.date, self.date_cap);
        AttendanceRecord {
            row_number: self.row_number.or(self.row_number_cap),
            name: coalesce(self.name, self.name_cap),
            email: coalesce(self.email, self.email_cap),
            batch: coalesce(self.batch, self.batch_cap),
            date: dates::normalize_date_in(&date, tz),
            timestamp: coalesce_opt(self.timestamp, self.timestamp_cap),
            feedback: coalesce_opt(self.feedback, self.feedback_cap),
        }
    }
}

fn coalesce_opt(lower: Option<String>, upper: Option<String>) -> Option<String> {
    lower
        .filter(|s| !s.is_empty())
        .or(upper.filter(|s| !s.is_empty()))
}

fn coalesce(lower: Option<String>, upper: Option<String>) -> String {
    coalesce_opt(lower, upper).unwrap_or_default()
}

fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

pub(crate) fn deserialize_opt_row<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f as u64)
            })
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid row number {n}"))),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid row number {s:?}"))),
        Some(other) => Err(D::Error::custom(format!(
            "expected row number, got {other}"
        ))),
    }
}

/// Response envelope used by every backend call.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// `success: false` becomes [`AttendanceError::Api`] carrying the
    /// backend's error text.
    pub fn into_result(self) -> Result<Option<T>, AttendanceError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(AttendanceError::Api(
                self.error
                    .or(self.message)
                    .unwrap_or_else(|| "request failed".into()),
            ))
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceipt {
    #[serde(default, deserialize_with = "deserialize_opt_row")]
    pub row_number: Option<u64>,
}

/// Keep only the records for one canonical day, in upstream order.
pub fn records_for_date(records: &[AttendanceRecord], date: &str) -> Vec<AttendanceRecord> {
    records.iter().filter(|r| r.date == date).cloned().collect()
}

#[async_trait]
pub trait AttendanceApi: Send + Sync + 'static {
    /// All stored check-ins, already ingested.
    async fn get_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError>;
    async fn create(&self, record: NewRecord) -> Result<CreateReceipt, AttendanceError>;
    async fn delete(&self, row_number: u64) -> Result<(), AttendanceError>;
    async fn update_feedback(&self, row_number: u64, feedback: &str)
    -> Result<(), AttendanceError>;
}
