//! HTTP client for the spreadsheet-backed attendance endpoint.
//!
//! This module provides a reqwest-based implementation of the
//! [`AttendanceApi`](crate::AttendanceApi) trait. The backend is a single
//! script URL: reads are plain GETs and every write is a POST whose JSON
//! body names the `action` to perform.

use crate::config::Config;
use crate::{
    ApiResponse, AttendanceApi, AttendanceError, AttendanceRecord, CreateReceipt, NewRecord,
    RawRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Write commands understood by the backend script.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum Command<'a> {
    Create {
        name: &'a str,
        email: &'a str,
        batch: &'a str,
        date: &'a str,
    },
    Delete {
        row_number: u64,
    },
    UpdateFeedback {
        row_number: u64,
        feedback: &'a str,
    },
}

/// Reply to a `create` command.
#[derive(Debug, Deserialize)]
struct CreateEnvelope {
    #[serde(flatten)]
    envelope: ApiResponse<serde_json::Value>,
    #[serde(default, rename = "rowNumber", deserialize_with = "crate::deserialize_opt_row")]
    row_number: Option<u64>,
}

/// Client for the attendance backend using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestAttendanceClient {
    api_url: SecretString,
    client: reqwest::Client,
}

impl ReqwestAttendanceClient {
    /// Create a new client for the given script URL. Redirects are followed,
    /// since deployed scripts answer through a redirect.
    pub fn new(api_url: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { api_url, client }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone())
    }

    /// Build a write request. The body goes out as plain text, which the
    /// script accepts without a CORS preflight.
    fn command_request(
        &self,
        command: &Command<'_>,
    ) -> Result<reqwest::RequestBuilder, AttendanceError> {
        let body = serde_json::to_string(command)?;
        Ok(self
            .client
            .post(self.api_url.expose_secret())
            .header(CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(body))
    }

    /// Execute a request and decode the JSON body. Bodies are read as text
    /// first since the script does not always label them as JSON.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AttendanceError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> AttendanceError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        tracing::warn!(status, body = %body_snippet, "attendance backend returned an error status");
        AttendanceError::Status {
            status,
            body: body_snippet,
        }
    }

    async fn run_command(
        &self,
        command: Command<'_>,
    ) -> Result<serde_json::Value, AttendanceError> {
        let request = self.command_request(&command)?;
        let envelope: ApiResponse<serde_json::Value> = self.execute_json(request).await?;
        let data = envelope.into_result()?;
        Ok(data.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl AttendanceApi for ReqwestAttendanceClient {
    async fn get_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        // Cache-busting parameter; intermediaries tend to cache script GETs.
        let stamp = Utc::now().timestamp_millis().to_string();
        let request = self
            .client
            .get(self.api_url.expose_secret())
            .query(&[("t", stamp.as_str())])
            .header(CACHE_CONTROL, "no-store");
        let envelope: ApiResponse<Vec<RawRecord>> = self.execute_json(request).await?;
        let raw = envelope.into_result()?.unwrap_or_default();
        tracing::debug!(count = raw.len(), "fetched attendance records");
        Ok(raw.into_iter().map(RawRecord::into_record).collect())
    }

    async fn create(&self, record: NewRecord) -> Result<CreateReceipt, AttendanceError> {
        let request = self.command_request(&Command::Create {
            name: &record.name,
            email: &record.email,
            batch: &record.batch,
            date: &record.date,
        })?;
        let CreateEnvelope {
            envelope,
            row_number,
        } = self.execute_json(request).await?;
        // Depending on the script deployment the row number arrives inside
        // `data`, as `data` itself, or next to `success`.
        let mut receipt = match envelope.into_result()? {
            Some(serde_json::Value::Object(map)) => {
                serde_json::from_value(serde_json::Value::Object(map))?
            }
            Some(serde_json::Value::Number(n)) => CreateReceipt {
                row_number: n.as_u64(),
            },
            _ => CreateReceipt::default(),
        };
        receipt.row_number = receipt.row_number.or(row_number);
        tracing::debug!(row_number = ?receipt.row_number, "created attendance record");
        Ok(receipt)
    }

    async fn delete(&self, row_number: u64) -> Result<(), AttendanceError> {
        self.run_command(Command::Delete { row_number }).await?;
        Ok(())
    }

    async fn update_feedback(
        &self,
        row_number: u64,
        feedback: &str,
    ) -> Result<(), AttendanceError> {
        tracing::debug!(row_number, "updating feedback");
        self.run_command(Command::UpdateFeedback {
            row_number,
            feedback,
        })
        .await?;
        Ok(())
    }
}
