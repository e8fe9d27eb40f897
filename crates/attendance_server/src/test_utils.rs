//! In-memory `AttendanceApi` used by unit tests.
#![cfg(test)]

use async_trait::async_trait;
use attendance_client::{AttendanceApi, AttendanceError, AttendanceRecord, CreateReceipt, NewRecord};
use tokio::sync::Mutex;

/// Stores records in memory; row numbers start at 2 like a sheet with a
/// header row. A failing mock answers every call with an API error.
#[derive(Default)]
pub struct MockApi {
    records: Mutex<Vec<AttendanceRecord>>,
    failure: Option<String>,
}

impl MockApi {
    pub fn with_records(records: Vec<AttendanceRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            failure: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            records: Mutex::default(),
            failure: Some(message.to_string()),
        }
    }

    pub fn record(row: u64, name: &str, date: &str) -> AttendanceRecord {
        AttendanceRecord {
            row_number: Some(row),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            batch: "Morning (Mon-Fri, 7:00 AM - 8:30 AM)".to_string(),
            date: date.to_string(),
            timestamp: None,
            feedback: None,
        }
    }

    pub async fn snapshot(&self) -> Vec<AttendanceRecord> {
        self.records.lock().await.clone()
    }

    fn check(&self) -> Result<(), AttendanceError> {
        match &self.failure {
            Some(msg) => Err(AttendanceError::Api(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AttendanceApi for MockApi {
    async fn get_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.check()?;
        Ok(self.snapshot().await)
    }

    async fn create(&self, record: NewRecord) -> Result<CreateReceipt, AttendanceError> {
        self.check()?;
        let mut records = self.records.lock().await;
        let row = records
            .iter()
            .filter_map(|r| r.row_number)
            .max()
            .unwrap_or(1)
            + 1;
        records.push(AttendanceRecord {
            row_number: Some(row),
            name: record.name,
            email: record.email,
            batch: record.batch,
            date: record.date,
            timestamp: None,
            feedback: None,
        });
        Ok(CreateReceipt {
            row_number: Some(row),
        })
    }

    async fn delete(&self, row_number: u64) -> Result<(), AttendanceError> {
        self.check()?;
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.row_number != Some(row_number));
        if records.len() == before {
            return Err(AttendanceError::Api(format!("Row {row_number} does not exist")));
        }
        Ok(())
    }

    async fn update_feedback(
        &self,
        row_number: u64,
        feedback: &str,
    ) -> Result<(), AttendanceError> {
        self.check()?;
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.row_number == Some(row_number)) {
            Some(record) => {
                record.feedback = Some(feedback.to_string());
                Ok(())
            }
            None => Err(AttendanceError::Api(format!("Row {row_number} does not exist"))),
        }
    }
}
