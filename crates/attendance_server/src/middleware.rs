//! Middleware layer for cross-cutting concerns around the backend client.
//!
//! Every call is timed, logged at debug level, and counted in the
//! `attendance_api_*` metrics.

use std::sync::Arc;
use std::time::Instant;

use attendance_client::observability;
use attendance_client::{AttendanceApi, AttendanceError, AttendanceRecord, CreateReceipt, NewRecord};
use tracing::debug;

/// Wraps any [`AttendanceApi`] with logging and metrics.
pub struct InstrumentedApi<C: AttendanceApi> {
    inner: Arc<C>,
}

impl<C: AttendanceApi> Clone for InstrumentedApi<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: AttendanceApi> InstrumentedApi<C> {
    pub fn new(client: C) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    async fn instrument<F, Fut, T>(
        &self,
        op: &'static str,
        operation: F,
    ) -> Result<T, AttendanceError>
    where
        F: FnOnce(Arc<C>) -> Fut,
        Fut: std::future::Future<Output = Result<T, AttendanceError>>,
    {
        let start = Instant::now();
        debug!(op, "calling attendance backend");

        let result = operation(self.inner.clone()).await;

        let elapsed = start.elapsed();
        match &result {
            Ok(_) => debug!(op, ?elapsed, "backend call succeeded"),
            Err(e) => debug!(op, ?elapsed, error = %e, "backend call failed"),
        }
        observability::record_request(op, result.is_ok(), elapsed);

        result
    }
}

#[async_trait::async_trait]
impl<C: AttendanceApi> AttendanceApi for InstrumentedApi<C> {
    async fn get_all(&self) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        self.instrument("get_all", |client| async move { client.get_all().await })
            .await
    }

    async fn create(&self, record: NewRecord) -> Result<CreateReceipt, AttendanceError> {
        self.instrument("create", |client| async move { client.create(record).await })
            .await
    }

    async fn delete(&self, row_number: u64) -> Result<(), AttendanceError> {
        self.instrument("delete", |client| async move { client.delete(row_number).await })
            .await
    }

    async fn update_feedback(
        &self,
        row_number: u64,
        feedback: &str,
    ) -> Result<(), AttendanceError> {
        self.instrument("update_feedback", |client| async move {
            client.update_feedback(row_number, feedback).await
        })
        .await
    }
}
