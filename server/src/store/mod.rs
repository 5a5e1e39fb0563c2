pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::job::Job;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error("job {id} carries unknown status {status:?}")]
    InvalidStatus { id: Uuid, status: String },
}

/// Persistence seam for job records. Handlers and the analysis worker only
/// talk to this trait, so tests can run against the in-memory variant.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a fresh PENDING job for the given city.
    async fn create(&self, city: &str) -> Result<Job, StoreError>;

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    async fn mark_in_progress(&self, job_id: Uuid) -> Result<(), StoreError>;

    /// Terminal success: stores the serialized analysis payload.
    async fn complete(&self, job_id: Uuid, result_data: &str) -> Result<(), StoreError>;

    /// Terminal failure: only the status flips, no payload is written.
    async fn fail(&self, job_id: Uuid) -> Result<(), StoreError>;

    /// Delete terminal jobs that finished before the cutoff. Returns the
    /// number of rows removed.
    async fn sweep_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
