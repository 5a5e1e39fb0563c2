use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{JobStore, StoreError};
use crate::models::job::{Job, JobStatus};

/// DashMap-backed store, enough to exercise the whole API without a
/// database.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<Uuid, Job>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, city: &str) -> Result<Job, StoreError> {
        let job = Job {
            job_id: Uuid::new_v4(),
            city: city.to_string(),
            status: JobStatus::Pending,
            result_data: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.jobs.insert(job.job_id, job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.get(&job_id).map(|entry| entry.value().clone()))
    }

    async fn mark_in_progress(&self, job_id: Uuid) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        job.status = JobStatus::InProgress;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result_data: &str) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        job.status = JobStatus::Completed;
        job.result_data = Some(result_data.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, job_id: Uuid) -> Result<(), StoreError> {
        let mut job = self.jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn sweep_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            let expired = job.status.is_terminal()
                && job.completed_at.map(|at| at < cutoff).unwrap_or(false);
            !expired
        });
        Ok((before - self.jobs.len()) as u64)
    }
}
