use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{JobStore, StoreError};
use crate::models::job::{Job, JobStatus};

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn job_from_row(row: &PgRow) -> Result<Job, StoreError> {
        let job_id: Uuid = row.try_get("job_id")?;
        let raw_status: String = row.try_get("status")?;
        let status = JobStatus::parse(&raw_status).ok_or(StoreError::InvalidStatus {
            id: job_id,
            status: raw_status,
        })?;
        Ok(Job {
            job_id,
            city: row.try_get("city")?,
            status,
            result_data: row.try_get("result_data")?,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, city: &str) -> Result<Job, StoreError> {
        let row = sqlx::query(
            "INSERT INTO jobs (job_id, city, status)
             VALUES ($1, $2, $3)
             RETURNING job_id, city, status, result_data, created_at, completed_at",
        )
        .bind(Uuid::new_v4())
        .bind(city)
        .bind(JobStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;
        Self::job_from_row(&row)
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query(
            "SELECT job_id, city, status, result_data, created_at, completed_at
             FROM jobs WHERE job_id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::job_from_row).transpose()
    }

    async fn mark_in_progress(&self, job_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE jobs SET status = $1 WHERE job_id = $2")
            .bind(JobStatus::InProgress.as_str())
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(job_id));
        }
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result_data: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $1, result_data = $2, completed_at = NOW()
             WHERE job_id = $3",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(result_data)
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(job_id));
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = $1, completed_at = NOW() WHERE job_id = $2",
        )
        .bind(JobStatus::Failed.as_str())
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(job_id));
        }
        Ok(())
    }

    async fn sweep_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM jobs
             WHERE status IN ($1, $2) AND completed_at < $3",
        )
        .bind(JobStatus::Completed.as_str())
        .bind(JobStatus::Failed.as_str())
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
