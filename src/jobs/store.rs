//! On-disk job storage under `<out>/v21/jobs/<job_id>/`.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{JobError, Result};
use crate::inputs::Payload;
use crate::state::{load_json, save_json};

use super::types::{JobFailure, JobKind, JobResult, JobStatus, LocationJob};

const JOB_FILE: &str = "job.json";
const ROWS_FILE: &str = "rows.json";
const RESULT_FILE: &str = "result.json";
const FAILURE_FILE: &str = "failure.json";

/// File-backed job store.
#[derive(Debug, Clone)]
pub struct JobStore {
    jobs_dir: PathBuf,
}

impl JobStore {
    /// Store rooted at `jobs_dir`.
    #[must_use]
    pub fn new(jobs_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs_dir: jobs_dir.into(),
        }
    }

    /// Root directory.
    #[must_use]
    pub fn jobs_dir(&self) -> &Path {
        &self.jobs_dir
    }

    fn job_dir(&self, job_id: &str) -> PathBuf {
        self.jobs_dir.join(job_id)
    }

    /// Persists a new pending job with its rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the files cannot be written.
    pub async fn create(&self, kind: JobKind, rows: &[Payload]) -> Result<LocationJob> {
        let job = LocationJob::new(kind, rows.len());
        save_json(&self.job_dir(&job.job_id).join(ROWS_FILE), &rows).await?;
        self.save(&job).await?;
        debug!("Created job {} with {} rows", job.job_id, rows.len());
        Ok(job)
    }

    /// Loads a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown id.
    pub async fn get(&self, job_id: &str) -> Result<LocationJob> {
        // Ids are single path components.
        if job_id.is_empty() || job_id.contains(['/', '\\']) || job_id.starts_with('.') {
            return Err(not_found(job_id));
        }
        load_json(&self.job_dir(job_id).join(JOB_FILE))
            .await?
            .ok_or_else(|| not_found(job_id))
    }

    /// Saves the job header.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, job: &LocationJob) -> Result<()> {
        save_json(&self.job_dir(&job.job_id).join(JOB_FILE), job).await
    }

    /// Rows uploaded for a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] when the rows file is missing.
    pub async fn rows(&self, job_id: &str) -> Result<Vec<Payload>> {
        load_json(&self.job_dir(job_id).join(ROWS_FILE))
            .await?
            .ok_or_else(|| not_found(job_id))
    }

    /// Saves the result snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_result(&self, result: &JobResult) -> Result<()> {
        save_json(&self.job_dir(&result.job_id).join(RESULT_FILE), result).await
    }

    /// Loads the result snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown job, or
    /// [`JobError::ResultNotAvailable`] before the first chunk finished.
    pub async fn result(&self, job_id: &str) -> Result<JobResult> {
        self.get(job_id).await?;
        load_json(&self.job_dir(job_id).join(RESULT_FILE))
            .await?
            .ok_or_else(|| {
                JobError::ResultNotAvailable {
                    job_id: job_id.to_string(),
                }
                .into()
            })
    }

    /// Writes `failure.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save_failure(&self, job_id: &str, failure: &JobFailure) -> Result<()> {
        save_json(&self.job_dir(job_id).join(FAILURE_FILE), failure).await
    }

    /// Result of the most recently updated completed job.
    ///
    /// # Errors
    ///
    /// Returns an error if the jobs directory cannot be listed.
    pub async fn latest_completed_result(&self) -> Result<Option<JobResult>> {
        if !self.jobs_dir.exists() {
            return Ok(None);
        }

        let mut latest: Option<LocationJob> = None;
        let mut entries = fs::read_dir(&self.jobs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path().join(JOB_FILE);
            let Ok(Some(job)) = load_json::<LocationJob>(&path).await else {
                continue;
            };
            if job.status != JobStatus::Completed {
                continue;
            }
            if latest.as_ref().is_none_or(|l| job.updated_at > l.updated_at) {
                latest = Some(job);
            }
        }

        match latest {
            Some(job) => load_json(&self.job_dir(&job.job_id).join(RESULT_FILE)).await,
            None => Ok(None),
        }
    }
}

fn not_found(job_id: &str) -> crate::error::SpaceOdtError {
    JobError::NotFound {
        job_id: job_id.to_string(),
    }
    .into()
}
