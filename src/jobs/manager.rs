//! Supervised background execution of location jobs.

use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::JobSettings;
use crate::error::{JobError, Result, SpaceOdtError};
use crate::inputs::Payload;
use crate::webex::WebexApi;

use super::store::JobStore;
use super::types::{JobFailure, JobKind, JobResult, JobStatus, LocationJob};
use super::worker::process_location_job;

/// Response of a start request.
#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    /// Job as stored when the request was handled.
    pub job: LocationJob,
    /// `job started` or `job already running`.
    pub message: &'static str,
}

/// Creates, starts and cancels location jobs.
#[derive(Clone)]
pub struct JobManager {
    api: Arc<dyn WebexApi>,
    store: JobStore,
    settings: JobSettings,
    running: Arc<Mutex<HashMap<String, CancellationToken>>>,
}

impl JobManager {
    /// Manager storing jobs under `jobs_dir`.
    #[must_use]
    pub fn new(api: Arc<dyn WebexApi>, jobs_dir: impl Into<PathBuf>, settings: JobSettings) -> Self {
        Self {
            api,
            store: JobStore::new(jobs_dir),
            settings,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Processing tunables.
    #[must_use]
    pub const fn settings(&self) -> JobSettings {
        self.settings
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &JobStore {
        &self.store
    }

    /// API used by jobs.
    #[must_use]
    pub fn api(&self) -> &dyn WebexApi {
        self.api.as_ref()
    }

    /// Persists a new pending job.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be written.
    pub async fn create(&self, kind: JobKind, rows: &[Payload]) -> Result<LocationJob> {
        self.store.create(kind, rows).await
    }

    /// Loads a job.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown id.
    pub async fn get(&self, job_id: &str) -> Result<LocationJob> {
        self.store.get(job_id).await
    }

    /// Loads a job result.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] or [`JobError::ResultNotAvailable`].
    pub async fn result(&self, job_id: &str) -> Result<JobResult> {
        self.store.result(job_id).await
    }

    /// True while a worker task for `job_id` is alive.
    #[must_use]
    pub fn is_running(&self, job_id: &str) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(job_id)
    }

    /// Starts a supervised worker for the job unless one is running.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown id.
    pub async fn start(&self, job_id: &str) -> Result<StartOutcome> {
        let job = self.store.get(job_id).await?;
        let cancel = {
            let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            if running.contains_key(job_id) {
                return Ok(StartOutcome {
                    job,
                    message: "job already running",
                });
            }
            let token = CancellationToken::new();
            running.insert(job_id.to_string(), token.clone());
            token
        };

        let manager = self.clone();
        let id = job_id.to_string();
        tokio::spawn(async move { manager.supervise(id, cancel).await });
        info!("Started job {job_id}");

        Ok(StartOutcome {
            job,
            message: "job started",
        })
    }

    /// Requests cancellation; the worker stops before its next chunk.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::NotFound`] for an unknown id, or
    /// [`JobError::NotRunning`] when no worker is active.
    pub async fn cancel(&self, job_id: &str) -> Result<LocationJob> {
        let job = self.store.get(job_id).await?;
        let token = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned();
        match token {
            Some(token) => {
                token.cancel();
                info!("Cancellation requested for job {job_id}");
                Ok(job)
            }
            None => Err(JobError::NotRunning {
                job_id: job_id.to_string(),
            }
            .into()),
        }
    }

    /// Runs the worker in its own task and records a failure if it errors
    /// or panics.
    async fn supervise(self, job_id: String, cancel: CancellationToken) {
        let worker = {
            let api = Arc::clone(&self.api);
            let store = self.store.clone();
            let settings = self.settings;
            let job_id = job_id.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                process_location_job(api.as_ref(), &store, &job_id, settings, &cancel).await
            })
        };

        let failure = match worker.await {
            Ok(Ok(_)) => None,
            Ok(Err(err)) => Some(JobFailure {
                failed_at: Utc::now(),
                error_type: err.kind().to_string(),
                error_message: err.to_string(),
            }),
            Err(join) => Some(JobFailure {
                failed_at: Utc::now(),
                error_type: String::from("panic"),
                error_message: join.to_string(),
            }),
        };

        if let Some(failure) = failure {
            error!("Job {job_id} failed: {}", failure.error_message);
            if let Err(err) = self.record_failure(&job_id, &failure).await {
                error!("Could not record failure of job {job_id}: {err}");
            }
        }

        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }

    async fn record_failure(&self, job_id: &str, failure: &JobFailure) -> Result<()> {
        let mut job = self.store.get(job_id).await?;
        job.set_status(JobStatus::Failed);
        job.last_error = Some(serde_json::to_value(failure).map_err(SpaceOdtError::from)?);
        self.store.save(&job).await?;
        self.store.save_failure(job_id, failure).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webex::testing::FakeWebex;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn rows(count: usize) -> Vec<Payload> {
        (0..count)
            .map(|i| {
                json!({"location_name": format!("LAB-{i}")})
                    .as_object()
                    .cloned()
                    .unwrap_or_default()
            })
            .collect()
    }

    async fn wait_terminal(manager: &JobManager, job_id: &str) -> LocationJob {
        for _ in 0..200 {
            let job = manager.get(job_id).await.expect("job");
            if job.status.is_terminal() && !manager.is_running(job_id) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not finish");
    }

    fn manager(temp: &TempDir, api: FakeWebex) -> JobManager {
        JobManager::new(
            Arc::new(api),
            temp.path().join("jobs"),
            JobSettings {
                chunk_size: 2,
                max_concurrency: 2,
            },
        )
    }

    #[tokio::test]
    async fn test_start_runs_to_completion() {
        let temp = TempDir::new().expect("tempdir");
        let manager = manager(&temp, FakeWebex::default());
        let job = manager.create(JobKind::Location, &rows(5)).await.expect("create");

        let started = manager.start(&job.job_id).await.expect("start");
        assert_eq!(started.message, "job started");

        let done = wait_terminal(&manager, &job.job_id).await;
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.success_count, 5);
        assert_eq!(manager.result(&job.job_id).await.expect("result").items.len(), 5);
    }

    #[tokio::test]
    async fn test_worker_failure_is_recorded() {
        let temp = TempDir::new().expect("tempdir");
        let manager = manager(&temp, FakeWebex::default());
        let job = manager.create(JobKind::Location, &rows(1)).await.expect("create");
        std::fs::remove_file(temp.path().join("jobs").join(&job.job_id).join("rows.json"))
            .expect("remove rows");

        manager.start(&job.job_id).await.expect("start");
        let done = wait_terminal(&manager, &job.job_id).await;
        assert_eq!(done.status, JobStatus::Failed);
        assert_eq!(done.last_error.as_ref().and_then(|e| e.get("error_type")), Some(&json!("job")));
        assert!(temp.path().join("jobs").join(&job.job_id).join("failure.json").exists());
    }

    #[tokio::test]
    async fn test_cancel_requires_running_job() {
        let temp = TempDir::new().expect("tempdir");
        let manager = manager(&temp, FakeWebex::default());
        let job = manager.create(JobKind::Location, &rows(1)).await.expect("create");

        let err = manager.cancel(&job.job_id).await.expect_err("not running");
        assert!(err.to_string().contains("job is not running"));
        assert!(manager.cancel("missing").await.is_err());
        assert!(manager.start("missing").await.is_err());
    }
}
