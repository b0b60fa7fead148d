//! Location job records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// What a job does with each row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Create the location if missing, then enable calling.
    #[default]
    Location,
    /// Enable calling on an existing location.
    LocationWebexCalling,
}

/// Lifecycle of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Created, not started.
    Pending,
    /// Worker active.
    Running,
    /// Every chunk processed.
    Completed,
    /// The worker itself failed.
    Failed,
    /// Stopped by request between chunks.
    Cancelled,
}

impl JobStatus {
    /// True once the job can no longer change on its own.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Persisted job header (`job.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationJob {
    /// Job identifier.
    pub job_id: String,
    /// Row handling.
    pub entity_type: JobKind,
    /// Current status.
    pub status: JobStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// Rows in the job.
    pub total_count: usize,
    /// Rows processed so far.
    pub processed_count: usize,
    /// Rows created or already present.
    pub success_count: usize,
    /// Rows that failed.
    pub failed_count: usize,
    /// Last row error, or the failure record when the worker failed.
    #[serde(default)]
    pub last_error: Option<Value>,
}

impl LocationJob {
    /// New pending job.
    #[must_use]
    pub fn new(entity_type: JobKind, total_count: usize) -> Self {
        let now = Utc::now();
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            entity_type,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            total_count,
            processed_count: 0,
            success_count: 0,
            failed_count: 0,
            last_error: None,
        }
    }

    /// Updates the status.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Folds a processed row into the counters.
    pub fn record(&mut self, row: &RowResult) {
        self.processed_count += 1;
        match row.status {
            RowStatus::Created | RowStatus::Exists => self.success_count += 1,
            RowStatus::Failed => {
                self.failed_count += 1;
                if let Some(error) = &row.error {
                    self.last_error = Some(Value::String(error.clone()));
                }
            }
        }
        self.updated_at = Utc::now();
    }
}

/// Outcome of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// Created or enabled by this job.
    Created,
    /// Already in place.
    Exists,
    /// Failed.
    Failed,
}

/// Per-row result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    /// Zero-based row index in the upload.
    pub row_index: usize,
    /// Location name from the row.
    pub location_name: Option<String>,
    /// Outcome.
    pub status: RowStatus,
    /// Location ID when known.
    pub location_id: Option<String>,
    /// Error text.
    pub error: Option<String>,
}

/// Contents of `result.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Job identifier.
    pub job_id: String,
    /// Job status when written.
    pub status: JobStatus,
    /// When written.
    pub generated_at: DateTime<Utc>,
    /// Rows processed so far, sorted by row index.
    pub items: Vec<RowResult>,
}

impl JobResult {
    /// Snapshot of the job with the given rows.
    #[must_use]
    pub fn new(job: &LocationJob, mut items: Vec<RowResult>) -> Self {
        items.sort_by_key(|item| item.row_index);
        Self {
            job_id: job.job_id.clone(),
            status: job.status,
            generated_at: Utc::now(),
            items,
        }
    }
}

/// Contents of `failure.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobFailure {
    /// When the worker failed.
    pub failed_at: DateTime<Utc>,
    /// Error category.
    pub error_type: String,
    /// Error text.
    pub error_message: String,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{status}")
    }
}
