//! Location jobs.
//!
//! Uploaded location rows become a persisted job. A started job runs as a
//! supervised background task with chunking, a concurrency cap, a single
//! rate-limit retry per call and cooperative cancellation.

mod manager;
mod store;
mod types;
mod worker;

pub use manager::{JobManager, StartOutcome};
pub use store::JobStore;
pub use types::{JobFailure, JobKind, JobResult, JobStatus, LocationJob, RowResult, RowStatus};
pub use worker::process_location_job;
