//! Chunked processing of a location job.
//!
//! Rows are processed in chunks; inside a chunk up to `max_concurrency` rows
//! are in flight and complete in any order. Counters and the partial result
//! are persisted after every chunk, and cancellation is checked between
//! chunks.

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::JobSettings;
use crate::error::{PlanError, Result};
use crate::inputs::{Payload, payload_string};
use crate::planner::{new_location, org_id};
use crate::webex::{Setting, SettingTarget, WebexApi, invoke_with_retry_after};

use super::store::JobStore;
use super::types::{JobKind, JobResult, JobStatus, LocationJob, RowResult, RowStatus};

/// Runs a job to completion or cancellation.
///
/// # Errors
///
/// Returns an error if the job or its rows cannot be loaded or saved. Row
/// failures are recorded in the result instead.
pub async fn process_location_job(
    api: &dyn WebexApi,
    store: &JobStore,
    job_id: &str,
    settings: JobSettings,
    cancel: &CancellationToken,
) -> Result<LocationJob> {
    let mut job = store.get(job_id).await?;
    let rows = store.rows(job_id).await?;
    let chunk_size = settings.chunk_size.max(1);
    let max_concurrency = settings.max_concurrency.max(1);

    job.total_count = rows.len();
    job.processed_count = 0;
    job.success_count = 0;
    job.failed_count = 0;
    job.last_error = None;
    job.set_status(JobStatus::Running);
    store.save(&job).await?;
    info!(
        "Job {job_id}: {} rows, chunk size {chunk_size}, concurrency {max_concurrency}",
        rows.len()
    );

    let mut items = Vec::with_capacity(rows.len());
    for (chunk_index, chunk) in rows.chunks(chunk_size).enumerate() {
        if cancel.is_cancelled() {
            info!("Job {job_id} cancelled after {} rows", job.processed_count);
            job.set_status(JobStatus::Cancelled);
            break;
        }

        let offset = chunk_index * chunk_size;
        let kind = job.entity_type;
        let results: Vec<RowResult> = stream::iter(chunk.to_vec().into_iter().enumerate())
            .map(|(i, row)| process_row(api, kind, offset + i, row))
            .buffer_unordered(max_concurrency)
            .collect()
            .await;

        for result in &results {
            job.record(result);
        }
        items.extend(results);
        store.save(&job).await?;
        store.save_result(&JobResult::new(&job, items.clone())).await?;
        debug!(
            "Job {job_id}: chunk {chunk_index} done, {}/{} processed",
            job.processed_count, job.total_count
        );
    }

    if job.status == JobStatus::Running {
        job.set_status(JobStatus::Completed);
    }
    store.save(&job).await?;
    store.save_result(&JobResult::new(&job, items)).await?;
    info!(
        "Job {job_id} {}: {} ok, {} failed",
        job.status, job.success_count, job.failed_count
    );
    Ok(job)
}

async fn process_row(
    api: &dyn WebexApi,
    kind: JobKind,
    row_index: usize,
    row: Payload,
) -> RowResult {
    let location_name = payload_string(&row, "location_name");
    match provision_row(api, kind, &row).await {
        Ok((status, location_id)) => RowResult {
            row_index,
            location_name,
            status,
            location_id: Some(location_id),
            error: None,
        },
        Err(err) => RowResult {
            row_index,
            location_name,
            status: RowStatus::Failed,
            location_id: payload_string(&row, "location_id"),
            error: Some(err.to_string()),
        },
    }
}

async fn provision_row(
    api: &dyn WebexApi,
    kind: JobKind,
    row: &Payload,
) -> Result<(RowStatus, String)> {
    let org = org_id(row);
    let org = org.as_deref();
    let name = payload_string(row, "location_name");

    let existing = match (payload_string(row, "location_id"), &name) {
        (Some(id), _) => Some(id),
        (None, Some(name)) => invoke_with_retry_after(|| api.find_location(name, org))
            .await?
            .map(|location| location.id),
        (None, None) => return Err(PlanError::missing("location_name").into()),
    };

    match kind {
        JobKind::Location => {
            if let Some(id) = existing {
                return Ok((RowStatus::Exists, id));
            }
            let name = name.unwrap_or_default();
            let location = new_location(row, &name);
            let id = invoke_with_retry_after(|| api.create_location(&location, org)).await?;
            invoke_with_retry_after(|| api.enable_location_calling(&id, &location, org)).await?;
            Ok((RowStatus::Created, id))
        }
        JobKind::LocationWebexCalling => {
            let id = existing.ok_or_else(|| PlanError::Unresolved {
                kind: "location",
                reference: name.clone().unwrap_or_default(),
            })?;
            let target = SettingTarget::Location(id.clone());
            match invoke_with_retry_after(|| api.read_setting(&target, Setting::Telephony, org))
                .await
            {
                Ok(_) => Ok((RowStatus::Exists, id)),
                Err(err) if err.http_status() == Some(404) => {
                    let location_name = name.unwrap_or_default();
                    let location = new_location(row, &location_name);
                    invoke_with_retry_after(|| api.enable_location_calling(&id, &location, org))
                        .await?;
                    Ok((RowStatus::Created, id))
                }
                Err(err) => Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webex::testing::FakeWebex;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn rows(names: &[&str]) -> Vec<Payload> {
        names
            .iter()
            .map(|name| json!({"location_name": name}).as_object().cloned().unwrap_or_default())
            .collect()
    }

    fn settings(chunk_size: usize) -> JobSettings {
        JobSettings {
            chunk_size,
            max_concurrency: 4,
        }
    }

    #[tokio::test]
    async fn test_rows_record_created_exists_failed() {
        let temp = TempDir::new().expect("tempdir");
        let store = JobStore::new(temp.path());
        let api = FakeWebex::default().with_location("L1", "Madrid");
        let mut input = rows(&["Madrid", "Sevilla"]);
        input.push(Payload::new());
        let job = store.create(JobKind::Location, &input).await.expect("create");

        let done = process_location_job(&api, &store, &job.job_id, settings(2), &CancellationToken::new())
            .await
            .expect("process");
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.processed_count, 3);
        assert_eq!(done.success_count, 2);
        assert_eq!(done.failed_count, 1);

        let result = store.result(&job.job_id).await.expect("result");
        let statuses: Vec<_> = result.items.iter().map(|i| i.status).collect();
        assert_eq!(statuses, vec![RowStatus::Exists, RowStatus::Created, RowStatus::Failed]);
        assert_eq!(result.items[0].location_id.as_deref(), Some("L1"));
        assert_eq!(result.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_job_runs_on_spawned_task() {
        let temp = TempDir::new().expect("tempdir");
        let store = JobStore::new(temp.path());
        let api: Arc<dyn WebexApi> = Arc::new(FakeWebex::default());
        let job = store
            .create(JobKind::Location, &rows(&["A", "B", "C"]))
            .await
            .expect("create");

        let handle = {
            let store = store.clone();
            let job_id = job.job_id.clone();
            tokio::spawn(async move {
                process_location_job(api.as_ref(), &store, &job_id, settings(2), &CancellationToken::new())
                    .await
            })
        };
        let done = handle.await.expect("join").expect("process");
        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.success_count, 3);
    }

    #[tokio::test]
    async fn test_rate_limited_row_retried_once() {
        let temp = TempDir::new().expect("tempdir");
        let store = JobStore::new(temp.path());
        let api = FakeWebex::default().failing_times(
            "create_location",
            429,
            Some(Duration::from_millis(10)),
            1,
        );
        let job = store.create(JobKind::Location, &rows(&["Sevilla"])).await.expect("create");

        let done = process_location_job(&api, &store, &job.job_id, settings(10), &CancellationToken::new())
            .await
            .expect("process");
        assert_eq!(done.success_count, 1);
        assert_eq!(api.calls("create_location"), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_chunk() {
        let temp = TempDir::new().expect("tempdir");
        let store = JobStore::new(temp.path());
        let api = FakeWebex::default();
        let job = store.create(JobKind::Location, &rows(&["A", "B"])).await.expect("create");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let done = process_location_job(&api, &store, &job.job_id, settings(1), &cancel)
            .await
            .expect("process");
        assert_eq!(done.status, JobStatus::Cancelled);
        assert_eq!(done.processed_count, 0);
        assert_eq!(api.calls("create_location"), 0);
    }

    #[tokio::test]
    async fn test_webex_calling_job_enables_existing_only() {
        let temp = TempDir::new().expect("tempdir");
        let store = JobStore::new(temp.path());
        let api = FakeWebex::default().with_location("L1", "Madrid");
        let mut input = vec![json!({"location_id": "L2", "location_name": "Bilbao"})
            .as_object()
            .cloned()
            .unwrap_or_default()];
        input.extend(rows(&["Madrid", "Nowhere"]));
        let job = store
            .create(JobKind::LocationWebexCalling, &input)
            .await
            .expect("create");

        process_location_job(&api, &store, &job.job_id, settings(5), &CancellationToken::new())
            .await
            .expect("process");
        let result = store.result(&job.job_id).await.expect("result");
        let statuses: Vec<_> = result.items.iter().map(|i| i.status).collect();
        assert_eq!(statuses, vec![RowStatus::Created, RowStatus::Exists, RowStatus::Failed]);
        assert_eq!(api.calls("create_location"), 0);
    }
}
