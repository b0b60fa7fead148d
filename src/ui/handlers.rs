//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{InputError, PlanError, SpaceOdtError};
use crate::inputs::{json_rows, load_locations_from_json, rows_from_file_bytes};
use crate::jobs::{JobKind, JobResult, LocationJob, StartOutcome};
use crate::planner::ProvisioningInputs;
use crate::transform::{
    AddNumbersRequest, ConfigurePstnRequest, TransformResult, UpdateMainNumberRequest,
    UserForwardLegacyRequest, add_numbers, configure_pstn, update_main_number, user_forward_legacy,
};

use super::AppState;
use super::error::ApiResult;

/// Rows shown back after an upload.
const PREVIEW_ROWS: usize = 10;

const INDEX_HTML: &str = include_str!("../../assets/ui.html");

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn plan(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let inputs = ProvisioningInputs::load(&state.v21_dir)?;
    Ok(Json(json!({ "items": inputs.plan() })))
}

pub async fn current_location_state(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    match state.jobs.store().latest_completed_result().await? {
        Some(result) => Ok(Json(serde_json::to_value(result)?)),
        None => Ok(Json(json!({ "status": "empty" }))),
    }
}

pub async fn async_info(State(state): State<AppState>) -> Json<Value> {
    let settings = state.jobs.settings();
    Json(json!({
        "chunk_size": settings.chunk_size,
        "max_concurrency": settings.max_concurrency,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LocationIdsQuery {
    #[serde(rename = "orgId")]
    org_id: Option<String>,
}

pub async fn location_ids(
    State(state): State<AppState>,
    Query(query): Query<LocationIdsQuery>,
) -> ApiResult<Json<Value>> {
    let org_id = query
        .org_id
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .ok_or_else(|| PlanError::missing("orgId"))?;
    let locations = state.jobs.api().list_locations(Some(&org_id)).await?;
    let items: Vec<Value> = locations
        .into_iter()
        .map(|l| json!({ "location_id": l.id, "name": l.name }))
        .collect();
    Ok(Json(json!({ "org_id": org_id, "items": items })))
}

pub async fn create_location_job(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<Value>> {
    create_job(&state, JobKind::Location, request).await
}

pub async fn create_calling_job(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<Value>> {
    create_job(&state, JobKind::LocationWebexCalling, request).await
}

async fn create_job(state: &AppState, kind: JobKind, request: Request) -> ApiResult<Json<Value>> {
    let rows = upload_rows(state, request).await?;
    let records = load_locations_from_json(rows)?;
    let payloads: Vec<_> = records.into_iter().map(|r| r.payload).collect();
    let job = state.jobs.create(kind, &payloads).await?;
    info!("Created {kind:?} job {} with {} rows", job.job_id, payloads.len());

    let preview: Vec<_> = payloads.iter().take(PREVIEW_ROWS).collect();
    Ok(Json(json!({
        "job": job,
        "count": payloads.len(),
        "preview": preview,
    })))
}

/// Reads rows from a JSON array body or a multipart `.csv`/`.json` file.
async fn upload_rows(state: &AppState, request: Request) -> ApiResult<Vec<Value>> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    if !is_multipart {
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        return Ok(json_rows(&body)?);
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| upload_error(e.to_string()))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| upload_error(e.to_string()))?;
        return Ok(rows_from_file_bytes(&file_name, &bytes)?);
    }
    Err(upload_error(String::from("no file in upload")).into())
}

fn upload_error(message: String) -> SpaceOdtError {
    InputError::UnsupportedUpload { message }.into()
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<LocationJob>> {
    Ok(Json(state.jobs.get(&job_id).await?))
}

pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobResult>> {
    Ok(Json(state.jobs.result(&job_id).await?))
}

pub async fn start_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StartOutcome>> {
    Ok(Json(state.jobs.start(&job_id).await?))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let job = state.jobs.cancel(&job_id).await?;
    Ok(Json(json!({ "job": job, "message": "cancellation requested" })))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.is_empty() {
        return Ok(serde_json::from_str("{}")?);
    }
    Ok(serde_json::from_slice(body)?)
}

pub async fn configure_pstn_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<TransformResult>> {
    let request: ConfigurePstnRequest = parse_body(&body)?;
    Ok(Json(configure_pstn(state.jobs.api(), &request).await?))
}

pub async fn add_numbers_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<TransformResult>> {
    let request: AddNumbersRequest = parse_body(&body)?;
    Ok(Json(add_numbers(state.jobs.api(), &request).await?))
}

pub async fn update_main_number_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<TransformResult>> {
    let request: UpdateMainNumberRequest = parse_body(&body)?;
    Ok(Json(update_main_number(state.jobs.api(), &request).await?))
}

pub async fn user_forward_legacy_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<TransformResult>> {
    let request: UserForwardLegacyRequest = parse_body(&body)?;
    Ok(Json(user_forward_legacy(state.jobs.api(), &request).await?))
}
