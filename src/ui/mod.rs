//! Minimal local HTTP UI.
//!
//! Exposes the v2.1 plan, location jobs and direct transformations over a
//! small JSON API plus a single static page. The server holds the token;
//! there is no authentication, so it binds to loopback by default.

mod error;
mod handlers;

use axum::Router;
use axum::routing::{get, post};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;
use crate::jobs::JobManager;

pub use error::{ApiError, ApiResult};

/// Shared state of the UI handlers.
#[derive(Clone)]
pub struct AppState {
    /// Location job manager; also owns the API handle.
    pub jobs: JobManager,
    /// Directory holding the v2.1 inputs.
    pub v21_dir: PathBuf,
}

impl AppState {
    /// State serving `v21_dir` with the given manager.
    #[must_use]
    pub fn new(jobs: JobManager, v21_dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs,
            v21_dir: v21_dir.into(),
        }
    }
}

/// Builds the UI router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/plan", get(handlers::plan))
        .route("/api/location-state/current", get(handlers::current_location_state))
        .route("/api/location-jobs/async-info", get(handlers::async_info))
        .route("/api/location-ids", get(handlers::location_ids))
        .route("/api/location-jobs", post(handlers::create_location_job))
        .route("/api/location-wbxc-jobs", post(handlers::create_calling_job))
        .route("/api/location-jobs/{job_id}", get(handlers::get_job))
        .route("/api/location-jobs/{job_id}/result", get(handlers::get_job_result))
        .route("/api/location-jobs/{job_id}/start", post(handlers::start_job))
        .route("/api/location-jobs/{job_id}/cancel", post(handlers::cancel_job))
        .route(
            "/api/transformacion/configurar-pstn",
            post(handlers::configure_pstn_handler),
        )
        .route(
            "/api/transformacion/alta-numeraciones",
            post(handlers::add_numbers_handler),
        )
        .route(
            "/api/transformacion/actualizar-cabecera",
            post(handlers::update_main_number_handler),
        )
        .route(
            "/api/transformacion/desvio-legacy",
            post(handlers::user_forward_legacy_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the UI until the process is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    info!("SpaceOdT UI listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobSettings;
    use crate::webex::testing::FakeWebex;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(temp: &TempDir, api: FakeWebex) -> AppState {
        let jobs = JobManager::new(
            Arc::new(api),
            temp.path().join("v21").join("jobs"),
            JobSettings {
                chunk_size: 10,
                max_concurrency: 2,
            },
        );
        AppState::new(jobs, temp.path().join("v21"))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Body, content_type: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", content_type)
            .body(body)
            .expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        call(app, "GET", uri, Body::empty(), "application/json").await
    }

    async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
        call(app, "POST", uri, Body::from(body.to_string()), "application/json").await
    }

    #[tokio::test]
    async fn test_index_and_async_info() {
        let temp = TempDir::new().expect("tempdir");
        let app = router(state(&temp, FakeWebex::default()));

        let request = Request::builder().uri("/").body(Body::empty()).expect("request");
        let response = app.clone().oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = get_json(&app, "/api/location-jobs/async-info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"chunk_size": 10, "max_concurrency": 2}));
    }

    #[tokio::test]
    async fn test_plan_requires_templates() {
        let temp = TempDir::new().expect("tempdir");
        let app = router(state(&temp, FakeWebex::default()));

        let (status, body) = get_json(&app, "/api/plan").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|e| e.contains("templates")));
    }

    #[tokio::test]
    async fn test_location_ids_requires_org() {
        let temp = TempDir::new().expect("tempdir");
        let app = router(state(&temp, FakeWebex::default().with_location("L1", "Madrid")));

        let (status, _) = get_json(&app, "/api/location-ids").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(&app, "/api/location-ids?orgId=ORG").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["org_id"], json!("ORG"));
        assert_eq!(body["items"], json!([{"location_id": "L1", "name": "Madrid"}]));
    }

    #[tokio::test]
    async fn test_job_lifecycle_over_http() {
        let temp = TempDir::new().expect("tempdir");
        let app = router(state(&temp, FakeWebex::default()));

        let (status, _) = get_json(&app, "/api/location-state/current").await;
        assert_eq!(status, StatusCode::OK);

        let rows = json!([{"location_name": "Madrid"}, {"location_name": "Sevilla"}]);
        let (status, created) = post_json(&app, "/api/location-jobs", &rows).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["count"], json!(2));
        assert_eq!(created["preview"][1]["location_name"], json!("Sevilla"));
        let job_id = created["job"]["job_id"].as_str().expect("id").to_string();

        let (status, _) = get_json(&app, &format!("/api/location-jobs/{job_id}/result")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, started) =
            post_json(&app, &format!("/api/location-jobs/{job_id}/start"), &json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["message"], json!("job started"));

        let mut job = Value::Null;
        for _ in 0..200 {
            let (_, current) = get_json(&app, &format!("/api/location-jobs/{job_id}")).await;
            job = current;
            if job["status"] == json!("completed") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(job["success_count"], json!(2));

        let (status, result) = get_json(&app, &format!("/api/location-jobs/{job_id}/result")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(result["items"].as_array().map(Vec::len), Some(2));

        let (status, _) = get_json(&app, "/api/location-jobs/unknown").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_multipart_csv_upload() {
        let temp = TempDir::new().expect("tempdir");
        let app = router(state(&temp, FakeWebex::default()));
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"locations.csv\"\r\n\
            Content-Type: text/csv\r\n\r\n\
            location_name,location_id\nMadrid,\nBilbao,L9\n\r\n\
            --XBOUNDARY--\r\n";

        let (status, created) = call(
            &app,
            "POST",
            "/api/location-wbxc-jobs",
            Body::from(body),
            "multipart/form-data; boundary=XBOUNDARY",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["count"], json!(2));
        assert_eq!(created["job"]["entity_type"], json!("location_webex_calling"));
    }

    #[tokio::test]
    async fn test_transformation_validation_and_success() {
        let temp = TempDir::new().expect("tempdir");
        let app = router(state(&temp, FakeWebex::default()));

        let (status, body) =
            post_json(&app, "/api/transformacion/configurar-pstn", &json!({"locationId": "L1"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().is_some_and(|e| e.contains("premiseRouteId")));

        let (status, body) = post_json(
            &app,
            "/api/transformacion/alta-numeraciones",
            &json!({"locationId": "L1", "phoneNumbers": ["+34910000001"], "numberType": "DID"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("success"));
    }
}
