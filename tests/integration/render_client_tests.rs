/*!
 * Render API client tests against a local mock of the render service
 */

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use shortform::app_config::{Config, RenderConfig};
use shortform::app_controller::Controller;
use shortform::errors::{ProviderError, RenderError};
use shortform::file_utils::RunContext;
use shortform::render::{RenderClient, RenderStatus, TemplateRender};

use crate::common;

const API_KEY: &str = "test-key";

#[derive(Clone)]
struct MockState {
    addr: SocketAddr,
    submissions: Arc<parking_lot::Mutex<Vec<Value>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", API_KEY))
        .unwrap_or(false)
}

async fn submit(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    state.submissions.lock().push(body);
    Json(json!([{ "id": "r1", "status": "planned" }])).into_response()
}

async fn status(State(state): State<MockState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "invalid api key").into_response();
    }
    let job = match id.as_str() {
        "r1" => json!({
            "id": "r1",
            "status": "succeeded",
            "url": format!("http://{}/files/video.mp4", state.addr),
            "snapshot_url": format!("http://{}/files/snapshot.jpg", state.addr),
        }),
        "broken" => json!({ "id": "broken", "status": "failed", "error_message": "bad source" }),
        "slow" => json!({ "id": "slow", "status": "rendering" }),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(job).into_response()
}

async fn file(Path(name): Path<String>) -> Response {
    match name.as_str() {
        "video.mp4" => b"video-bytes".to_vec().into_response(),
        "snapshot.jpg" => b"jpeg".to_vec().into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn spawn_mock() -> Result<MockState> {
    common::init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let state = MockState {
        addr: listener.local_addr()?,
        submissions: Arc::default(),
    };

    let router = Router::new()
        .route("/v1/renders", post(submit))
        .route("/v1/renders/:id", get(status))
        .route("/files/:name", get(file))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(state)
}

fn render_config(state: &MockState) -> RenderConfig {
    RenderConfig {
        endpoint: format!("http://{}/v1/renders/", state.addr),
        api_key: API_KEY.to_string(),
        poll_interval_secs: 1,
        poll_timeout_secs: 1,
        ..RenderConfig::default()
    }
}

/// Test that a client cannot be built without an API key
#[test]
fn test_new_withoutApiKey_shouldFail() {
    let config = RenderConfig {
        api_key: "  ".to_string(),
        ..RenderConfig::default()
    };
    assert!(matches!(RenderClient::new(&config), Err(RenderError::MissingApiKey)));
}

/// Test that a scene submission wraps the source and returns the jobs
#[tokio::test]
async fn test_submitSource_shouldReturnPlannedJob() -> Result<()> {
    let state = spawn_mock().await?;
    let client = RenderClient::new(&render_config(&state))?;

    let jobs = client.submit_source(&json!({ "width": 720 })).await?;

    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "r1");
    assert_eq!(jobs[0].status, RenderStatus::Planned);
    assert_eq!(state.submissions.lock().clone(), vec![json!({ "source": { "width": 720 } })]);
    Ok(())
}

/// Test that a rejected key surfaces as an authentication error
#[tokio::test]
async fn test_submitSource_withWrongKey_shouldReturnAuthenticationError() -> Result<()> {
    let state = spawn_mock().await?;
    let config = RenderConfig {
        api_key: "wrong".to_string(),
        ..render_config(&state)
    };
    let client = RenderClient::new(&config)?;

    let result = client.submit_source(&json!({})).await;

    assert!(matches!(
        result,
        Err(RenderError::Provider(ProviderError::AuthenticationError(_)))
    ));
    Ok(())
}

/// Test waiting on a finished render and downloading its output
#[tokio::test]
async fn test_waitFor_withSucceededRender_shouldAllowDownload() -> Result<()> {
    let state = spawn_mock().await?;
    let client = RenderClient::new(&render_config(&state))?;
    let temp_dir = common::create_temp_dir()?;

    let job = client.wait_for("r1").await?;
    let url = job.url.clone().unwrap_or_default();
    let dest = temp_dir.path().join("nested/video.mp4");
    let bytes = client.download(&url, &dest).await?;

    assert_eq!(job.status, RenderStatus::Succeeded);
    assert_eq!(bytes, 11);
    assert_eq!(std::fs::read(&dest)?, b"video-bytes");
    Ok(())
}

/// Test that a failed render reports the service's message
#[tokio::test]
async fn test_waitFor_withFailedRender_shouldReturnFailed() -> Result<()> {
    let state = spawn_mock().await?;
    let client = RenderClient::new(&render_config(&state))?;

    match client.wait_for("broken").await {
        Err(RenderError::Failed { id, message }) => {
            assert_eq!(id, "broken");
            assert_eq!(message, "bad source");
        }
        other => panic!("Expected a failed render, got {:?}", other),
    }
    Ok(())
}

/// Test that polling stops once the window closes
#[tokio::test]
async fn test_waitFor_withRenderStillRunning_shouldTimeOut() -> Result<()> {
    let state = spawn_mock().await?;
    let client = RenderClient::new(&render_config(&state))?;

    let result = client.wait_for("slow").await;

    assert!(matches!(result, Err(RenderError::Timeout { secs: 1, .. })));
    Ok(())
}

/// Test the template workflow end to end, snapshot included
#[tokio::test]
async fn test_renderTemplate_shouldDownloadVideoAndSnapshot() -> Result<()> {
    let state = spawn_mock().await?;
    let temp_dir = common::create_temp_dir()?;
    let mut config = Config::default();
    config.render = render_config(&state);
    let controller = Controller::with_config(config)?;
    let run = RunContext::with_prefix("20250101_093000", temp_dir.path(), temp_dir.path().join("audio"));

    let mut modifications = Map::new();
    modifications.insert("Title".to_string(), json!("Hello"));
    let template = TemplateRender {
        template_id: "tpl-1".to_string(),
        modifications,
    };

    let files = controller.render_template(&template, &run).await?;

    assert_eq!(files, vec![
        temp_dir.path().join("20250101_093000_template_0_video.mp4"),
        temp_dir.path().join("20250101_093000_template_0_snapshot_snapshot.jpg"),
    ]);
    assert_eq!(std::fs::read(&files[1])?, b"jpeg");
    assert_eq!(
        state.submissions.lock().clone(),
        vec![json!({ "template_id": "tpl-1", "modifications": { "Title": "Hello" } })]
    );
    Ok(())
}
