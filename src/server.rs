use std::path::Path as FsPath;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::services::ServeDir;
use tracing::info;

use crate::{discovery, jobs::Jobs, probe::Prober, report::ReportStore, types::Credentials};

/// Shared handles for the admin API. Routing and serialization live here;
/// job semantics live in [`Jobs`], probe semantics in [`Prober`].
#[derive(Clone)]
pub struct AppState {
    pub jobs: Jobs,
    pub prober: Arc<Prober>,
    pub store: Arc<ReportStore>,
}

#[derive(Debug, Deserialize)]
pub struct IdentifyStart {
    pub ip: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
struct DiscoverEntry {
    ip: String,
    model: String,
    rtsp_url: Option<String>,
    /// URL under `/snaps/`, not a filesystem path.
    snapshot: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let snaps_dir = state.prober.config().snaps_dir.clone();

    let api = Router::new()
        .route("/identify_start", post(identify_start))
        .route("/job_status/{job_id}", get(job_status))
        .route("/discover", get(api_discover))
        .route("/report", get(api_report))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .nest_service("/snaps", ServeDir::new(snaps_dir))
}

pub async fn spawn_server(bind: &str, state: AppState) -> Result<()> {
    let app = router(state);
    info!(bind, "admin api listening");
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn identify_start(
    State(state): State<AppState>,
    Json(req): Json<IdentifyStart>,
) -> impl IntoResponse {
    let creds = match (nonempty(req.user), nonempty(req.password)) {
        (Some(user), Some(password)) => Some(Credentials { user, password }),
        _ => None,
    };
    let job_id = state
        .jobs
        .start(state.prober.clone(), state.store.clone(), req.ip, creds);
    (StatusCode::OK, Json(json!({ "job_id": job_id })))
}

async fn job_status(State(state): State<AppState>, Path(job_id): Path<String>) -> impl IntoResponse {
    match state.jobs.poll(&job_id) {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown job" }))).into_response(),
    }
}

async fn api_discover(State(state): State<AppState>) -> impl IntoResponse {
    match discovery::discover(&state.prober, discovery::DEFAULT_DISCOVERY_TIMEOUT).await {
        Ok(cams) => {
            let payload: Vec<DiscoverEntry> = cams
                .into_iter()
                .map(|c| DiscoverEntry {
                    ip: c.ip,
                    model: c.model.unwrap_or_else(|| "Unknown".to_string()),
                    rtsp_url: c.rtsp_url,
                    snapshot: c.snapshot_path.as_deref().map(snap_url),
                })
                .collect();
            info!(cameras = payload.len(), "discover returning");
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("{e:#}") })),
        )
            .into_response(),
    }
}

async fn api_report(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.load().await)
}

fn nonempty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

fn snap_url(path: &str) -> String {
    let name = FsPath::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("/snaps/{name}")
}
