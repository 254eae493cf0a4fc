use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{self, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use log::{debug, info, warn};
use tokio::net::TcpListener;

/// Serves a directory over HTTP so the render service can fetch local
/// images and narration clips.
pub struct StaticServer {
    listener: TcpListener,
    router: Router,
    addr: SocketAddr,
    root: PathBuf,
}

#[derive(Clone)]
struct ServerState {
    root: Arc<PathBuf>,
}

impl StaticServer {
    /// Bind the listening socket. Port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind static server to {}", addr))?;
        let addr = listener.local_addr().context("Failed to read bound address")?;

        Ok(Self {
            listener,
            router: Self::router(root.clone()),
            addr,
            root,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Routes for serving files under `root`
    pub fn router(root: PathBuf) -> Router {
        let state = ServerState { root: Arc::new(root) };
        Router::new()
            .route("/", get(serve_index))
            .route("/*path", get(serve_file))
            .with_state(state)
    }

    /// Serve until the process stops
    pub async fn serve(self) -> Result<()> {
        info!("Serving {:?} at http://{}", self.root, self.addr);
        axum::serve(self.listener, self.router.into_make_service())
            .await
            .context("Static server error")
    }
}

/// Map a request path to a file under `root`.
///
/// Only plain path components are accepted, so `..` and absolute paths
/// never escape the root.
pub fn resolve_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

/// Content type for a served file, by extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "json" => "application/json",
        "srt" => "application/x-subrip",
        "txt" => "text/plain; charset=utf-8",
        "html" | "htm" => "text/html; charset=utf-8",
        _ => "application/octet-stream",
    }
}

async fn serve_index(State(state): State<ServerState>) -> Response {
    send_file(&state, "index.html").await
}

async fn serve_file(State(state): State<ServerState>, extract::Path(path): extract::Path<String>) -> Response {
    send_file(&state, &path).await
}

async fn send_file(state: &ServerState, request_path: &str) -> Response {
    let Some(mut path) = resolve_path(&state.root, request_path) else {
        warn!("Rejected request path: {}", request_path);
        return StatusCode::NOT_FOUND.into_response();
    };

    if path.is_dir() {
        path.push("index.html");
    }

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("GET /{} ({} bytes)", request_path, bytes.len());
            ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response()
        }
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
