use std::path::{Path, PathBuf};

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::server::AppState;

/// The application bundle served for every non-API path.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>, index: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index: index.into(),
        }
    }

    /// Reads the file behind a request path; directories resolve to the
    /// index document.
    pub async fn load(&self, request_path: &str) -> Option<(Vec<u8>, &'static str)> {
        let mut path = self.root.join(relative_path(request_path)?);
        if tokio::fs::metadata(&path).await.ok()?.is_dir() {
            path.push(&self.index);
        }
        let bytes = tokio::fs::read(&path).await.ok()?;
        Some((bytes, content_type(&path)))
    }
}

// Rejects any attempt to climb out of the root.
fn relative_path(request_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for segment in request_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') => return None,
            s => relative.push(s),
        }
    }
    Some(relative)
}

fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

pub async fn serve(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();
    // unmatched API paths never reach the bundle
    if path == "/api" || path.starts_with("/api/") {
        return StatusCode::NOT_FOUND.into_response();
    }
    match state.static_files.load(path).await {
        Some((bytes, content_type)) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}
