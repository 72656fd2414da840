use std::{net::AddrParseError, sync::Arc};

use axum::{middleware, routing::any, Router};
use recordbook_core::StoreError;
use thiserror::Error;

use crate::{api, auth, config::Config, static_files::{self, StaticFiles}, storage::FileStorage, trace};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
    #[error("invalid listen address: {0}")]
    Address(#[from] AddrParseError),
    #[error("server error: {0}")]
    Serve(String),
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<FileStorage>,
    pub static_files: Arc<StaticFiles>,
}

impl AppState {
    pub fn new(storage: FileStorage, static_files: StaticFiles) -> Self {
        Self {
            storage: Arc::new(storage),
            static_files: Arc::new(static_files),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/login", any(auth::login))
        .route("/api/:collection", any(api::collection))
        .route("/api/:collection/", any(api::collection))
        .route("/api/:collection/:key", any(api::record))
        .fallback(static_files::serve)
        .layer(middleware::from_fn(trace::trace_requests))
        .with_state(state)
}

pub async fn run(config: Config) -> Result<(), ServerError> {
    let storage = FileStorage::open(&config.storage.data_dir, config.keys.clone()).await?;
    let static_files = StaticFiles::new(&config.storage.public_dir, &config.storage.index);
    let app = router(AppState::new(storage, static_files));

    let addr = config.listen_addr()?;
    let server = axum::Server::try_bind(&addr)
        .map_err(|e| ServerError::Serve(e.to_string()))?
        .serve(app.into_make_service());

    tracing::info!("Server running on http://{}", server.local_addr());

    server.await.map_err(|e| ServerError::Serve(e.to_string()))
}
