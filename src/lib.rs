//! Koha Sync Server
//!
//! Lets independent devices converge on one shared gift/expense ledger
//! addressed by a five-symbol code. Records live in a pluggable key-value
//! store and are reconciled with a union-by-item-id merge on every update.
//!
//! # Modules
//!
//! - `sync`: codes, record types, merge rules and the sync service
//! - `storage`: store trait with memory, SQLite and S3 backends
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod storage;
pub mod sync;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::sync::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
