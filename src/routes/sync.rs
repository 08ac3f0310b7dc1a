//! Sync API endpoint
//!
//! A single path dispatched on method and on whether a sync code is given:
//!
//! | Method | `id` | Operation |
//! |---|---|---|
//! | POST | absent | create |
//! | GET | present | read |
//! | PUT or POST | present | update |
//!
//! Anything else is an `invalid_request`.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::sync::{SyncId, SyncPayload, SyncRecord};

/// Create the sync router
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/sync",
        get(read_record)
            .post(create_or_update)
            .put(update_record)
            .options(preflight)
            .fallback(invalid_request),
    )
}

/// The sync code named by the query string.
///
/// The first `id` parameter wins and later ones are ignored. An empty
/// `id=` counts as no code. Undecodable bytes are replaced rather than
/// rejected, so any query string resolves to a code or to none.
fn query_id(query: Option<&str>) -> Option<String> {
    let first = query?
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key) == "id").then(|| decode_component(value))
        })
        .next()?;
    (!first.is_empty()).then_some(first)
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub success: bool,
    pub id: SyncId,
}

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub success: bool,
    pub data: SyncRecord,
}

/// Read the record for `id`
async fn read_record(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<RecordResponse>> {
    let id = query_id(query.as_deref()).ok_or(AppError::InvalidRequest)?;
    let data = state.sync().read(&id).await?;
    Ok(Json(RecordResponse {
        success: true,
        data,
    }))
}

/// Create a record, or update one when `id` is given
async fn create_or_update(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Response> {
    let payload = SyncPayload::from_slice(&body)?;

    match query_id(query.as_deref()) {
        Some(id) => {
            let data = state.sync().update(&id, payload).await?;
            Ok(Json(RecordResponse {
                success: true,
                data,
            })
            .into_response())
        }
        None => {
            let id = state.sync().create(payload).await?;
            Ok(Json(CreatedResponse { success: true, id }).into_response())
        }
    }
}

/// Update the record for `id`
async fn update_record(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<RecordResponse>> {
    let id = query_id(query.as_deref()).ok_or(AppError::InvalidRequest)?;
    let payload = SyncPayload::from_slice(&body)?;
    let data = state.sync().update(&id, payload).await?;
    Ok(Json(RecordResponse {
        success: true,
        data,
    }))
}

/// Bare OPTIONS without CORS preflight headers
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn invalid_request() -> AppError {
    AppError::InvalidRequest
}
