//! HTTP endpoints and the application router.
//!
//! Everything interactive goes over the WebSocket; HTTP only serves read-only
//! room lookups (for invite links) and a health probe.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::SessionError;
use crate::state::AppState;
use crate::types::{normalize_room_code, RoomSnapshot};
use crate::ws;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub msg: String,
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::RoomNotFound(_) | SessionError::PlayerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SessionError::GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::CONFLICT,
        };
        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router with all routes and middleware
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/health", get(health))
        .route("/api/rooms/{code}", get(get_room))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/health
pub async fn health() -> &'static str {
    "ok"
}

/// Current snapshot of a room.
///
/// GET /api/rooms/{code}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, SessionError> {
    let room_id = normalize_room_code(&code).ok_or(SessionError::RoomNotFound(code))?;
    let snapshot = state.snapshot(&room_id).await?;
    Ok(Json(snapshot))
}
