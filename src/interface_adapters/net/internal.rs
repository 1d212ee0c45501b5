use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_session_serializer;
use crate::interface_adapters::protocol::ZoneConfigDto;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{RemoveSessionError, SessionError};

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

#[derive(Debug, serde::Deserialize)]
pub struct SessionInitRequest {
    // Session id provided by the game manager.
    session_id: String,
    // Zone configuration authored in the instructor editor.
    zone: ZoneConfigDto,
}

#[derive(Debug, serde::Serialize)]
struct SessionInitResponse {
    // The session id that was created.
    session_id: String,
}

pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionInitRequest>,
) -> impl IntoResponse {
    // Ensure we have a session id to create.
    let session_id = payload.session_id.trim().to_string();
    if session_id.is_empty() {
        // Return a JSON error even for manager-only routes to keep
        // responses consistent.
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "session_id is required".to_string(),
            }),
        )
            .into_response();
    }

    // Created sessions are not pinned and can be removed by the manager.
    match state
        .session_registry
        .create_session(session_id.clone(), payload.zone.into(), false)
        .await
    {
        Ok(session) => {
            // Create the serializer so clients can subscribe immediately.
            spawn_session_serializer(&session);
            (StatusCode::CREATED, Json(SessionInitResponse { session_id })).into_response()
        }
        Err(SessionError::AlreadyExists) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "session already exists".to_string(),
            }),
        )
            .into_response(),
        Err(SessionError::InvalidZone(e)) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("invalid zone configuration: {e}"),
            }),
        )
            .into_response(),
    }
}

pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.session_registry.remove_session(&session_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(RemoveSessionError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "session not found".to_string(),
            }),
        )
            .into_response(),
        Err(RemoveSessionError::Pinned) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: "session is pinned".to_string(),
            }),
        )
            .into_response(),
    }
}
