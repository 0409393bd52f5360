use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use memento_types::api::{Claims, EditMessageRequest, SendMessageRequest};
use memento_types::events::GatewayEvent;
use memento_types::models::ChatMessage;

use crate::error::ApiError;
use crate::{AppState, run_db, validate_body};

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor-based pagination: the `created_at` of the oldest message from
    /// the previous page.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    50
}

/// Everyone signed in shares the one public chat room.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validate_body(&req.body, MAX_MESSAGE_CHARS)?;
    let id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();

    let message = run_db(&state, move |db| db.insert_message(&id, &author_id, &body)).await?;

    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<MessageQuery>, ApiError>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, 200);
    let before = query.before;

    let messages = run_db(&state, move |db| db.get_messages(limit, before.as_deref())).await?;
    Ok(Json(messages))
}

pub async fn edit_message(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<EditMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validate_body(&req.body, MAX_MESSAGE_CHARS)?;
    authorize_author(&state, message_id, &claims).await?;

    let id = message_id.to_string();
    let author_id = claims.sub.to_string();
    let message = run_db(&state, move |db| db.edit_message(&id, &author_id, &body))
        .await?
        .ok_or_else(|| ApiError::Conflict("message was deleted".into()))?;

    state.dispatcher.broadcast(GatewayEvent::MessageUpdate {
        message: message.clone(),
    });

    Ok(Json(message))
}

/// Soft delete. The message stays in the timeline as a tombstone.
pub async fn delete_message(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    authorize_author(&state, message_id, &claims).await?;

    let id = message_id.to_string();
    let author_id = claims.sub.to_string();
    let message = run_db(&state, move |db| db.soft_delete_message(&id, &author_id))
        .await?
        .ok_or_else(|| ApiError::Conflict("message was already deleted".into()))?;

    state.dispatcher.broadcast(GatewayEvent::MessageUpdate {
        message: message.clone(),
    });

    Ok(Json(message))
}

async fn authorize_author(state: &AppState, message_id: Uuid, claims: &Claims) -> Result<ChatMessage, ApiError> {
    let id = message_id.to_string();
    let message = run_db(state, move |db| db.get_message(&id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;

    if message.author_id != claims.sub {
        return Err(ApiError::Forbidden);
    }
    Ok(message)
}
