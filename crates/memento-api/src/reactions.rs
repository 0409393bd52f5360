use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;
use uuid::Uuid;

use memento_core::reactions::is_palette_symbol;
use memento_types::api::{Claims, ReactRequest, ReactionsResponse};
use memento_types::events::GatewayEvent;
use memento_types::models::NotificationKind;

use crate::error::ApiError;
use crate::notifications::notify;
use crate::{AppState, run_db};

/// Toggle the caller's reaction on a chat message and return the stored map.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    WithRejection(Path(message_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<ReactRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    if !is_palette_symbol(&req.symbol) {
        return Err(ApiError::BadRequest(format!("'{}' is not a reaction", req.symbol)));
    }

    let id = message_id.to_string();
    let message = run_db(&state, move |db| db.get_message(&id))
        .await?
        .ok_or(ApiError::NotFound("message"))?;
    if message.deleted {
        return Err(ApiError::Conflict("message was deleted".into()));
    }

    let id = message_id.to_string();
    let actor = claims.sub;
    let symbol = req.symbol.clone();
    let reactions = run_db(&state, move |db| db.react_to_message(&id, actor, &symbol))
        .await?
        .ok_or_else(|| ApiError::Conflict("message was deleted".into()))?;

    debug!("{} ({}) reacted {} on {}", claims.username, claims.sub, req.symbol, message_id);

    state.dispatcher.broadcast(GatewayEvent::ReactionsUpdate {
        message_id,
        reactions: reactions.clone(),
    });

    let added = reactions.reaction_of(actor) == Some(req.symbol.as_str());
    if added && message.author_id != actor {
        let text = format!("{} reacted {} to your message", claims.username, req.symbol);
        notify(&state, message.author_id, NotificationKind::Reaction, text, Some(message_id)).await;
    }

    Ok(Json(ReactionsResponse {
        message_id,
        reactions,
    }))
}
