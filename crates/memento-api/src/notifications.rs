use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use memento_types::api::Claims;
use memento_types::events::GatewayEvent;
use memento_types::models::NotificationKind;

use crate::error::ApiError;
use crate::{AppState, run_db};

/// Store a notification for `recipient` and push it to them if online.
/// Failures are logged and swallowed: the action that triggered the
/// notification has already succeeded.
pub(crate) async fn notify(
    state: &AppState,
    recipient: Uuid,
    kind: NotificationKind,
    text: String,
    link_id: Option<Uuid>,
) {
    let id = Uuid::new_v4().to_string();
    let recipient_id = recipient.to_string();
    let stored = run_db(state, move |db| db.insert_notification(&id, &recipient_id, kind, &text, link_id)).await;

    match stored {
        Ok(notification) => {
            if !state.dispatcher.is_online(recipient).await {
                debug!("{} is offline, notification {} waits in the inbox", recipient, notification.id);
                return;
            }
            state
                .dispatcher
                .send_to_user(recipient, GatewayEvent::NotificationCreate { notification })
                .await;
        }
        Err(e) => warn!("Failed to notify {}: {}", recipient, e),
    }
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = run_db(&state, move |db| db.list_notifications(&claims.sub.to_string())).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    WithRejection(Path(notification_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let found = run_db(&state, move |db| {
        db.mark_notification_read(&notification_id.to_string(), &claims.sub.to_string())
    })
    .await?;

    if !found {
        return Err(ApiError::NotFound("notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = run_db(&state, move |db| db.mark_all_read(&claims.sub.to_string())).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    WithRejection(Path(notification_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let found = run_db(&state, move |db| {
        db.delete_notification(&notification_id.to_string(), &claims.sub.to_string())
    })
    .await?;

    if !found {
        return Err(ApiError::NotFound("notification"));
    }
    Ok(StatusCode::NO_CONTENT)
}
