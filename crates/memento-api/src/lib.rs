pub mod auth;
pub mod directory;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod moments;
pub mod notifications;
pub mod profile;
pub mod reactions;

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tracing::error;

use memento_db::Database;
use memento_gateway::dispatcher::Dispatcher;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
}

/// Every REST route. The gateway upgrade is mounted separately by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let protected_routes = Router::new()
        .route("/profile/me", get(profile::get_me).put(profile::update_me))
        .route("/profiles/{user_id}", get(profile::get_profile))
        .route("/directory", get(directory::list_directory))
        .route("/chat/messages", get(messages::get_messages).post(messages::send_message))
        .route(
            "/chat/messages/{message_id}",
            patch(messages::edit_message).delete(messages::delete_message),
        )
        .route("/chat/messages/{message_id}/reactions", post(reactions::toggle_reaction))
        .route("/moments", get(moments::list_moments).post(moments::create_moment))
        .route("/moments/{moment_id}/vote", post(moments::vote))
        .route(
            "/moments/{moment_id}/comments",
            get(moments::list_comments).post(moments::add_comment),
        )
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(notifications::mark_read))
        .route("/notifications/{notification_id}", delete(notifications::delete_notification))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Run a blocking DB call off the async runtime.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("database worker failed"))
        })?
        .map_err(ApiError::from)
}

/// Trimmed, non-empty, bounded user text.
pub(crate) fn validate_body(raw: &str, max_chars: usize) -> Result<String, ApiError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(ApiError::BadRequest("body must not be empty".into()));
    }
    if body.chars().count() > max_chars {
        return Err(ApiError::BadRequest(format!("body exceeds {} characters", max_chars)));
    }
    Ok(body.to_string())
}
