use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;
use uuid::Uuid;

use memento_types::api::{Claims, UpdateProfileRequest};
use memento_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, run_db};

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let record = run_db(&state, move |db| db.get_profile(&claims.sub.to_string()))
        .await?
        .ok_or(ApiError::NotFound("profile"))?;
    Ok(Json(record))
}

pub async fn get_profile(
    State(state): State<AppState>,
    WithRejection(Path(user_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let record = run_db(&state, move |db| db.get_profile(&user_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("profile"))?;
    Ok(Json(record))
}

/// Replace the caller's directory record wholesale.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();
    let record = run_db(&state, move |db| {
        if !db.update_profile(&user_id, &req.identity, &req.location, &req.contact)? {
            return Ok(None);
        }
        db.get_profile(&user_id)
    })
    .await?
    .ok_or(ApiError::NotFound("profile"))?;

    debug!("{} ({}) updated profile", claims.username, claims.sub);
    state.dispatcher.broadcast(GatewayEvent::ProfileUpdate {
        record: record.clone(),
    });
    Ok(Json(record))
}
