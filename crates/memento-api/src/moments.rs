use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use memento_types::api::{Claims, CreateCommentRequest, CreateMomentRequest, VoteRequest, VoteResponse};
use memento_types::events::GatewayEvent;
use memento_types::models::{Moment, NotificationKind};

use crate::error::ApiError;
use crate::notifications::notify;
use crate::{AppState, run_db, validate_body};

pub const MAX_MOMENT_CHARS: usize = 5000;
pub const MAX_COMMENT_CHARS: usize = 1000;

const FEED_PAGE: u32 = 100;

pub async fn list_moments(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let moments = run_db(&state, |db| db.list_moments(FEED_PAGE)).await?;
    Ok(Json(moments))
}

pub async fn create_moment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateMomentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validate_body(&req.body, MAX_MOMENT_CHARS)?;
    let id = Uuid::new_v4().to_string();
    let author_id = claims.sub.to_string();

    let moment = run_db(&state, move |db| db.insert_moment(&id, &author_id, &body)).await?;
    state.dispatcher.broadcast(GatewayEvent::MomentUpsert {
        moment: moment.clone(),
    });

    Ok((StatusCode::CREATED, Json(moment)))
}

/// Like/dislike. The caller sends the vote it holds in memory for this
/// moment; the counters are updated in one transaction.
pub async fn vote(
    State(state): State<AppState>,
    WithRejection(Path(moment_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(_claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<VoteRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = moment_id.to_string();
    let (vote, moment) = run_db(&state, move |db| {
        let Some(vote) = db.vote_on_moment(&id, req.user_action, req.action)? else {
            return Ok(None);
        };
        Ok(db.get_moment(&id)?.map(|moment| (vote, moment)))
    })
    .await?
    .ok_or(ApiError::NotFound("moment"))?;

    state.dispatcher.broadcast(GatewayEvent::MomentUpsert { moment });

    Ok(Json(VoteResponse {
        moment_id,
        state: vote,
    }))
}

pub async fn list_comments(
    State(state): State<AppState>,
    WithRejection(Path(moment_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let id = moment_id.to_string();
    let comments = run_db(&state, move |db| {
        if db.get_moment(&id)?.is_none() {
            return Ok(None);
        }
        db.list_comments(&id).map(Some)
    })
    .await?
    .ok_or(ApiError::NotFound("moment"))?;

    Ok(Json(comments))
}

pub async fn add_comment(
    State(state): State<AppState>,
    WithRejection(Path(moment_id), _): WithRejection<Path<Uuid>, ApiError>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): WithRejection<Json<CreateCommentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validate_body(&req.body, MAX_COMMENT_CHARS)?;
    let id = Uuid::new_v4().to_string();
    let mid = moment_id.to_string();
    let author_id = claims.sub.to_string();

    let (comment, moment): (_, Moment) = run_db(&state, move |db| {
        let Some(comment) = db.add_comment(&id, &mid, &author_id, &body)? else {
            return Ok(None);
        };
        Ok(db.get_moment(&mid)?.map(|moment| (comment, moment)))
    })
    .await?
    .ok_or(ApiError::NotFound("moment"))?;

    if moment.author_id != claims.sub {
        let text = format!("{} commented on your moment", comment.author_name);
        notify(&state, moment.author_id, NotificationKind::Comment, text, Some(moment_id)).await;
    }

    state.dispatcher.broadcast(GatewayEvent::MomentUpsert { moment });

    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn vote_flow_updates_counters() {
        let app = TestApp::new();
        let ada = app.register("ada").await;
        let bob = app.register("bob").await;

        let (status, moment) = app
            .call(Method::POST, "/moments", Some(&ada.token), Some(json!({ "body": "convocation!" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/moments/{}/vote", moment["id"].as_str().unwrap());

        let (status, body) = app
            .call(Method::POST, &uri, Some(&bob.token), Some(json!({ "action": "like", "user_action": "none" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], json!({ "like_count": 1, "dislike_count": 0, "user_action": "liked" }));

        let (_, body) = app
            .call(Method::POST, &uri, Some(&bob.token), Some(json!({ "action": "dislike", "user_action": "liked" })))
            .await;
        assert_eq!(body["state"]["like_count"], 0);
        assert_eq!(body["state"]["dislike_count"], 1);

        let (_, listed) = app.call(Method::GET, "/moments", Some(&ada.token), None).await;
        assert_eq!(listed[0]["dislike_count"], 1);

        let missing = format!("/moments/{}/vote", uuid::Uuid::new_v4());
        let (status, _) = app
            .call(Method::POST, &missing, Some(&bob.token), Some(json!({ "action": "like" })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comments_notify_the_author() {
        let app = TestApp::new();
        let ada = app.register("ada").await;
        let bob = app.register("bob").await;

        let (_, moment) = app
            .call(Method::POST, "/moments", Some(&ada.token), Some(json!({ "body": "lab photo" })))
            .await;
        let uri = format!("/moments/{}/comments", moment["id"].as_str().unwrap());

        let (status, comment) = app.call(Method::POST, &uri, Some(&bob.token), Some(json!({ "body": "great" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["author_name"], "bob");
        app.call(Method::POST, &uri, Some(&ada.token), Some(json!({ "body": "thanks" }))).await;

        let (_, comments) = app.call(Method::GET, &uri, Some(&bob.token), None).await;
        assert_eq!(comments.as_array().unwrap().len(), 2);

        let (_, inbox) = app.call(Method::GET, "/notifications", Some(&ada.token), None).await;
        assert_eq!(inbox.as_array().unwrap().len(), 1);
        assert_eq!(inbox[0]["text"], "bob commented on your moment");

        let missing = format!("/moments/{}/comments", uuid::Uuid::new_v4());
        let (status, _) = app.call(Method::GET, &missing, Some(&bob.token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
