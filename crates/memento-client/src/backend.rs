use std::future::Future;

use reqwest::{Client, Method};
use uuid::Uuid;

use memento_core::directory::SortConfig;
use memento_core::feed::{LikeState, UserAction, VoteAction};
use memento_core::reactions::ReactionMap;
use memento_types::api::{DirectoryQuery, ReactRequest, ReactionsResponse, SendMessageRequest, VoteRequest, VoteResponse};
use memento_types::models::{ChatMessage, DirectoryRecord, Moment, Notification};

use crate::error::ClientError;
use crate::session::{authorized, expect_success, read_json};

/// The remote half of every view. `HttpBackend` talks to a running server;
/// tests swap in an in-memory implementation.
pub trait PortalBackend: Send + Sync {
    fn fetch_messages(&self) -> impl Future<Output = Result<Vec<ChatMessage>, ClientError>> + Send;

    fn send_message(&self, body: &str) -> impl Future<Output = Result<ChatMessage, ClientError>> + Send;

    fn react(
        &self,
        message_id: Uuid,
        symbol: &str,
    ) -> impl Future<Output = Result<ReactionMap, ClientError>> + Send;

    fn fetch_moments(&self) -> impl Future<Output = Result<Vec<Moment>, ClientError>> + Send;

    fn vote(
        &self,
        moment_id: Uuid,
        action: VoteAction,
        user_action: UserAction,
    ) -> impl Future<Output = Result<LikeState, ClientError>> + Send;

    fn fetch_directory(&self) -> impl Future<Output = Result<Vec<DirectoryRecord>, ClientError>> + Send;

    fn fetch_notifications(&self) -> impl Future<Output = Result<Vec<Notification>, ClientError>> + Send;

    fn mark_read(&self, notification_id: Uuid) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn delete_notification(&self, notification_id: Uuid) -> impl Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpBackend {
    pub fn new(http: Client, base_url: String, token: String) -> Self {
        Self { http, base_url, token }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        authorized(&self.http, method, format!("{}{}", self.base_url, path), &self.token)
    }

    /// Directory rows as the server sorts them. The views sort locally, so
    /// this is only needed for one-off exports.
    pub async fn fetch_directory_sorted(&self, config: SortConfig) -> Result<Vec<DirectoryRecord>, ClientError> {
        let query = DirectoryQuery {
            sort: config.key,
            dir: Some(config.direction),
        };
        let req = self.request(Method::GET, "/directory").query(&query);
        read_json(req.send().await?).await
    }
}

impl PortalBackend for HttpBackend {
    async fn fetch_messages(&self) -> Result<Vec<ChatMessage>, ClientError> {
        let resp = self.request(Method::GET, "/chat/messages").send().await?;
        read_json(resp).await
    }

    async fn send_message(&self, body: &str) -> Result<ChatMessage, ClientError> {
        let resp = self
            .request(Method::POST, "/chat/messages")
            .json(&SendMessageRequest { body: body.to_string() })
            .send()
            .await?;
        read_json(resp).await
    }

    async fn react(&self, message_id: Uuid, symbol: &str) -> Result<ReactionMap, ClientError> {
        let resp = self
            .request(Method::POST, &format!("/chat/messages/{}/reactions", message_id))
            .json(&ReactRequest {
                symbol: symbol.to_string(),
            })
            .send()
            .await?;
        let body: ReactionsResponse = read_json(resp).await?;
        Ok(body.reactions)
    }

    async fn fetch_moments(&self) -> Result<Vec<Moment>, ClientError> {
        let resp = self.request(Method::GET, "/moments").send().await?;
        read_json(resp).await
    }

    async fn vote(&self, moment_id: Uuid, action: VoteAction, user_action: UserAction) -> Result<LikeState, ClientError> {
        let resp = self
            .request(Method::POST, &format!("/moments/{}/vote", moment_id))
            .json(&VoteRequest { action, user_action })
            .send()
            .await?;
        let body: VoteResponse = read_json(resp).await?;
        Ok(body.state)
    }

    async fn fetch_directory(&self) -> Result<Vec<DirectoryRecord>, ClientError> {
        let resp = self.request(Method::GET, "/directory").send().await?;
        read_json(resp).await
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        let resp = self.request(Method::GET, "/notifications").send().await?;
        read_json(resp).await
    }

    async fn mark_read(&self, notification_id: Uuid) -> Result<(), ClientError> {
        let resp = self
            .request(Method::POST, &format!("/notifications/{}/read", notification_id))
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }

    async fn delete_notification(&self, notification_id: Uuid) -> Result<(), ClientError> {
        let resp = self
            .request(Method::DELETE, &format!("/notifications/{}", notification_id))
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }
}
