use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use memento_types::api::{ErrorBody, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::backend::HttpBackend;
use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

/// The one auth/session object of a running client. Built once at startup
/// and handed to whatever needs it; signing out resets it to a fresh,
/// signed-out session rather than clearing fields one by one.
#[derive(Debug, Clone)]
pub struct Session {
    base_url: String,
    http: Client,
    signed_in: Option<SignedIn>,
}

impl Session {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
            signed_in: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn signed_in(&self) -> Option<&SignedIn> {
        self.signed_in.as_ref()
    }

    pub async fn register(&mut self, username: &str, password: &str) -> Result<&SignedIn, ClientError> {
        let req = RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .json(&req)
            .send()
            .await?;
        let registered: RegisterResponse = read_json(resp).await?;

        info!("Registered as {} ({})", username, registered.user_id);
        Ok(self.signed_in.insert(SignedIn {
            user_id: registered.user_id,
            username: username.to_string(),
            token: registered.token,
        }))
    }

    pub async fn sign_in(&mut self, username: &str, password: &str) -> Result<&SignedIn, ClientError> {
        let req = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&req)
            .send()
            .await?;
        let login: LoginResponse = read_json(resp).await?;

        info!("Signed in as {} ({})", login.username, login.user_id);
        Ok(self.signed_in.insert(SignedIn {
            user_id: login.user_id,
            username: login.username,
            token: login.token,
        }))
    }

    pub fn sign_out(&mut self) {
        if let Some(who) = &self.signed_in {
            info!("Signing out {}", who.username);
        }
        *self = Self::new(self.base_url.clone());
    }

    /// Backend handle carrying this session's credentials.
    pub fn backend(&self) -> Result<HttpBackend, ClientError> {
        let signed_in = self.signed_in.as_ref().ok_or(ClientError::NotSignedIn)?;
        Ok(HttpBackend::new(self.http.clone(), self.base_url.clone(), signed_in.token.clone()))
    }

    /// `ws://` URL of the gateway for this server.
    pub fn gateway_url(&self) -> String {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .map(|r| format!("wss://{}", r))
            .or_else(|| self.base_url.strip_prefix("http://").map(|r| format!("ws://{}", r)))
            .unwrap_or_else(|| self.base_url.clone());
        format!("{}/gateway", rest)
    }
}

pub(crate) fn authorized(http: &Client, method: Method, url: String, token: &str) -> RequestBuilder {
    http.request(method, url).bearer_auth(token)
}

pub(crate) async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let resp = expect_success(resp).await?;
    Ok(resp.json::<T>().await?)
}

pub(crate) async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string());
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
