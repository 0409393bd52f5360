use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use memento_types::events::{GatewayCommand, GatewayEvent};

use crate::error::ClientError;
use crate::session::Session;

const READY_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_BUFFER: usize = 256;

/// Live connection to the server's event gateway.
///
/// Events arrive on `events`; feed them to the views' `apply_event`.
/// Dropping the handle or calling `close` stops the background task.
pub struct GatewayClient {
    pub user_id: Uuid,
    pub username: String,
    pub events: mpsc::Receiver<GatewayEvent>,
    commands: mpsc::Sender<GatewayCommand>,
    cancel: CancellationToken,
}

impl GatewayClient {
    pub async fn connect(session: &Session) -> Result<Self, ClientError> {
        let signed_in = session.signed_in().ok_or(ClientError::NotSignedIn)?;
        let url = session.gateway_url();

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Gateway(format!("connect to {} failed: {}", url, e)))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        let identify = GatewayCommand::Identify {
            token: signed_in.token.clone(),
        };
        ws_tx
            .send(Message::Text(encode(&identify)?.into()))
            .await
            .map_err(|e| ClientError::Gateway(e.to_string()))?;

        let (user_id, username) = tokio::time::timeout(READY_TIMEOUT, async {
            while let Some(frame) = ws_rx.next().await {
                let frame = frame.map_err(|e| ClientError::Gateway(e.to_string()))?;
                if let Message::Text(text) = frame {
                    if let Ok(GatewayEvent::Ready { user_id, username }) = serde_json::from_str(&text) {
                        return Ok((user_id, username));
                    }
                }
            }
            Err(ClientError::Gateway("closed before Ready".into()))
        })
        .await
        .map_err(|_| ClientError::Gateway("timed out waiting for Ready".into()))??;

        info!("Gateway ready for {} ({})", username, user_id);

        let (event_tx, events) = mpsc::channel(EVENT_BUFFER);
        let (commands, mut command_rx) = mpsc::channel::<GatewayCommand>(16);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    cmd = command_rx.recv() => {
                        let Some(cmd) = cmd else { break };
                        let Ok(text) = serde_json::to_string(&cmd) else { continue };
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    frame = ws_rx.next() => {
                        match frame {
                            Some(Ok(Message::Text(text))) => match serde_json::from_str::<GatewayEvent>(&text) {
                                Ok(event) => {
                                    if event_tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => debug!("Ignoring unknown gateway frame: {}", e),
                            },
                            Some(Ok(Message::Ping(payload))) => {
                                if ws_tx.send(Message::Pong(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("Gateway read error: {}", e);
                                break;
                            }
                        }
                    }
                }
            }
            debug!("Gateway task finished");
        });

        Ok(Self {
            user_id,
            username,
            events,
            commands,
            cancel,
        })
    }

    pub async fn start_typing(&self) -> Result<(), ClientError> {
        self.commands
            .send(GatewayCommand::StartTyping)
            .await
            .map_err(|_| ClientError::Gateway("connection closed".into()))
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn encode(cmd: &GatewayCommand) -> Result<String, ClientError> {
    serde_json::to_string(cmd).map_err(|e| ClientError::Gateway(e.to_string()))
}
