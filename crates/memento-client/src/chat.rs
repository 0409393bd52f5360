use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use memento_core::optimistic::PendingUpdate;
use memento_core::reactions::apply_reaction;
use memento_types::events::GatewayEvent;
use memento_types::models::ChatMessage;

use crate::SyncOutcome;
use crate::backend::PortalBackend;
use crate::error::ClientError;

/// The public chat room as one signed-in user sees it. Messages are held
/// oldest first.
pub struct ChatView<B> {
    backend: B,
    me: Uuid,
    messages: Vec<ChatMessage>,
    error: Option<String>,
    cancel: CancellationToken,
}

impl<B: PortalBackend> ChatView<B> {
    pub fn new(backend: B, me: Uuid) -> Self {
        Self {
            backend,
            me,
            messages: Vec::new(),
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        let mut messages = self.backend.fetch_messages().await?;
        // The server pages newest first.
        messages.reverse();
        self.messages = messages;
        Ok(())
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Token that unmounts this view when cancelled. In-flight writes
    /// resolve to `SyncOutcome::Discarded` and leave the view untouched.
    pub fn unmount_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub async fn send(&mut self, body: &str) -> Result<(), ClientError> {
        let message = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(()),
            sent = self.backend.send_message(body) => sent?,
        };
        self.upsert(message);
        Ok(())
    }

    /// Toggle my reaction on a message: render the local transition right
    /// away, then adopt whatever map the server stored.
    pub async fn react(&mut self, message_id: Uuid, symbol: &str) -> SyncOutcome {
        let Some(idx) = self.position(message_id) else {
            return SyncOutcome::Missing;
        };

        let me = self.me;
        let pending = PendingUpdate::begin(&self.messages[idx].reactions, |s| apply_reaction(s, me, symbol));
        self.messages[idx].reactions = pending.optimistic().clone();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Chat view unmounted, dropping reaction result for {}", message_id);
                return SyncOutcome::Discarded;
            }
            result = self.backend.react(message_id, symbol) => result,
        };

        let outcome = match &result {
            Ok(_) => SyncOutcome::Confirmed,
            Err(e) => {
                warn!("Reaction on {} failed: {}", message_id, e);
                self.error = Some(format!("Couldn't save your reaction: {}", e));
                SyncOutcome::Reverted
            }
        };
        self.messages[idx].reactions = pending.settle(result);
        outcome
    }

    /// Apply a pushed record. Pushes replace what the view holds.
    pub fn apply_event(&mut self, event: &GatewayEvent) {
        match event {
            GatewayEvent::MessageCreate { message } | GatewayEvent::MessageUpdate { message } => {
                self.upsert(message.clone());
            }
            GatewayEvent::ReactionsUpdate { message_id, reactions } => {
                if let Some(idx) = self.position(*message_id) {
                    self.messages[idx].reactions = reactions.clone();
                }
            }
            _ => {}
        }
    }

    fn upsert(&mut self, message: ChatMessage) {
        match self.position(message.id) {
            Some(idx) => self.messages[idx] = message,
            None => self.messages.push(message),
        }
    }

    fn position(&self, message_id: Uuid) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }
}
