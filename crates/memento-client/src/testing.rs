use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use memento_core::feed::{LikeState, UserAction, VoteAction, apply_like_dislike};
use memento_core::reactions::{ReactionMap, apply_reaction};
use memento_types::models::{ChatMessage, DirectoryRecord, Moment, Notification, NotificationKind};

use crate::backend::PortalBackend;
use crate::error::ClientError;

/// In-memory server for view tests. Writes apply the same transitions the
/// real server does, can be made to fail, or held until released.
pub struct FakeBackend {
    me: Uuid,
    messages: Mutex<Vec<ChatMessage>>,
    moments: Mutex<Vec<Moment>>,
    directory: Mutex<Vec<DirectoryRecord>>,
    notifications: Mutex<Vec<Notification>>,
    failing: AtomicBool,
    holding: AtomicBool,
    release: Notify,
}

impl FakeBackend {
    pub fn new(me: Uuid) -> Self {
        Self {
            me,
            messages: Mutex::new(Vec::new()),
            moments: Mutex::new(Vec::new()),
            directory: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            holding: AtomicBool::new(false),
            release: Notify::new(),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Park every write until the test releases it (or forever).
    pub fn hold_writes(&self, holding: bool) {
        self.holding.store(holding, Ordering::SeqCst);
        if !holding {
            self.release.notify_waiters();
        }
    }

    pub fn seed_messages(&self, messages: Vec<ChatMessage>) {
        *self.messages.lock().unwrap() = messages;
    }

    pub fn seed_moments(&self, moments: Vec<Moment>) {
        *self.moments.lock().unwrap() = moments;
    }

    pub fn seed_directory(&self, records: Vec<DirectoryRecord>) {
        *self.directory.lock().unwrap() = records;
    }

    pub fn seed_notifications(&self, notifications: Vec<Notification>) {
        *self.notifications.lock().unwrap() = notifications;
    }

    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    async fn write_gate(&self) -> Result<(), ClientError> {
        if self.holding.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::Status {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

impl PortalBackend for FakeBackend {
    async fn fetch_messages(&self) -> Result<Vec<ChatMessage>, ClientError> {
        let mut messages = self.messages.lock().unwrap().clone();
        messages.reverse();
        Ok(messages)
    }

    async fn send_message(&self, body: &str) -> Result<ChatMessage, ClientError> {
        self.write_gate().await?;
        let msg = message(self.me, body);
        self.messages.lock().unwrap().push(msg.clone());
        Ok(msg)
    }

    async fn react(&self, message_id: Uuid, symbol: &str) -> Result<ReactionMap, ClientError> {
        self.write_gate().await?;
        let mut messages = self.messages.lock().unwrap();
        let msg = messages.iter_mut().find(|m| m.id == message_id).ok_or(ClientError::Status {
            status: 404,
            message: "message not found".into(),
        })?;
        msg.reactions = apply_reaction(&msg.reactions, self.me, symbol);
        Ok(msg.reactions.clone())
    }

    async fn fetch_moments(&self) -> Result<Vec<Moment>, ClientError> {
        Ok(self.moments.lock().unwrap().clone())
    }

    async fn vote(&self, moment_id: Uuid, action: VoteAction, user_action: UserAction) -> Result<LikeState, ClientError> {
        self.write_gate().await?;
        let mut moments = self.moments.lock().unwrap();
        let moment = moments.iter_mut().find(|m| m.id == moment_id).ok_or(ClientError::Status {
            status: 404,
            message: "moment not found".into(),
        })?;
        let current = LikeState {
            user_action,
            ..moment.like_state()
        };
        let next = apply_like_dislike(current, action);
        moment.like_count = next.like_count;
        moment.dislike_count = next.dislike_count;
        Ok(next)
    }

    async fn fetch_directory(&self) -> Result<Vec<DirectoryRecord>, ClientError> {
        Ok(self.directory.lock().unwrap().clone())
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>, ClientError> {
        Ok(self.notifications.lock().unwrap().clone())
    }

    async fn mark_read(&self, notification_id: Uuid) -> Result<(), ClientError> {
        self.write_gate().await?;
        if let Some(n) = self
            .notifications
            .lock()
            .unwrap()
            .iter_mut()
            .find(|n| n.id == notification_id)
        {
            n.read = true;
        }
        Ok(())
    }

    async fn delete_notification(&self, notification_id: Uuid) -> Result<(), ClientError> {
        self.write_gate().await?;
        self.notifications.lock().unwrap().retain(|n| n.id != notification_id);
        Ok(())
    }
}

pub fn message(author_id: Uuid, body: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        author_id,
        author_name: "someone".into(),
        body: body.into(),
        created_at: Utc::now(),
        deleted: false,
        edited: false,
        reactions: ReactionMap::new(),
    }
}

pub fn moment(author_id: Uuid, body: &str, likes: i64, dislikes: i64) -> Moment {
    Moment {
        id: Uuid::new_v4(),
        author_id,
        author_name: "someone".into(),
        body: body.into(),
        created_at: Utc::now(),
        like_count: likes,
        dislike_count: dislikes,
        comment_count: 0,
    }
}

pub fn notification(text: &str, read: bool) -> Notification {
    Notification {
        id: Uuid::new_v4(),
        kind: NotificationKind::Comment,
        text: text.into(),
        link_id: None,
        read,
        created_at: Utc::now(),
    }
}
