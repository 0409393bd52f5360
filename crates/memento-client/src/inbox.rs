use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use memento_core::optimistic::PendingUpdate;
use memento_types::events::GatewayEvent;
use memento_types::models::Notification;

use crate::SyncOutcome;
use crate::backend::PortalBackend;
use crate::error::ClientError;

/// My notifications, newest first.
pub struct Inbox<B> {
    backend: B,
    notifications: Vec<Notification>,
    error: Option<String>,
    cancel: CancellationToken,
}

impl<B: PortalBackend> Inbox<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            notifications: Vec::new(),
            error: None,
            cancel: CancellationToken::new(),
        }
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.notifications = self.backend.fetch_notifications().await?;
        Ok(())
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Cancelling the token unmounts the inbox; writes still in flight
    /// resolve to `SyncOutcome::Discarded`.
    pub fn unmount_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    pub async fn mark_read(&mut self, notification_id: Uuid) -> SyncOutcome {
        let Some(idx) = self.position(notification_id) else {
            return SyncOutcome::Missing;
        };
        if self.notifications[idx].read {
            return SyncOutcome::Confirmed;
        }

        let pending = PendingUpdate::begin(&self.notifications[idx], |n| Notification {
            read: true,
            ..n.clone()
        });
        self.notifications[idx] = pending.optimistic().clone();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Inbox unmounted, dropping mark-read result for {}", notification_id);
                return SyncOutcome::Discarded;
            }
            result = self.backend.mark_read(notification_id) => result,
        };
        match result {
            Ok(()) => SyncOutcome::Confirmed,
            Err(e) => {
                self.fail("mark as read", &e);
                self.notifications[idx] = pending.settle(Err(e));
                SyncOutcome::Reverted
            }
        }
    }

    pub async fn delete(&mut self, notification_id: Uuid) -> SyncOutcome {
        let snapshot = self.notifications.clone();
        let pending = PendingUpdate::begin(&snapshot, |list| {
            list.iter().filter(|n| n.id != notification_id).cloned().collect()
        });
        if pending.optimistic().len() == snapshot.len() {
            return SyncOutcome::Missing;
        }
        self.notifications = pending.optimistic().clone();

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Inbox unmounted, dropping delete result for {}", notification_id);
                return SyncOutcome::Discarded;
            }
            result = self.backend.delete_notification(notification_id) => result,
        };
        match result {
            Ok(()) => SyncOutcome::Confirmed,
            Err(e) => {
                self.fail("delete", &e);
                self.notifications = pending.settle(Err(e));
                SyncOutcome::Reverted
            }
        }
    }

    pub fn apply_event(&mut self, event: &GatewayEvent) {
        if let GatewayEvent::NotificationCreate { notification } = event {
            if self.position(notification.id).is_none() {
                self.notifications.insert(0, notification.clone());
            }
        }
    }

    fn fail(&mut self, what: &str, e: &ClientError) {
        warn!("Notification {} failed: {}", what, e);
        self.error = Some(format!("Couldn't {} notification: {}", what, e));
    }

    fn position(&self, notification_id: Uuid) -> Option<usize> {
        self.notifications.iter().position(|n| n.id == notification_id)
    }
}
