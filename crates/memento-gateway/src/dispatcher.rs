use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use memento_types::events::GatewayEvent;

const BROADCAST_CAPACITY: usize = 1024;

/// Fans gateway events out to connected clients and tracks who is online.
///
/// A user may hold several sessions at once (phone and laptop, two tabs).
/// They stay online until the last one closes, and targeted events go to
/// every session.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Public events: every connected client receives every event
    broadcast_tx: broadcast::Sender<GatewayEvent>,

    /// user_id -> that user's open sessions
    sessions: RwLock<HashMap<Uuid, UserSessions>>,
}

struct UserSessions {
    username: String,
    /// conn_id -> targeted sender
    senders: HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients. Dropped silently when
    /// nobody is connected.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Open a session for `user_id`. Returns (conn_id, targeted receiver).
    /// The first session of a user announces them as online.
    pub async fn connect(&self, user_id: Uuid, username: String) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let first = {
            let mut sessions = self.inner.sessions.write().await;
            let entry = sessions.entry(user_id).or_insert_with(|| UserSessions {
                username: username.clone(),
                senders: HashMap::new(),
            });
            entry.senders.insert(conn_id, tx);
            entry.senders.len() == 1
        };

        if first {
            self.broadcast(GatewayEvent::PresenceUpdate {
                user_id,
                username,
                online: true,
            });
        } else {
            debug!("{} opened another session ({})", username, conn_id);
        }

        (conn_id, rx)
    }

    /// Close one session. The last one going away announces the user as
    /// offline. Unknown ids are ignored.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) {
        let gone = {
            let mut sessions = self.inner.sessions.write().await;
            let Some(entry) = sessions.get_mut(&user_id) else {
                return;
            };
            if entry.senders.remove(&conn_id).is_none() || !entry.senders.is_empty() {
                return;
            }
            sessions.remove(&user_id)
        };

        if let Some(entry) = gone {
            self.broadcast(GatewayEvent::PresenceUpdate {
                user_id,
                username: entry.username,
                online: false,
            });
        }
    }

    /// Send a targeted event to every session of a user. No-op if they are
    /// offline.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let sessions = self.inner.sessions.read().await;
        if let Some(entry) = sessions.get(&user_id) {
            for tx in entry.senders.values() {
                let _ = tx.send(event.clone());
            }
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.sessions.read().await.contains_key(&user_id)
    }

    /// (user_id, username) of everyone online, by username.
    pub async fn online_users(&self) -> Vec<(Uuid, String)> {
        let mut users: Vec<(Uuid, String)> = self
            .inner
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.username.clone()))
            .collect();
        users.sort_by(|a, b| a.1.cmp(&b.1));
        users
    }
}
