use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use memento_types::api::Claims;
use memento_types::events::{GatewayCommand, GatewayEvent};

use crate::dispatcher::Dispatcher;

/// The server pings this often. A client that leaves two pings in a row
/// unanswered is dropped.
const PING_INTERVAL: Duration = Duration::from_secs(15);
const MAX_UNANSWERED_PINGS: u8 = 2;

const IDENTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Who is on the other end of a socket, once identified.
struct Peer {
    user_id: Uuid,
    username: String,
}

/// Serve one gateway socket: Identify handshake, Ready, presence replay,
/// then relay events until either side goes away.
pub async fn handle_connection(mut socket: WebSocket, dispatcher: Dispatcher, jwt_secret: String) {
    let Some(peer) = wait_for_identify(&mut socket, &jwt_secret).await else {
        warn!("Gateway client failed to identify within {:?}, closing", IDENTIFY_TIMEOUT);
        return;
    };

    let ready = GatewayEvent::Ready {
        user_id: peer.user_id,
        username: peer.username.clone(),
    };
    if push(&mut socket, &ready).await.is_err() {
        return;
    }
    info!("{} ({}) joined the gateway", peer.username, peer.user_id);

    let (mut public, roster) = watch_presence(&dispatcher).await;
    let (conn_id, mut private) = dispatcher.connect(peer.user_id, peer.username.clone()).await;

    let reason = match replay_presence(&mut socket, roster).await {
        Ok(()) => relay(&mut socket, &dispatcher, &peer, &mut public, &mut private).await,
        Err(_) => "write failed",
    };

    dispatcher.disconnect(peer.user_id, conn_id).await;
    info!("{} ({}) left the gateway: {}", peer.username, peer.user_id, reason);
}

/// Subscribe, then snapshot the roster. A user who comes online in between
/// shows up in both, never in neither.
async fn watch_presence(dispatcher: &Dispatcher) -> (broadcast::Receiver<GatewayEvent>, Vec<(Uuid, String)>) {
    let public = dispatcher.subscribe();
    let roster = dispatcher.online_users().await;
    (public, roster)
}

async fn replay_presence(socket: &mut WebSocket, roster: Vec<(Uuid, String)>) -> Result<(), axum::Error> {
    for (user_id, username) in roster {
        push(
            socket,
            &GatewayEvent::PresenceUpdate {
                user_id,
                username,
                online: true,
            },
        )
        .await?;
    }
    Ok(())
}

/// Main loop. Returns why the connection ended.
async fn relay(
    socket: &mut WebSocket,
    dispatcher: &Dispatcher,
    peer: &Peer,
    public: &mut broadcast::Receiver<GatewayEvent>,
    private: &mut mpsc::UnboundedReceiver<GatewayEvent>,
) -> &'static str {
    let mut heartbeat = tokio::time::interval(PING_INTERVAL);
    // The first tick fires immediately.
    heartbeat.tick().await;
    let mut unanswered: u8 = 0;

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => handle_command(dispatcher, peer.user_id, &peer.username, cmd),
                    Err(e) => warn!(
                        "{} ({}) sent a bad command: {} -- raw: {}",
                        peer.username,
                        peer.user_id,
                        e,
                        text.chars().take(200).collect::<String>()
                    ),
                },
                Some(Ok(Message::Pong(_))) => unanswered = 0,
                Some(Ok(Message::Close(_))) | None => return "closed by client",
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("{} ({}) read error: {}", peer.username, peer.user_id, e);
                    return "read error";
                }
            },
            event = public.recv() => match event {
                Ok(event) => {
                    if push(socket, &event).await.is_err() {
                        return "write failed";
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("{} ({}) fell {} events behind", peer.username, peer.user_id, n);
                }
                Err(RecvError::Closed) => return "dispatcher closed",
            },
            Some(event) = private.recv() => {
                if push(socket, &event).await.is_err() {
                    return "write failed";
                }
            }
            _ = heartbeat.tick() => {
                if unanswered >= MAX_UNANSWERED_PINGS {
                    warn!("{} ({}) missed {} pings, dropping", peer.username, peer.user_id, unanswered);
                    return "heartbeat timeout";
                }
                unanswered += 1;
                if socket.send(Message::Ping(Default::default())).await.is_err() {
                    return "write failed";
                }
            }
        }
    }
}

async fn push(socket: &mut WebSocket, event: &GatewayEvent) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to serialize gateway event: {}", e);
            return Ok(());
        }
    };
    socket.send(Message::Text(text.into())).await
}

/// Frames other than a valid Identify are ignored until the deadline.
async fn wait_for_identify(socket: &mut WebSocket, jwt_secret: &str) -> Option<Peer> {
    let identify = async {
        while let Some(Ok(frame)) = socket.recv().await {
            let Message::Text(text) = frame else { continue };
            if let Ok(GatewayCommand::Identify { token }) = serde_json::from_str::<GatewayCommand>(&text) {
                return verify_token(&token, jwt_secret)
                    .map(|(user_id, username)| Peer { user_id, username });
            }
        }
        None
    };

    tokio::time::timeout(IDENTIFY_TIMEOUT, identify).await.ok().flatten()
}

/// Decode a gateway Identify token into (user_id, username). Same claims
/// as the REST bearer token.
pub fn verify_token(token: &str, jwt_secret: &str) -> Option<(Uuid, String)> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    Some((data.claims.sub, data.claims.username))
}

fn handle_command(dispatcher: &Dispatcher, user_id: Uuid, username: &str, cmd: GatewayCommand) {
    match cmd {
        // Only meaningful as the first frame.
        GatewayCommand::Identify { .. } => debug!("{} ({}) re-sent Identify, ignored", username, user_id),

        GatewayCommand::StartTyping => {
            debug!("{} ({}) typing", username, user_id);
            dispatcher.broadcast(GatewayEvent::TypingStart {
                user_id,
                username: username.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp_offset: i64) -> (Uuid, String) {
        let sub = Uuid::new_v4();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;
        let claims = Claims {
            sub,
            username: "ada".into(),
            exp: (now + exp_offset) as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap();
        (sub, token)
    }

    #[test]
    fn verifies_identify_tokens() {
        let (sub, good) = token("s3cret", 3600);
        assert_eq!(verify_token(&good, "s3cret"), Some((sub, "ada".to_string())));
        assert_eq!(verify_token(&good, "other"), None);

        let (_, expired) = token("s3cret", -3600);
        assert_eq!(verify_token(&expired, "s3cret"), None);
        assert_eq!(verify_token("garbage", "s3cret"), None);
    }

    fn sees_online(public: &mut broadcast::Receiver<GatewayEvent>, roster: &[(Uuid, String)], who: Uuid) -> bool {
        let mut pushed = false;
        while let Ok(event) = public.try_recv() {
            if matches!(event, GatewayEvent::PresenceUpdate { user_id, online: true, .. } if user_id == who) {
                pushed = true;
            }
        }
        pushed || roster.iter().any(|(id, _)| *id == who)
    }

    #[tokio::test]
    async fn presence_is_not_lost_while_joining() {
        // Already online: only the roster knows.
        let dispatcher = Dispatcher::new();
        let bob = Uuid::new_v4();
        let _bob = dispatcher.connect(bob, "bob".into()).await;
        let (mut public, roster) = watch_presence(&dispatcher).await;
        assert!(sees_online(&mut public, &roster, bob));

        // Comes online right after the subscription: the event is queued.
        let dispatcher = Dispatcher::new();
        let mut public = dispatcher.subscribe();
        let _bob = dispatcher.connect(bob, "bob".into()).await;
        let roster = dispatcher.online_users().await;
        assert!(sees_online(&mut public, &roster, bob));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn presence_survives_concurrent_joins() {
        for _ in 0..200 {
            let dispatcher = Dispatcher::new();
            let bob = Uuid::new_v4();
            let other = dispatcher.clone();
            let joining = tokio::spawn(async move { other.connect(bob, "bob".into()).await });

            let (mut public, roster) = watch_presence(&dispatcher).await;
            let _bob = joining.await.unwrap();
            // Whatever was not in the roster must be queued by now.
            assert!(sees_online(&mut public, &roster, bob));
        }
    }

    #[tokio::test]
    async fn typing_is_broadcast_and_identify_is_ignored() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();
        let user_id = Uuid::new_v4();

        handle_command(&dispatcher, user_id, "ada", GatewayCommand::Identify { token: "again".into() });
        handle_command(&dispatcher, user_id, "ada", GatewayCommand::StartTyping);

        assert!(matches!(rx.recv().await.unwrap(), GatewayEvent::TypingStart { user_id: id, .. } if id == user_id));
        assert!(rx.try_recv().is_err());
    }
}
