use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::WebSocketUpgrade;
use axum::routing::get;
use uuid::Uuid;

use memento_api::{AppState, AppStateInner, router};
use memento_client::chat::ChatView;
use memento_client::directory::DirectoryView;
use memento_client::gateway::GatewayClient;
use memento_client::inbox::Inbox;
use memento_client::{ClientError, Session, SyncOutcome};
use memento_core::directory::SortKey;
use memento_core::format::PLACEHOLDER;
use memento_db::Database;
use memento_gateway::connection::handle_connection;
use memento_gateway::dispatcher::Dispatcher;
use memento_types::events::GatewayEvent;

async fn spawn_server() -> (SocketAddr, AppState) {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "e2e-secret".into(),
        dispatcher: Dispatcher::new(),
    });

    let ws_state = state.clone();
    let app = router(state.clone()).route(
        "/gateway",
        get(move |ws: WebSocketUpgrade| {
            let state = ws_state.clone();
            async move {
                ws.on_upgrade(move |socket| {
                    handle_connection(socket, state.dispatcher.clone(), state.jwt_secret.clone())
                })
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

async fn wait_until_online(state: &AppState, user_id: Uuid) {
    for _ in 0..100 {
        if state.dispatcher.online_users().await.iter().any(|(id, _)| *id == user_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("{} never came online", user_id);
}

#[tokio::test]
async fn chat_reactions_reach_the_author() {
    let (addr, state) = spawn_server().await;
    let base = format!("http://{}", addr);

    let mut ada = Session::new(base.clone());
    let ada_id = ada.register("ada", "correct horse").await.unwrap().user_id;
    let mut bob = Session::new(base);
    let bob_id = bob.register("bob", "correct horse").await.unwrap().user_id;

    let mut gateway = GatewayClient::connect(&ada).await.unwrap();
    assert_eq!(gateway.user_id, ada_id);
    wait_until_online(&state, ada_id).await;

    let mut ada_chat = ChatView::new(ada.backend().unwrap(), ada_id);
    ada_chat.send("exam moved to friday").await.unwrap();
    let message_id = ada_chat.messages()[0].id;

    let mut bob_chat = ChatView::new(bob.backend().unwrap(), bob_id);
    bob_chat.load().await.unwrap();
    assert_eq!(bob_chat.react(message_id, "👍").await, SyncOutcome::Confirmed);
    assert_eq!(bob_chat.messages()[0].reactions.reaction_of(bob_id), Some("👍"));

    // Not on the palette: the server refuses and the view goes back.
    assert_eq!(bob_chat.react(message_id, "🦀").await, SyncOutcome::Reverted);
    assert_eq!(bob_chat.messages()[0].reactions.reaction_of(bob_id), Some("👍"));
    assert!(bob_chat.error().unwrap().contains("400"));

    let mut inbox = Inbox::new(ada.backend().unwrap());
    let pushed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = gateway.events.recv().await {
            if let GatewayEvent::NotificationCreate { .. } = event {
                return Some(event);
            }
        }
        None
    })
    .await
    .unwrap()
    .expect("gateway closed before the notification arrived");
    inbox.apply_event(&pushed);
    assert_eq!(inbox.unread_count(), 1);

    inbox.load().await.unwrap();
    let id = inbox.notifications()[0].id;
    assert_eq!(inbox.notifications()[0].text, "bob reacted 👍 to your message");
    assert_eq!(inbox.mark_read(id).await, SyncOutcome::Confirmed);
    assert_eq!(inbox.unread_count(), 0);

    gateway.close();
}

#[tokio::test]
async fn directory_and_sign_out() {
    let (addr, _state) = spawn_server().await;
    let mut session = Session::new(format!("http://{}", addr));
    session.register("carol", "correct horse").await.unwrap();

    let mut other = Session::new(session.base_url().to_string());
    other.register("dave", "correct horse").await.unwrap();
    let wrong = other.sign_in("dave", "wrong password").await;
    assert!(matches!(wrong, Err(ClientError::Status { status: 401, .. })));

    let mut directory = DirectoryView::new(session.backend().unwrap());
    directory.load().await.unwrap();
    directory.request_sort(SortKey::Name);
    let rows = directory.rows();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.name == PLACEHOLDER && r.website.is_none()));

    session.sign_out();
    assert!(matches!(session.backend(), Err(ClientError::NotSignedIn)));
}
