//! Drives the native adapters against an in-process axum backend that speaks
//! the same REST envelope and socket frames as the real server.

use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use neurocom_client::native::{native_client, NativeChatClient, SocketEvents};
use neurocom_client::{
    ClientConfig, ConnectionState, ConversationHandle, LoginState, MemoryTokenStore, TokenStore,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

const TOKEN: &str = "native-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Token {TOKEN}"))
}

fn user() -> Value {
    json!({"id": 1, "username": "ana", "settings": {"darkmode": false}})
}

async fn me_handler(headers: HeaderMap) -> impl IntoResponse {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid token."})));
    }
    (StatusCode::OK, Json(json!({"success": true, "data": {"user": user()}})))
}

async fn history_handler(Path(dm_id): Path<i64>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "messages": [
                {"id": 2, "content": format!("second in {dm_id}"), "sender": user()},
                {"id": 1, "content": "first", "sender": user()}
            ],
            "pagination": {"next": null, "previous": null}
        }
    }))
}

async fn logout_handler() -> Json<Value> {
    Json(json!({"success": true, "message": "Logged out"}))
}

async fn dm_socket_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(echo_chat)
}

/// Answers every `chat_message` with the stored message, like the backend's consumer.
async fn echo_chat(mut socket: WebSocket) {
    let mut next_id = 100;
    while let Some(Ok(msg)) = socket.recv().await {
        let text = match msg {
            Message::Text(t) => t.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        if frame["action_type"] != "chat_message" {
            continue;
        }
        let echo = json!({
            "action_type": "chat_message",
            "message": {
                "id": next_id,
                "content": frame["message"]["content"],
                "sender": frame["message"]["sender"]
            }
        });
        next_id += 1;
        if socket.send(Message::Text(echo.to_string().into())).await.is_err() {
            break;
        }
    }
}

async fn presence_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let online = json!({"type": "online_users", "online_users": [user()]});
        let _ = socket.send(Message::Text(online.to_string().into())).await;
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

/// Sends the unread backlog on connect, like the notifications consumer.
async fn notifications_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let backlog = json!({"notifications": [{
            "id": 1,
            "notification_type": "friend_request",
            "notification_message": "bo sent you a friend request",
            "is_read": false
        }]});
        let _ = socket.send(Message::Text(backlog.to_string().into())).await;
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

async fn spawn_backend() -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/user/me/", get(me_handler))
        .route("/user/logout/", post(logout_handler))
        .route("/chat/get_messages_dm/{dm_id}/messages/", get(history_handler))
        .route("/ws/dm/{dm_id}/", get(dm_socket_handler))
        .route("/ws/activity/", get(presence_handler))
        .route("/ws/notifications/", get(notifications_handler))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

/// Feeds socket events into the client until `done` holds.
async fn pump_until(
    client: &NativeChatClient,
    events: &mut SocketEvents,
    done: impl Fn(&NativeChatClient) -> bool,
) -> anyhow::Result<()> {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(client) {
            let (tag, event) = events
                .recv()
                .await
                .ok_or_else(|| anyhow::anyhow!("socket event channel closed"))?;
            client.handle_socket_event(tag, event);
        }
        Ok::<(), anyhow::Error>(())
    })
    .await?
}

#[tokio::test]
async fn full_session_against_a_mock_backend() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let addr = spawn_backend().await?;
    let config = ClientConfig::new(format!("http://{addr}"), format!("ws://{addr}"));
    let tokens = Rc::new(MemoryTokenStore::with_token(TOKEN));
    let store: Rc<dyn TokenStore> = tokens.clone();
    let (client, mut events) = native_client(config, store)?;

    assert_eq!(client.session().restore_session().await?, LoginState::Authenticated);
    pump_until(&client, &mut events, |c| !c.session().online_users().is_empty()).await?;
    assert_eq!(client.session().online_users(), vec![1]);
    pump_until(&client, &mut events, |c| c.session().notifications().unread_count() == 1).await?;

    let manager = client.open_direct_messages()?;
    manager.switch_conversation(ConversationHandle::Direct { dm_id: 7 }).await?;
    let contents: Vec<String> = manager.messages().into_iter().map(|m| m.content).collect();
    assert_eq!(contents, vec!["first".to_string(), "second in 7".to_string()]);

    pump_until(&client, &mut events, |_| manager.connection_state() == ConnectionState::Open).await?;

    assert!(manager.send_message("  over the wire ")?);
    pump_until(&client, &mut events, |_| manager.message_count() == 3).await?;
    let echoed = manager.messages().pop().expect("echoed message");
    assert_eq!(echoed.id, 100);
    assert_eq!(echoed.content, "over the wire");

    client.logout().await?;
    assert_eq!(client.session().login_state(), LoginState::Anonymous);
    assert_eq!(tokens.token(), None);
    Ok(())
}

#[tokio::test]
async fn rejected_token_against_a_mock_backend() -> anyhow::Result<()> {
    let addr = spawn_backend().await?;
    let config = ClientConfig::new(format!("http://{addr}"), format!("ws://{addr}"));
    let tokens = Rc::new(MemoryTokenStore::with_token("wrong"));
    let store: Rc<dyn TokenStore> = tokens.clone();
    let (client, _events) = native_client(config, store)?;

    let err = client.session().restore_session().await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(tokens.token(), None);
    assert_eq!(client.session().login_state(), LoginState::Anonymous);
    Ok(())
}
