#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use neurocom_client::errors::SocketError;
use neurocom_client::transport::Method;
use neurocom_client::{
    ChatClient, ChatSocket, ClientConfig, ConnectionTag, HttpRequest, HttpResponse, HttpTransport,
    MemoryTokenStore, SocketConnector, SocketEvent, SocketRole, TokenStore, TransportError,
};
use serde_json::{json, Value};
use tokio::sync::Notify;

pub const API_BASE: &str = "http://localhost:8000";
pub const TOKEN: &str = "tok-123";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── HTTP fake ────────────────────────────────────────────────────────────────

enum Reply {
    Status(u16, String),
    Offline,
}

#[derive(Default)]
struct TransportInner {
    replies: RefCell<HashMap<String, VecDeque<Reply>>>,
    served: RefCell<HashMap<String, Reply>>,
    gates: RefCell<HashMap<String, Rc<Notify>>>,
    requests: RefCell<Vec<HttpRequest>>,
}

/// Scripted transport. Replies are queued per `"METHOD /path"`; once a route's
/// queue is drained, its last reply keeps answering. Unscripted routes answer 404.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Rc<TransportInner>,
}

fn route_key(method: Method, path: &str) -> String {
    format!("{method} {path}")
}

impl FakeTransport {
    pub fn reply(&self, method: Method, path: &str, status: u16, body: impl Into<String>) {
        self.push(method, path, Reply::Status(status, body.into()));
    }

    pub fn ok(&self, method: Method, path: &str, data: Value) {
        self.reply(method, path, 200, envelope(data));
    }

    pub fn offline(&self, method: Method, path: &str) {
        self.push(method, path, Reply::Offline);
    }

    /// The next request to this route waits until the returned gate is notified.
    pub fn hold(&self, method: Method, path: &str) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        self.inner.gates.borrow_mut().insert(route_key(method, path), gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.requests.borrow().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.requests().into_iter().filter(|r| r.url == format!("{API_BASE}{path}")).collect()
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.inner
            .replies
            .borrow_mut()
            .entry(route_key(method, path))
            .or_default()
            .push_back(reply);
    }

    fn next_reply(&self, key: &str) -> Option<Result<HttpResponse, TransportError>> {
        let queued = self.inner.replies.borrow_mut().get_mut(key).and_then(VecDeque::pop_front);
        let mut served = self.inner.served.borrow_mut();
        let reply = match queued {
            Some(reply) => {
                served.insert(key.to_string(), clone_reply(&reply));
                reply
            }
            None => clone_reply(served.get(key)?),
        };
        Some(match reply {
            Reply::Status(status, body) => Ok(HttpResponse { status, body }),
            Reply::Offline => Err(TransportError("connection refused".to_string())),
        })
    }
}

fn clone_reply(reply: &Reply) -> Reply {
    match reply {
        Reply::Status(status, body) => Reply::Status(*status, body.clone()),
        Reply::Offline => Reply::Offline,
    }
}

impl HttpTransport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.strip_prefix(API_BASE).unwrap_or(&request.url).to_string();
        let key = route_key(request.method, &path);
        self.inner.requests.borrow_mut().push(request);

        let gate = self.inner.gates.borrow_mut().remove(&key);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.next_reply(&key).unwrap_or_else(|| {
            Ok(HttpResponse { status: 404, body: json!({"detail": "Not found."}).to_string() })
        })
    }
}

// ── Socket fake ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SocketRecord {
    pub url: String,
    pub tag: ConnectionTag,
    pub sent: Vec<String>,
    pub closed: bool,
}

impl SocketRecord {
    pub fn frames(&self) -> Vec<Value> {
        self.sent.iter().map(|text| serde_json::from_str(text).unwrap()).collect()
    }
}

/// Records every socket it opens; tests push events through the client by hand.
#[derive(Clone, Default)]
pub struct FakeConnector {
    records: Rc<RefCell<Vec<SocketRecord>>>,
}

impl FakeConnector {
    pub fn sockets(&self) -> Vec<SocketRecord> {
        self.records.borrow().clone()
    }

    pub fn last(&self, role: SocketRole) -> Option<SocketRecord> {
        self.sockets().into_iter().rev().find(|s| s.tag.role == role)
    }

    pub fn conversation(&self) -> SocketRecord {
        self.last(SocketRole::Conversation).expect("no conversation socket was opened")
    }

    pub fn presence(&self) -> SocketRecord {
        self.last(SocketRole::Presence).expect("no presence socket was opened")
    }

    pub fn notifications(&self) -> SocketRecord {
        self.last(SocketRole::Notifications).expect("no notifications socket was opened")
    }
}

pub struct FakeSocket {
    index: usize,
    records: Rc<RefCell<Vec<SocketRecord>>>,
}

impl ChatSocket for FakeSocket {
    fn send_text(&self, text: String) -> Result<(), SocketError> {
        let mut records = self.records.borrow_mut();
        let record = &mut records[self.index];
        if record.closed {
            return Err(SocketError::Send("socket is closed".to_string()));
        }
        record.sent.push(text);
        Ok(())
    }

    fn close(&self) {
        self.records.borrow_mut()[self.index].closed = true;
    }
}

impl SocketConnector for FakeConnector {
    type Socket = FakeSocket;

    fn connect(&self, url: &str, tag: ConnectionTag) -> Result<FakeSocket, SocketError> {
        let mut records = self.records.borrow_mut();
        records.push(SocketRecord { url: url.to_string(), tag, sent: Vec::new(), closed: false });
        Ok(FakeSocket { index: records.len() - 1, records: self.records.clone() })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

pub struct Harness {
    pub client: ChatClient<FakeTransport, FakeConnector>,
    pub http: FakeTransport,
    pub sockets: FakeConnector,
    pub tokens: Rc<MemoryTokenStore>,
}

impl Harness {
    pub fn new(token: Option<&str>) -> Self {
        Self::with_config(token, ClientConfig::default())
    }

    pub fn with_config(token: Option<&str>, config: ClientConfig) -> Self {
        init_tracing();
        let http = FakeTransport::default();
        let sockets = FakeConnector::default();
        let tokens = Rc::new(match token {
            Some(token) => MemoryTokenStore::with_token(token),
            None => MemoryTokenStore::new(),
        });
        let store: Rc<dyn TokenStore> = tokens.clone();
        let client = ChatClient::new(http.clone(), store, sockets.clone(), config);
        Self { client, http, sockets, tokens }
    }

    /// A client whose stored token was accepted by `/user/me/`.
    pub async fn logged_in() -> Self {
        Self::logged_in_with(ClientConfig::default()).await
    }

    pub async fn logged_in_with(config: ClientConfig) -> Self {
        let harness = Self::with_config(Some(TOKEN), config);
        harness.http.ok(Method::Get, "/user/me/", json!({ "user": user_json(1, "ana") }));
        harness.client.session().restore_session().await.unwrap();
        harness
    }

    /// Delivers a text frame on the socket identified by `tag`.
    pub fn push_frame(&self, tag: ConnectionTag, frame: Value) {
        self.client.handle_socket_event(tag, SocketEvent::Text(frame.to_string()));
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.token()
    }
}

// ── JSON builders ────────────────────────────────────────────────────────────

pub fn envelope(data: Value) -> String {
    json!({ "success": true, "message": "ok", "data": data }).to_string()
}

pub fn user_json(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "first_name": "",
        "last_name": "",
        "email": format!("{username}@example.com"),
        "settings": { "darkmode": true, "request_notifications": false, "message_notifications": true }
    })
}

pub fn message_json(id: i64, content: &str) -> Value {
    json!({
        "id": id,
        "content": content,
        "sender": { "id": 2, "username": "bo" },
        "timestamp": "2024-05-01T12:00:00Z"
    })
}

/// A history page; `ids` are newest first, as the backend sends them.
pub fn history_page(ids: &[i64], next: Option<&str>) -> Value {
    let messages: Vec<Value> = ids.iter().map(|id| message_json(*id, &format!("m{id}"))).collect();
    json!({ "messages": messages, "pagination": { "next": next, "previous": null } })
}

pub fn notification_json(id: i64, kind: &str) -> Value {
    json!({
        "id": id,
        "notification_type": kind,
        "notification_message": format!("{kind} #{id}"),
        "is_read": false,
        "created_at": "2024-05-01T12:00:00Z"
    })
}

pub fn chat_event(id: i64, content: &str) -> Value {
    json!({ "action_type": "chat_message", "message": message_json(id, content) })
}
