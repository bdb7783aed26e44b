use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tracing::{debug, warn};

use crate::errors::SocketError;
use crate::transport::{ChatSocket, ConnectionTag, SocketConnector, SocketEvent};

/// Receiving end of every socket opened by a [`TungsteniteConnector`].
pub type SocketEvents = mpsc::UnboundedReceiver<(ConnectionTag, SocketEvent)>;

type EventSender = mpsc::UnboundedSender<(ConnectionTag, SocketEvent)>;

enum Outbound {
    Text(String),
    Close,
}

/// Opens sockets on background tokio tasks. Must be used inside a tokio runtime.
pub struct TungsteniteConnector {
    events: EventSender,
}

impl TungsteniteConnector {
    pub fn new() -> (Self, SocketEvents) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }
}

impl SocketConnector for TungsteniteConnector {
    type Socket = TungsteniteSocket;

    fn connect(&self, url: &str, tag: ConnectionTag) -> Result<TungsteniteSocket, SocketError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| SocketError::Connect {
            url: redact_token(url),
            reason: e.to_string(),
        })?;
        let (outbound, commands) = mpsc::unbounded_channel();
        handle.spawn(run_socket(url.to_string(), tag, commands, self.events.clone()));
        Ok(TungsteniteSocket { outbound })
    }
}

/// Handle to a socket task. Sends are queued until the connection is up.
pub struct TungsteniteSocket {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl ChatSocket for TungsteniteSocket {
    fn send_text(&self, text: String) -> Result<(), SocketError> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| SocketError::Send("socket task has stopped".to_string()))
    }

    fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn run_socket(
    url: String,
    tag: ConnectionTag,
    mut commands: mpsc::UnboundedReceiver<Outbound>,
    events: EventSender,
) {
    let emit = |event: SocketEvent| {
        let _ = events.send((tag, event));
    };

    let stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!(url = %redact_token(&url), error = %e, "WebSocket connect failed");
            emit(SocketEvent::Error(e.to_string()));
            emit(SocketEvent::Closed { code: None, reason: e.to_string() });
            return;
        }
    };
    emit(SocketEvent::Opened);

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(WsFrame::Text(text.into())).await {
                        emit(SocketEvent::Error(e.to_string()));
                        emit(SocketEvent::Closed { code: None, reason: e.to_string() });
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.send(WsFrame::Close(None)).await;
                    debug!(generation = tag.generation, "WebSocket closed locally");
                    emit(SocketEvent::Closed { code: Some(1000), reason: "closed by client".to_string() });
                    return;
                }
            },
            frame = source.next() => match frame {
                Some(Ok(WsFrame::Text(text))) => emit(SocketEvent::Text(text.as_str().to_string())),
                Some(Ok(WsFrame::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                        None => (None, String::new()),
                    };
                    emit(SocketEvent::Closed { code, reason });
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(SocketEvent::Error(e.to_string()));
                    emit(SocketEvent::Closed { code: None, reason: e.to_string() });
                    return;
                }
                None => {
                    emit(SocketEvent::Closed { code: None, reason: "stream ended".to_string() });
                    return;
                }
            },
        }
    }
}

/// Socket URLs carry the token as a query parameter; keep it out of logs.
fn redact_token(url: &str) -> String {
    match url.split_once("?token=") {
        Some((base, _)) => format!("{base}?token=<redacted>"),
        None => url.to_string(),
    }
}
