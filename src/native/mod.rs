//! Adapters for running the client natively on tokio: `reqwest` for REST and
//! `tokio-tungstenite` for sockets.

mod http;
mod socket;

use std::rc::Rc;

use tokio::sync::mpsc;

use crate::client::ChatClient;
use crate::config::ClientConfig;
use crate::storage::TokenStore;
use crate::transport::{ConnectionTag, SocketEvent};

pub use http::ReqwestTransport;
pub use socket::{SocketEvents, TungsteniteConnector, TungsteniteSocket};

pub type NativeChatClient = ChatClient<ReqwestTransport, TungsteniteConnector>;

/// Builds a client on the native adapters. Socket events arrive on the returned
/// receiver and must be fed back through [`ChatClient::handle_socket_event`],
/// for instance with [`dispatch_events`].
pub fn native_client(
    config: ClientConfig,
    tokens: Rc<dyn TokenStore>,
) -> Result<(NativeChatClient, SocketEvents), reqwest::Error> {
    let transport = ReqwestTransport::new(config.request_timeout)?;
    let (connector, events) = TungsteniteConnector::new();
    Ok((ChatClient::new(transport, tokens, connector, config), events))
}

/// Forwards socket events to `client` until every sender is gone.
pub async fn dispatch_events(
    client: &NativeChatClient,
    events: &mut mpsc::UnboundedReceiver<(ConnectionTag, SocketEvent)>,
) {
    while let Some((tag, event)) = events.recv().await {
        client.handle_socket_event(tag, event);
    }
}
