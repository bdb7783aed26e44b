use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

use neurocom_client::errors::SocketError;
use neurocom_client::{ChatSocket, ConnectionTag, SocketConnector, SocketEvent};

type EventHandler = Rc<dyn Fn(ConnectionTag, SocketEvent)>;

/// Opens browser WebSockets and reports their events to one handler,
/// installed after the client that owns this connector exists.
#[derive(Clone, Default)]
pub struct BrowserConnector {
    handler: Rc<RefCell<Option<EventHandler>>>,
}

impl BrowserConnector {
    pub fn set_handler(&self, handler: impl Fn(ConnectionTag, SocketEvent) + 'static) {
        *self.handler.borrow_mut() = Some(Rc::new(handler));
    }
}

fn dispatch(slot: &Rc<RefCell<Option<EventHandler>>>, tag: ConnectionTag, event: SocketEvent) {
    let handler = slot.borrow().clone();
    match handler {
        Some(handler) => handler(tag, event),
        None => log::warn!("Socket event dropped, no handler installed"),
    }
}

/// Everything before the query string, which carries the token.
fn public_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

impl SocketConnector for BrowserConnector {
    type Socket = BrowserSocket;

    fn connect(&self, url: &str, tag: ConnectionTag) -> Result<BrowserSocket, SocketError> {
        let ws = WebSocket::new(url).map_err(|e| SocketError::Connect {
            url: public_url(url).to_string(),
            reason: format!("{e:?}"),
        })?;
        ws.set_binary_type(web_sys::BinaryType::Arraybuffer);

        // --- onopen ---
        let slot = self.handler.clone();
        let onopen = Closure::<dyn Fn()>::new(move || dispatch(&slot, tag, SocketEvent::Opened));
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();

        // --- onmessage: text frames only ---
        let slot = self.handler.clone();
        let onmessage = Closure::<dyn Fn(MessageEvent)>::new(move |ev: MessageEvent| {
            if let Some(text) = ev.data().as_string() {
                dispatch(&slot, tag, SocketEvent::Text(text));
            }
        });
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();

        // --- onclose ---
        let slot = self.handler.clone();
        let onclose = Closure::<dyn Fn(CloseEvent)>::new(move |ev: CloseEvent| {
            dispatch(&slot, tag, SocketEvent::Closed { code: Some(ev.code()), reason: ev.reason() });
        });
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();

        // --- onerror ---
        let slot = self.handler.clone();
        let onerror = Closure::<dyn Fn()>::new(move || {
            dispatch(&slot, tag, SocketEvent::Error("WebSocket connection error".to_string()));
        });
        ws.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        log::debug!("WebSocket opening: {}", public_url(url));
        Ok(BrowserSocket { ws })
    }
}

pub struct BrowserSocket {
    ws: WebSocket,
}

impl ChatSocket for BrowserSocket {
    fn send_text(&self, text: String) -> Result<(), SocketError> {
        if self.ws.ready_state() != WebSocket::OPEN {
            return Err(SocketError::Send("socket is not open yet".to_string()));
        }
        self.ws
            .send_with_str(&text)
            .map_err(|e| SocketError::Send(format!("{e:?}")))
    }

    fn close(&self) {
        let _ = self.ws.close();
    }
}
