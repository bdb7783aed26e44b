use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, NotificationReply};
use crate::errors::{ApiError, ApiResult};
use crate::models::Notification;
use crate::protocol::NotificationEvent;
use crate::transport::{
    ChatSocket, ConnectionTag, HttpTransport, SocketConnector, SocketEvent, SocketRole,
};

pub const NOTIFICATIONS_SOCKET_PATH: &str = "/ws/notifications/";

struct NotificationState<S> {
    /// Newest first.
    notifications: Vec<Notification>,
    socket: Option<S>,
    generation: u64,
    /// Bumped when the session ends, so listings fetched before that are dropped.
    epoch: u64,
}

impl<S: ChatSocket> NotificationState<S> {
    fn close_socket(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.close();
        }
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.close_socket();
        self.notifications.clear();
        self.epoch += 1;
    }

    fn contains(&self, id: i64) -> bool {
        self.notifications.iter().any(|n| n.id == id)
    }
}

/// Live notification feed of the logged-in user: the unread backlog sent when
/// the socket opens, new notifications as they happen, and replies to friend
/// requests, invitations and join requests.
pub struct NotificationManager<T, C: SocketConnector> {
    api: Rc<ApiClient<T>>,
    connector: Rc<C>,
    state: Rc<RefCell<NotificationState<C::Socket>>>,
}

impl<T: HttpTransport, C: SocketConnector + 'static> NotificationManager<T, C> {
    pub fn new(api: Rc<ApiClient<T>>, connector: Rc<C>) -> Self {
        let state = Rc::new(RefCell::new(NotificationState {
            notifications: Vec::new(),
            socket: None,
            generation: 0,
            epoch: 0,
        }));

        let weak: Weak<RefCell<NotificationState<C::Socket>>> = Rc::downgrade(&state);
        api.on_unauthorized(move || {
            if let Some(state) = weak.upgrade() {
                state.borrow_mut().clear();
            }
        });

        Self { api, connector, state }
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state.borrow().notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.state.borrow().notifications.iter().filter(|n| !n.is_read).count()
    }

    pub fn has_feed(&self) -> bool {
        self.state.borrow().socket.is_some()
    }

    /// Opens the feed socket unless one is already open.
    pub fn open(&self) {
        let mut state = self.state.borrow_mut();
        if state.socket.is_some() {
            return;
        }
        let Some(token) = self.api.token() else {
            return;
        };

        state.generation += 1;
        let tag = ConnectionTag { role: SocketRole::Notifications, generation: state.generation };
        let url = self.api.config().socket_url(NOTIFICATIONS_SOCKET_PATH, &token);
        match self.connector.connect(&url, tag) {
            Ok(socket) => {
                debug!(generation = tag.generation, "Notifications socket opening");
                state.socket = Some(socket);
            }
            Err(e) => error!(error = %e, "Failed to open notifications socket"),
        }
    }

    pub fn handle_socket_event(&self, tag: ConnectionTag, event: SocketEvent) {
        let mut state = self.state.borrow_mut();
        if tag.role != SocketRole::Notifications || tag.generation != state.generation {
            debug!(generation = tag.generation, "Dropping event from a stale notifications socket");
            return;
        }

        match event {
            SocketEvent::Opened => debug!("Notifications socket established"),
            SocketEvent::Text(text) => match serde_json::from_str::<NotificationEvent>(&text) {
                Ok(NotificationEvent::Backlog { notifications }) => {
                    for notification in notifications {
                        if !state.contains(notification.id) {
                            state.notifications.push(notification);
                        }
                    }
                }
                Ok(NotificationEvent::Created { notification }) => {
                    if !state.contains(notification.id) {
                        debug!(id = notification.id, kind = ?notification.notification_type, "Notification received");
                        state.notifications.insert(0, notification);
                    }
                }
                Err(e) => warn!(error = %e, "Undecodable notifications frame"),
            },
            SocketEvent::Closed { code, reason } => {
                info!(?code, %reason, "Notifications socket closed");
                state.socket = None;
            }
            SocketEvent::Error(e) => warn!(error = %e, "Notifications socket error"),
        }
    }

    /// Replaces the list with the server's. Returns the number of notifications.
    pub async fn fetch(&self) -> ApiResult<usize> {
        let epoch = self.state.borrow().epoch;
        let notifications = self.api.notifications().await?;

        let mut state = self.state.borrow_mut();
        if state.epoch != epoch {
            debug!("Dropping notifications fetched for an ended session");
            return Ok(state.notifications.len());
        }
        state.notifications = notifications;
        Ok(state.notifications.len())
    }

    pub async fn mark_all_read(&self) -> ApiResult<()> {
        self.api.mark_all_read().await?;
        for notification in self.state.borrow_mut().notifications.iter_mut() {
            notification.is_read = true;
        }
        Ok(())
    }

    /// Accepts or rejects a friend request, invitation or join request. The
    /// notification is removed once the server confirms.
    pub async fn reply(&self, notification_id: i64, reply: NotificationReply) -> ApiResult<()> {
        let kind = self
            .state
            .borrow()
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .map(|n| n.notification_type)
            .ok_or_else(|| ApiError::Unexpected(format!("Unknown notification {notification_id}")))?;

        self.api.reply_to_notification(notification_id, kind, reply).await?;
        info!(id = notification_id, ?reply, "Notification answered");
        self.state.borrow_mut().notifications.retain(|n| n.id != notification_id);
        Ok(())
    }

    /// Closes the socket and forgets every notification.
    pub fn clear(&self) {
        self.state.borrow_mut().clear();
    }

    /// Closes the socket. Loaded notifications are kept.
    pub fn teardown(&self) {
        self.state.borrow_mut().close_socket();
    }
}
