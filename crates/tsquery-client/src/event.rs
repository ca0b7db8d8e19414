//! Connection events

use std::net::SocketAddr;

use tokio::sync::broadcast;
use tsquery_protocol::{Message, Notification, Request};

/// Something that happened on a connection
///
/// Delivered to every receiver returned by
/// [`Connection::subscribe`](crate::Connection::subscribe), in order.
#[derive(Debug, Clone)]
pub enum Event {
    /// Greeting received, commands may be sent
    Connected { local: SocketAddr, peer: SocketAddr },
    /// The session ended, for whatever reason
    Disconnected,
    /// A command was queued on the socket
    Sent(Request),
    /// A response was paired with its command
    Received { request: Request, message: Message },
    /// The server banned this client; the session is torn down
    Banned(Message),
    /// A notification arrived
    Notified(Notification),
}

/// Broadcast side of the event stream
#[derive(Clone)]
pub(crate) struct EventSink {
    sender: broadcast::Sender<Event>,
}

impl EventSink {
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Never blocks; events without subscribers are dropped.
    pub(crate) fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}
