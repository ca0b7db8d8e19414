//! State shared between the connection handle, the worker and the
//! receive loop

use std::collections::VecDeque;
use std::net::SocketAddr;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use tsquery_protocol::{Message, Notification, Request};

use crate::event::{Event, EventSink};
use crate::state::ConnectionState;

/// A sent command waiting for its response
struct Pending {
    request: Request,
    reply: oneshot::Sender<Option<Message>>,
}

#[derive(Default)]
struct Shared {
    state: ConnectionState,
    /// Oldest first; responses arrive in the order commands were written
    pending: VecDeque<Pending>,
    logged_in: bool,
    /// `Connected` was emitted and `Disconnected` is still owed
    announced: bool,
    /// Bumped on every connect so a stale receive loop cannot tear down
    /// a newer session
    generation: u64,
    addrs: Option<(SocketAddr, SocketAddr)>,
}

pub(crate) struct Core {
    shared: Mutex<Shared>,
    events: EventSink,
}

impl Core {
    pub(crate) fn new(event_capacity: usize) -> Self {
        Self {
            shared: Mutex::new(Shared::default()),
            events: EventSink::new(event_capacity),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.shared.lock().state = state;
    }

    pub(crate) fn is_logged_in(&self) -> bool {
        self.shared.lock().logged_in
    }

    pub(crate) fn addrs(&self) -> Option<(SocketAddr, SocketAddr)> {
        self.shared.lock().addrs
    }

    /// Start a new session in `Handshaking`, returning its generation.
    pub(crate) fn begin_session(&self) -> u64 {
        let mut shared = self.shared.lock();
        shared.generation += 1;
        shared.state = ConnectionState::Handshaking;
        shared.pending.clear();
        shared.logged_in = false;
        shared.announced = false;
        shared.addrs = None;
        shared.generation
    }

    /// Move a handshaking session to `Ready` and emit `Connected`.
    ///
    /// Fails if the session was torn down while the greeting was read.
    pub(crate) fn session_ready(&self, generation: u64, local: SocketAddr, peer: SocketAddr) -> bool {
        let mut shared = self.shared.lock();
        if shared.generation != generation || shared.state != ConnectionState::Handshaking {
            return false;
        }

        shared.state = ConnectionState::Ready;
        shared.announced = true;
        shared.addrs = Some((local, peer));
        self.events.emit(Event::Connected { local, peer });
        true
    }

    /// `Ready` to `Disconnecting`, if this session is still ready
    pub(crate) fn begin_disconnect(&self, generation: u64) -> bool {
        let mut shared = self.shared.lock();
        if shared.generation != generation || shared.state != ConnectionState::Ready {
            return false;
        }
        shared.state = ConnectionState::Disconnecting;
        true
    }

    /// Queue a request for pairing and emit `Sent`.
    ///
    /// Must happen before the line is written, or a fast response could
    /// find nothing to pair with. Returns false (dropping `reply`) if the
    /// connection is not in `expected` state.
    pub(crate) fn enroll(
        &self,
        request: &Request,
        reply: oneshot::Sender<Option<Message>>,
        expected: ConnectionState,
    ) -> bool {
        let mut shared = self.shared.lock();
        if shared.state != expected {
            return false;
        }

        shared.pending.push_back(Pending {
            request: request.clone(),
            reply,
        });
        self.events.emit(Event::Sent(request.clone()));
        true
    }

    /// Hand a response to the oldest pending request.
    pub(crate) fn pair(&self, message: Message) {
        let mut shared = self.shared.lock();
        let Some(pending) = shared.pending.pop_front() else {
            warn!(id = ?message.id(), "Response without a pending request, dropping");
            return;
        };

        let command = pending.request.command();
        debug!(command = %command, id = ?message.id(), "Response received");
        if message.is_ok() {
            match command {
                "login" => shared.logged_in = true,
                "logout" => shared.logged_in = false,
                _ => {}
            }
        }

        self.events.emit(Event::Received {
            request: pending.request,
            message: message.clone(),
        });
        let _ = pending.reply.send(Some(message));
    }

    /// Hand a ban notice to the oldest pending request, if any, and mark
    /// the connection banned.
    pub(crate) fn ban(&self, message: Message) {
        let mut shared = self.shared.lock();
        warn!(
            id = ?message.id(),
            msg = message.message().unwrap_or_default(),
            extra = message.extra_message().unwrap_or_default(),
            "Banned by server"
        );

        shared.state = ConnectionState::Banned;
        self.events.emit(Event::Banned(message.clone()));
        if let Some(pending) = shared.pending.pop_front() {
            let _ = pending.reply.send(Some(message));
        }
    }

    pub(crate) fn notify(&self, notification: Notification) {
        debug!(event = %notification.event(), "Notification received");
        self.events.emit(Event::Notified(notification));
    }

    /// End a session: release every waiter with no response and emit
    /// `Disconnected` once per `Connected`. Safe to call repeatedly.
    pub(crate) fn teardown(&self, generation: u64) {
        let mut shared = self.shared.lock();
        if shared.generation != generation {
            return;
        }

        shared.state = ConnectionState::Disconnected;
        shared.logged_in = false;
        shared.addrs = None;
        let released = shared.pending.len();
        shared.pending.clear();

        if shared.announced {
            shared.announced = false;
            info!(released, "Disconnected");
            self.events.emit(Event::Disconnected);
        }
    }
}
