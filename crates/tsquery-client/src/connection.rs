//! The connection engine
//!
//! A [`Connection`] is a cheap, clonable handle. Every operation becomes a
//! [`Task`] on one queue drained by a single worker task, so connects,
//! disconnects and sends run strictly in the order they were issued, from
//! however many handles. Each session additionally runs a receive loop that
//! pairs responses with pending requests in FIFO order.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};
use tsquery_protocol::{Message, Parser, Request};

use crate::config::ConnectionConfig;
use crate::error::{ClientError, ClientResult};
use crate::event::Event;
use crate::reader::Reader;
use crate::shared::Core;
use crate::state::ConnectionState;
use crate::throttle::Throttle;

/// Units of work executed by the worker, each with its own reply channel
enum Task {
    Connect {
        endpoint: String,
        reply: oneshot::Sender<ClientResult<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send {
        request: Request,
        reply: oneshot::Sender<Option<Message>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Response to a queued request
///
/// Resolves to `None` if the connection was not ready when the request's
/// turn came, or if the session ended before a response arrived.
#[must_use = "a Reply does nothing unless awaited"]
pub struct Reply {
    rx: oneshot::Receiver<Option<Message>>,
}

impl Future for Reply {
    type Output = Option<Message>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|result| result.ok().flatten())
    }
}

struct Inner {
    config: ConnectionConfig,
    tasks: mpsc::UnboundedSender<Task>,
    core: Arc<Core>,
    closed: AtomicBool,
}

/// Handle to a ServerQuery connection
///
/// Must be created inside a Tokio runtime. The worker stops, closing any
/// open session, once [`Connection::close`] is called or the last handle is
/// dropped.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    pub fn new(config: ConnectionConfig) -> Self {
        let core = Arc::new(Core::new(config.event_capacity));
        let (tasks, rx) = mpsc::unbounded_channel();

        let worker = Worker {
            tasks: rx,
            core: core.clone(),
            throttle: config.throttle.clone().map(Throttle::new),
            config: config.clone(),
            session: None,
        };
        tokio::spawn(worker.run());

        Self {
            inner: Arc::new(Inner {
                config,
                tasks,
                core,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Connect to `endpoint` (`host:port`) and wait for the greeting.
    ///
    /// The task is queued when this is called, not when the future is first
    /// polled, so requests submitted afterwards run once connected. Does
    /// nothing if already connected.
    pub fn connect(
        &self,
        endpoint: impl Into<String>,
    ) -> impl Future<Output = ClientResult<()>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        let queued = self.enqueue(Task::Connect {
            endpoint: endpoint.into(),
            reply,
        });

        async move {
            queued?;
            rx.await.map_err(|_| ClientError::Closed)?
        }
    }

    /// Log out if needed, send `quit` and close the socket.
    ///
    /// Queued at call time like [`Connection::connect`]. Does nothing if not
    /// connected.
    pub fn disconnect(&self) -> impl Future<Output = ClientResult<()>> + Send + 'static {
        let (reply, rx) = oneshot::channel();
        let queued = self.enqueue(Task::Disconnect { reply });

        async move {
            queued?;
            rx.await.map_err(|_| ClientError::Closed)
        }
    }

    /// Queue a request and return its pending response.
    ///
    /// Several requests may be submitted before any is awaited; they are
    /// written in submission order.
    pub fn submit(&self, request: Request) -> ClientResult<Reply> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Task::Send { request, reply })?;
        Ok(Reply { rx })
    }

    /// Send a request and wait for its response.
    ///
    /// `Ok(None)` means no response: the connection was not ready or the
    /// session ended first.
    pub async fn send(&self, request: Request) -> ClientResult<Option<Message>> {
        Ok(self.submit(request)?.await)
    }

    /// Disconnect and stop the worker. Every later operation fails with
    /// [`ClientError::Closed`].
    pub async fn close(&self) -> ClientResult<()> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Task::Close { reply })?;
        self.inner.closed.store(true, Ordering::SeqCst);
        let _ = rx.await;
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.core.state()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Whether a `login` succeeded in this session without a later `logout`
    pub fn is_logged_in(&self) -> bool {
        self.inner.core.is_logged_in()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.core.addrs().map(|(local, _)| local)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.core.addrs().map(|(_, peer)| peer)
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.core.subscribe()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    fn enqueue(&self, task: Task) -> ClientResult<()> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        self.inner.tasks.send(task).map_err(|_| ClientError::Closed)
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(ConnectionConfig::default())
    }
}

/// One TCP session, owned by the worker
struct Session {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
    generation: u64,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

struct Worker {
    tasks: mpsc::UnboundedReceiver<Task>,
    core: Arc<Core>,
    config: ConnectionConfig,
    throttle: Option<Throttle>,
    session: Option<Session>,
}

impl Worker {
    async fn run(mut self) {
        while let Some(task) = self.tasks.recv().await {
            match task {
                Task::Connect { endpoint, reply } => {
                    let result = self.connect(&endpoint).await;
                    let _ = reply.send(result);
                }
                Task::Disconnect { reply } => {
                    self.disconnect().await;
                    let _ = reply.send(());
                }
                Task::Send { request, reply } => self.send(request, reply).await,
                Task::Close { reply } => {
                    self.disconnect().await;
                    // Anything queued behind Close is dropped, which fails
                    // its caller.
                    self.tasks.close();
                    while self.tasks.try_recv().is_ok() {}
                    debug!("Connection closed");
                    let _ = reply.send(());
                    return;
                }
            }
        }

        // Every handle was dropped.
        self.disconnect().await;
    }

    async fn connect(&mut self, endpoint: &str) -> ClientResult<()> {
        if self.core.state().is_ready() {
            return Ok(());
        }

        // A session the server already ended
        if let Some(stale) = self.session.take() {
            self.core.teardown(stale.generation);
        }

        self.core.set_state(ConnectionState::Connecting);
        info!(endpoint = %endpoint, "Connecting");

        let result = self.open(endpoint).await;
        if let Err(e) = &result {
            warn!(endpoint = %endpoint, error = %e, "Connect failed");
            self.session = None;
            self.core.set_state(ConnectionState::Disconnected);
        }
        result
    }

    async fn open(&mut self, endpoint: &str) -> ClientResult<()> {
        let deadline = Instant::now() + self.config.connect_timeout;
        let timed_out = || ClientError::ConnectTimeout {
            endpoint: endpoint.to_string(),
            timeout: self.config.connect_timeout,
        };

        let stream = timeout_at(deadline, TcpStream::connect(endpoint))
            .await
            .map_err(|_| timed_out())?
            .map_err(|source| ClientError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        stream.set_nodelay(true)?;
        let local = stream.local_addr()?;
        let peer = stream.peer_addr()?;
        let (read, writer) = stream.into_split();

        let generation = self.core.begin_session();
        let (greeted, greeting) = oneshot::channel();
        let reader = Reader {
            core: self.core.clone(),
            socket: read,
            parser: Parser::with_max_size(self.config.max_buffer_size),
            generation,
            greeted: Some(greeted),
            read_buffer_size: self.config.read_buffer_size,
        };

        // Dropping the session on any failure below aborts the reader.
        let session = Session {
            writer,
            reader: tokio::spawn(reader.run()),
            generation,
        };

        match timeout_at(deadline, greeting).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                return Err(ClientError::Handshake {
                    endpoint: endpoint.to_string(),
                })
            }
            Err(_) => return Err(timed_out()),
        }

        if !self.core.session_ready(generation, local, peer) {
            return Err(ClientError::Handshake {
                endpoint: endpoint.to_string(),
            });
        }

        if let Some(throttle) = &self.throttle {
            throttle.reset();
        }
        self.session = Some(session);
        info!(endpoint = %endpoint, local = %local, peer = %peer, "Connected");
        Ok(())
    }

    async fn send(&mut self, request: Request, reply: oneshot::Sender<Option<Message>>) {
        if !self.core.state().is_ready() {
            debug!(command = %request.command(), "Not connected, dropping request");
            let _ = reply.send(None);
            return;
        }

        if self.config.parallel_requests {
            self.write(&request, reply, ConnectionState::Ready).await;
        } else {
            let (slot, response) = oneshot::channel();
            let message = if self.write(&request, slot, ConnectionState::Ready).await {
                response.await.ok().flatten()
            } else {
                None
            };
            let _ = reply.send(message);
        }
    }

    /// Enroll `request` for pairing and write it to the socket.
    ///
    /// Returns false if it was never written; `reply` is then dropped, or
    /// released with `None` once the failed session is torn down.
    async fn write(
        &mut self,
        request: &Request,
        reply: oneshot::Sender<Option<Message>>,
        expected: ConnectionState,
    ) -> bool {
        if let Some(throttle) = &self.throttle {
            throttle.acquire().await;
        }

        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !self.core.enroll(request, reply, expected) {
            return false;
        }

        debug!(command = %request.command(), "Sending");
        if let Err(e) = session.writer.write_all(&request.encode()).await {
            error!(command = %request.command(), error = %e, "Write error");
            let generation = session.generation;
            self.session = None;
            self.core.teardown(generation);
            return false;
        }
        true
    }

    async fn disconnect(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let generation = session.generation;

        if self.core.begin_disconnect(generation) {
            info!("Disconnecting");
            if self.core.is_logged_in() {
                self.exchange(Request::logout()).await;
            }
            self.exchange(Request::quit()).await;

            if let Some(session) = self.session.as_mut() {
                let _ = session.writer.shutdown().await;
                if timeout(self.config.connect_timeout, &mut session.reader)
                    .await
                    .is_err()
                {
                    warn!("Receive loop did not finish in time");
                }
            }
        }

        self.session = None;
        self.core.teardown(generation);
    }

    /// Send a request while disconnecting and wait, bounded by the connect
    /// timeout, for its response.
    async fn exchange(&mut self, request: Request) -> Option<Message> {
        let (slot, response) = oneshot::channel();
        if !self.write(&request, slot, ConnectionState::Disconnecting).await {
            return None;
        }
        timeout(self.config.connect_timeout, response)
            .await
            .ok()?
            .ok()
            .flatten()
    }
}
