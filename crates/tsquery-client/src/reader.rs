//! Receive loop: one per session

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};
use tsquery_protocol::{Parser, Unit};

use crate::shared::Core;

pub(crate) struct Reader {
    pub(crate) core: Arc<Core>,
    pub(crate) socket: OwnedReadHalf,
    pub(crate) parser: Parser,
    pub(crate) generation: u64,
    /// Fired once both greeting lines have been read
    pub(crate) greeted: Option<oneshot::Sender<()>>,
    pub(crate) read_buffer_size: usize,
}

impl Reader {
    pub(crate) async fn run(mut self) {
        let mut buf = vec![0u8; self.read_buffer_size];

        loop {
            match self.socket.read(&mut buf).await {
                Ok(0) => {
                    let leftover = self.parser.buffered();
                    match self.parser.finish() {
                        Some(Unit::Banned(message)) => self.core.ban(message),
                        _ if leftover > 0 => warn!(bytes = leftover, "Discarding incomplete data"),
                        _ => {}
                    }
                    debug!("Server closed the connection");
                    break;
                }
                Ok(n) => {
                    trace!(bytes = n, "Read");
                    if let Err(e) = self.parser.feed(&buf[..n]) {
                        error!(error = %e, "Receive buffer overflow");
                        break;
                    }
                    if self.drain().is_break() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Read error");
                    break;
                }
            }
        }

        self.core.teardown(self.generation);
    }

    /// Dispatch every complete unit in the buffer.
    fn drain(&mut self) -> ControlFlow<()> {
        loop {
            match self.parser.next_unit() {
                Ok(Some(Unit::GreetingHeader)) => {}
                Ok(Some(Unit::GreetingBanner)) => {
                    if let Some(greeted) = self.greeted.take() {
                        let _ = greeted.send(());
                    }
                }
                Ok(Some(Unit::Notification(notification))) => self.core.notify(notification),
                Ok(Some(Unit::Message(message))) => self.core.pair(message),
                Ok(Some(Unit::Banned(message))) => {
                    self.core.ban(message);
                    return ControlFlow::Break(());
                }
                Ok(None) => return ControlFlow::Continue(()),
                Err(e) => {
                    error!(error = %e, "Failed to parse server output");
                    return ControlFlow::Break(());
                }
            }
        }
    }
}
