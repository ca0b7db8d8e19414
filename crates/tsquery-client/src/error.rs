//! Client error types

use std::io;
use std::time::Duration;

use thiserror::Error;
use tsquery_protocol::ProtocolError;

/// Errors returned by [`Connection`](crate::Connection) operations
///
/// Command failures reported by the server are not errors here; they arrive
/// as a [`Message`](tsquery_protocol::Message) with a non-zero id.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Timed out connecting to {endpoint} after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    #[error("Connection to {endpoint} ended before the greeting completed")]
    Handshake { endpoint: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Connection is closed")]
    Closed,
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
