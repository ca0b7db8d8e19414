//! ServerQuery connection engine
//!
//! - [`Connection`]: clonable handle; connect, send, disconnect, close
//! - [`Event`]: broadcast stream of lifecycle, traffic and notifications
//! - [`ConnectionConfig`]: timeouts, parallel requests, throttling
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use tsquery_client::{Connection, ConnectionConfig};
//! use tsquery_protocol::Request;
//!
//! let connection = Connection::new(ConnectionConfig::default());
//! connection.connect("127.0.0.1:10011").await?;
//! if let Some(message) = connection.send(Request::version()).await? {
//!     println!("{:?}", message.group().and_then(|g| g.get("version")));
//! }
//! connection.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
mod reader;
mod shared;
pub mod state;
pub mod throttle;

pub use config::ConnectionConfig;
pub use connection::{Connection, Reply};
pub use error::{ClientError, ClientResult};
pub use event::Event;
pub use state::ConnectionState;
pub use throttle::{Throttle, ThrottleConfig};
