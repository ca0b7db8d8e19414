//! ServerQuery protocol
//!
//! The line-oriented text protocol spoken by a TeamSpeak 3 server on its
//! query port (10011 by default).
//!
//! ## Request Format
//! ```text
//! <command> [<key>=<value> ...] [-<option> ...]\n
//! ```
//!
//! ## Server Output
//! ```text
//! TS3\n\r                                   # Greeting header
//! Welcome to the TeamSpeak 3 ...\n\r        # Greeting banner
//! notify<event> <key>=<value> ...\n\r       # Notification
//! <data line>\n\r ... error id=<n> msg=..\n\r  # Message
//! ```
//!
//! Keys and values are escaped with [`escape`] and read back with
//! [`unescape`]; a data line holds `|`-separated groups of space-separated
//! pairs.

pub mod error;
pub mod escape;
pub mod parser;
pub mod request;
pub mod response;

pub use error::{ProtocolError, ProtocolResult};
pub use escape::{escape, unescape};
pub use parser::{Parser, Unit};
pub use request::{KickReason, Request, TextMessageTarget};
pub use response::{Group, Message, Notification, Pair, Section};

/// Default ServerQuery TCP port
pub const DEFAULT_PORT: u16 = 10011;
