//! Typed views over ServerQuery responses
//!
//! Each entity is a flat struct of optional fields filled from one
//! [`Group`]. Fields the server did not send stay `None`, so the same type
//! serves both the short `*list` output and the long `*info` output.
//!
//! ```ignore
//! let message = connection.send(Request::clientlist()).await?;
//! for client in message.iter().flat_map(Client::from_message) {
//!     println!("{:?}", client.nickname);
//! }
//! ```

pub mod channel;
pub mod client;
pub mod enums;
pub mod server;

pub use channel::Channel;
pub use client::Client;
pub use enums::{ClientType, CodecType, HostMessageMode};
pub use server::VirtualServer;

use tsquery_protocol::{Group, Message};

/// Build an entity from one response group
pub trait FromGroup: Sized {
    fn from_group(group: &Group) -> Self;

    /// Every group of a successful message; empty for an error reply.
    fn from_message(message: &Message) -> Vec<Self> {
        if !message.is_ok() {
            return Vec::new();
        }
        message.groups().map(Self::from_group).collect()
    }
}

/// `Some(true)` for `"1"`, `Some(false)` for any other value
pub(crate) fn flag(group: &Group, key: &str) -> Option<bool> {
    group.get(key).map(|v| v == "1")
}

pub(crate) fn text(group: &Group, key: &str) -> Option<String> {
    group.get(key).map(str::to_string)
}
