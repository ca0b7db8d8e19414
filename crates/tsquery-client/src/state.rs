//! Connection lifecycle states

use std::fmt;

/// ```text
/// Disconnected -> Connecting -> Handshaking -> Ready -> Disconnecting -> Disconnected
///                                              Ready -> Banned -> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    Disconnecting,
    Banned,
}

impl ConnectionState {
    pub fn is_ready(self) -> bool {
        self == ConnectionState::Ready
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Handshaking => "handshaking",
            ConnectionState::Ready => "ready",
            ConnectionState::Disconnecting => "disconnecting",
            ConnectionState::Banned => "banned",
        };
        f.write_str(name)
    }
}
