//! Protocol error types

use thiserror::Error;

/// Protocol-specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Command name must not be empty")]
    EmptyCommand,

    #[error("Invalid command name '{0}': whitespace and control characters are not allowed")]
    InvalidCommand(String),

    #[error("Parameter key must not be empty")]
    EmptyKey,

    #[error("Value of parameter '{key}' must not be empty")]
    EmptyValue { key: String },

    #[error("Option must not be empty")]
    EmptyOption,

    #[error("Message too large: {size} > {max}")]
    MessageTooLarge { size: usize, max: usize },
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
