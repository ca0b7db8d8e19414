//! Connection configuration

use std::time::Duration;

use tsquery_protocol::parser::MAX_BUFFER_SIZE;

use crate::throttle::ThrottleConfig;

/// Settings for a [`Connection`](crate::Connection)
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound for TCP connect plus greeting, and for the orderly
    /// shutdown in `disconnect`
    pub connect_timeout: Duration,
    /// Keep writing queued commands without waiting for each response
    pub parallel_requests: bool,
    /// Size of a single socket read
    pub read_buffer_size: usize,
    /// Cap on received bytes that do not yet form a complete unit
    pub max_buffer_size: usize,
    /// Events a slow subscriber may fall behind before it lags
    pub event_capacity: usize,
    /// Client-side command rate limit
    pub throttle: Option<ThrottleConfig>,
}

impl ConnectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_parallel_requests(mut self, parallel: bool) -> Self {
        self.parallel_requests = parallel;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    pub fn with_max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = Some(throttle);
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            parallel_requests: false,
            read_buffer_size: 8192,
            max_buffer_size: MAX_BUFFER_SIZE,
            event_capacity: 1024,
            throttle: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(!config.parallel_requests);
        assert!(config.throttle.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ConnectionConfig::new()
            .with_connect_timeout(Duration::from_millis(250))
            .with_parallel_requests(true)
            .with_event_capacity(0)
            .with_throttle(ThrottleConfig::server_default());
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert!(config.parallel_requests);
        assert_eq!(config.event_capacity, 1);
        assert_eq!(config.throttle.map(|t| t.commands), Some(10));
    }
}
