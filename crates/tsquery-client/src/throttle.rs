//! Command throttling using a token bucket
//!
//! The server bans query clients that send too many commands too quickly
//! (error 3331). With a throttle configured, the connection waits for a
//! token before writing each command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// One whole token in scaled units
const SCALE: u64 = 1000;

/// Throttle configuration
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Commands allowed per window, also the burst size
    pub commands: u32,
    /// Length of the window
    pub per: Duration,
}

impl ThrottleConfig {
    pub fn new(commands: u32, per: Duration) -> Self {
        Self {
            commands: commands.max(1),
            per,
        }
    }

    /// The server's stock flood limit: 10 commands every 3 seconds
    pub fn server_default() -> Self {
        Self::new(10, Duration::from_secs(3))
    }
}

/// Token bucket throttle
pub struct Throttle {
    /// Current tokens (scaled by 1000 for precision)
    tokens: AtomicU64,
    last_refill: Mutex<Instant>,
    config: ThrottleConfig,
    max_tokens: u64,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        let max_tokens = config.commands as u64 * SCALE;

        Self {
            tokens: AtomicU64::new(max_tokens),
            last_refill: Mutex::new(Instant::now()),
            config,
            max_tokens,
        }
    }

    /// Take a token if one is available.
    pub fn try_acquire(&self) -> bool {
        self.refill();

        loop {
            let current = self.tokens.load(Ordering::Relaxed);
            if current < SCALE {
                return false;
            }

            match self.tokens.compare_exchange_weak(
                current,
                current - SCALE,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(_) => continue,
            }
        }
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        while !self.try_acquire() {
            tokio::time::sleep(self.time_to_next_token()).await;
        }
    }

    /// How long until one whole token has refilled
    pub fn time_to_next_token(&self) -> Duration {
        let current = self.tokens.load(Ordering::Relaxed);
        if current >= SCALE {
            return Duration::ZERO;
        }

        let missing = SCALE - current;
        let per_ms = self.config.per.as_millis().max(1) as u64;
        let rate = self.config.commands as u64 * SCALE;
        let ms = (missing * per_ms + rate - 1) / rate;
        Duration::from_millis(ms.max(1))
    }

    fn refill(&self) {
        let mut last = self.last_refill.lock();
        let per = self.config.per.as_nanos().max(1);
        let rate = self.config.commands as u128 * SCALE as u128;
        let new_tokens = last.elapsed().as_nanos() * rate / per;
        if new_tokens == 0 {
            return;
        }

        let current = self.tokens.load(Ordering::Relaxed);
        let filled = current as u128 + new_tokens;
        if filled >= self.max_tokens as u128 {
            self.tokens.store(self.max_tokens, Ordering::Relaxed);
            *last = Instant::now();
        } else {
            self.tokens.store(filled as u64, Ordering::Relaxed);
            // Keep the remainder of the elapsed time for the next refill.
            let spent = (new_tokens * per + rate - 1) / rate;
            *last += Duration::from_nanos(spent as u64);
        }
    }

    /// Whole tokens currently available
    pub fn available(&self) -> u32 {
        self.refill();
        (self.tokens.load(Ordering::Relaxed) / SCALE) as u32
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Refill the bucket, e.g. for a fresh session
    pub fn reset(&self) {
        self.tokens.store(self.max_tokens, Ordering::Relaxed);
        *self.last_refill.lock() = Instant::now();
    }
}
