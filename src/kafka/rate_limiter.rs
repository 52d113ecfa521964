//! Subscriber rate limiting
//!
//! Caps how many messages one subscriber delivers per fixed time window,
//! independent of any broker-side flow control.
//!
//! # Behavior
//!
//! - The first `max_messages` consumes in a window succeed
//! - Further consumes fail until the window ends
//! - Window rollover is evaluated lazily on the next consume; the new window
//!   starts at that instant, not on a timer
//!
//! Fixed windows allow up to `2 × max_messages` in a short span straddling a
//! boundary.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RateLimitConfig;

/// Mutable state of one fixed window
#[derive(Debug, Clone)]
pub struct RateWindow {
    /// Consumes allowed per window
    max_messages: u32,
    /// Window length
    interval: Duration,
    /// Consumes taken in the current window
    consumed: u32,
    /// Start of the current window
    window_start: Instant,
}

impl RateWindow {
    pub fn new(max_messages: u32, interval: Duration) -> Self {
        Self::starting_at(max_messages, interval, Instant::now())
    }

    fn starting_at(max_messages: u32, interval: Duration, now: Instant) -> Self {
        Self {
            max_messages,
            interval,
            consumed: 0,
            window_start: now,
        }
    }

    fn try_consume_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= self.interval {
            self.window_start = now;
            self.consumed = 0;
        }

        if self.consumed >= self.max_messages {
            return false;
        }

        self.consumed += 1;
        if self.consumed == self.max_messages {
            debug!(
                max_messages = self.max_messages,
                interval_ms = self.interval.as_millis() as u64,
                "Rate limit reached for current window"
            );
        }
        true
    }

    /// Whether the current window is exhausted (as of its last consume)
    pub fn is_closed(&self) -> bool {
        self.consumed >= self.max_messages
    }
}

/// Delivery gate owned by exactly one subscriber
#[derive(Debug, Clone)]
pub enum RateLimiter {
    /// Every consume succeeds; no bookkeeping
    Unlimited,
    /// Fixed-window limit
    Windowed(RateWindow),
}

impl RateLimiter {
    /// Build a limiter from subscriber settings
    pub fn from_config(config: &RateLimitConfig) -> Self {
        if config.enable {
            RateLimiter::Windowed(RateWindow::new(config.max_messages, config.interval))
        } else {
            RateLimiter::Unlimited
        }
    }

    /// Take one delivery slot; `false` means the caller must withhold delivery
    pub fn try_consume(&mut self) -> bool {
        self.try_consume_at(Instant::now())
    }

    fn try_consume_at(&mut self, now: Instant) -> bool {
        match self {
            RateLimiter::Unlimited => true,
            RateLimiter::Windowed(window) => window.try_consume_at(now),
        }
    }

    pub fn is_limited(&self) -> bool {
        matches!(self, RateLimiter::Windowed(_))
    }
}
