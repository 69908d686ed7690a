//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Reconnection strategies for initiating connections.
//!
//! When an established connection drops, the reader thread asks the
//! connection's strategy whether to dial again and how long to wait between
//! attempts.
//!
//! # Available Strategies
//!
//! - [`FixedDelay`]: constant delay between attempts, optionally bounded
//! - [`NoReconnect`]: never dials again
//!
//! # Examples
//!
//! ```rust
//! use nestrpc::transport::strategy::{FixedDelay, ReconnectionStrategy};
//! use std::time::Duration;
//!
//! let strategy = FixedDelay::builder()
//!     .delay(Duration::from_millis(500))
//!     .max_attempts(Some(10))
//!     .build();
//! assert_eq!(strategy.next_delay(3), Duration::from_millis(500));
//! ```

mod fixed;
mod no_reconnect;

pub use fixed::{DEFAULT_RETRY_INTERVAL, FixedDelay, FixedDelayBuilder};
pub use no_reconnect::NoReconnect;

use crate::transport::TransportError;
use std::fmt;
use std::time::Duration;

/// Decides whether and when a dropped connection is dialed again.
///
/// Implementations are shared between the connection and its reader thread,
/// so they keep their own state behind interior mutability.
pub trait ReconnectionStrategy: Send + Sync + fmt::Debug {
    /// Returns `true` if attempt number `attempt` (0-indexed) should be made.
    fn should_reconnect(&self, attempt: u32, last_error: &TransportError) -> bool;

    /// Delay before attempt number `attempt + 1`.
    fn next_delay(&self, attempt: u32) -> Duration;

    /// Called after a successful connect.
    fn on_connected(&self);

    /// Called after a failed connect or a lost connection.
    fn on_disconnected(&self, error: &TransportError);

    /// Clears internal state.
    fn reset(&self);

    /// Strategy name for logs.
    fn name(&self) -> &str;
}

/// Counters kept by the bundled strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconnectionMetrics {
    /// Successful connects.
    pub successful_connects: u64,
    /// Failed connects and lost connections.
    pub failures: u64,
    /// Failures since the last successful connect.
    pub consecutive_failures: u32,
    /// Text of the most recent failure.
    pub last_error: Option<String>,
}

impl ReconnectionMetrics {
    /// Creates zeroed metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful connect.
    pub fn record_success(&mut self) {
        self.successful_connects += 1;
        self.consecutive_failures = 0;
        self.last_error = None;
    }

    /// Records a failure.
    pub fn record_failure(&mut self, error: &TransportError) {
        self.failures += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_error = Some(error.to_string());
    }

    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record() {
        let mut metrics = ReconnectionMetrics::new();
        metrics.record_failure(&TransportError::NotConnected);
        metrics.record_failure(&TransportError::NotConnected);
        assert_eq!(metrics.consecutive_failures, 2);
        assert_eq!(
            metrics.last_error.as_deref(),
            Some("connection is not connected")
        );

        metrics.record_success();
        assert_eq!(metrics.consecutive_failures, 0);
        assert_eq!(metrics.failures, 2);
        assert_eq!(metrics.successful_connects, 1);
        assert!(metrics.last_error.is_none());

        metrics.reset();
        assert_eq!(metrics, ReconnectionMetrics::default());
    }
}
