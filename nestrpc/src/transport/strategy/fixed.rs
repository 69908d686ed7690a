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

//! Fixed delay reconnection strategy.

use super::{ReconnectionMetrics, ReconnectionStrategy};
use crate::transport::TransportError;
use parking_lot::Mutex;
use std::time::Duration;

/// Default delay between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Waits the same amount of time before every attempt.
///
/// # Examples
///
/// ```
/// use nestrpc::transport::strategy::FixedDelay;
/// use std::time::Duration;
///
/// let strategy = FixedDelay::new(Duration::from_secs(2));
/// assert_eq!(strategy.delay(), Duration::from_secs(2));
/// ```
#[derive(Debug)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
    metrics: Mutex<ReconnectionMetrics>,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_INTERVAL)
    }
}

impl FixedDelay {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> FixedDelayBuilder {
        FixedDelayBuilder::default()
    }

    /// Creates an unbounded strategy with the given delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
            metrics: Mutex::new(ReconnectionMetrics::new()),
        }
    }

    /// Delay between attempts.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Snapshot of the metrics.
    pub fn metrics(&self) -> ReconnectionMetrics {
        self.metrics.lock().clone()
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn should_reconnect(&self, attempt: u32, last_error: &TransportError) -> bool {
        if matches!(last_error, TransportError::Closed) {
            return false;
        }
        self.max_attempts.is_none_or(|max| attempt < max)
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn on_connected(&self) {
        self.metrics.lock().record_success();
    }

    fn on_disconnected(&self, error: &TransportError) {
        self.metrics.lock().record_failure(error);
    }

    fn reset(&self) {
        self.metrics.lock().reset();
    }

    fn name(&self) -> &str {
        "FixedDelay"
    }
}

/// Builder for [`FixedDelay`].
#[derive(Debug)]
pub struct FixedDelayBuilder {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl Default for FixedDelayBuilder {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_INTERVAL,
            max_attempts: None,
        }
    }
}

impl FixedDelayBuilder {
    /// Sets the delay between attempts.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the attempt limit; `None` retries forever.
    #[must_use]
    pub fn max_attempts(mut self, max: Option<u32>) -> Self {
        self.max_attempts = max;
        self
    }

    /// Builds the strategy.
    #[must_use]
    pub fn build(self) -> FixedDelay {
        FixedDelay {
            delay: self.delay,
            max_attempts: self.max_attempts,
            metrics: Mutex::new(ReconnectionMetrics::new()),
        }
    }
}
