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

//! Strategy that never dials again.

use super::{ReconnectionMetrics, ReconnectionStrategy};
use crate::transport::TransportError;
use parking_lot::Mutex;
use std::time::Duration;

/// Gives up as soon as a connection is lost.
///
/// Used for accepted connections, which have no address to dial back, and
/// for initiators with reconnecting disabled.
#[derive(Debug, Default)]
pub struct NoReconnect {
    metrics: Mutex<ReconnectionMetrics>,
}

impl NoReconnect {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the metrics.
    pub fn metrics(&self) -> ReconnectionMetrics {
        self.metrics.lock().clone()
    }
}

impl ReconnectionStrategy for NoReconnect {
    fn should_reconnect(&self, _attempt: u32, _last_error: &TransportError) -> bool {
        false
    }

    fn next_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
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
        "NoReconnect"
    }
}
