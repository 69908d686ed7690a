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

//! Connection configuration.

use crate::serialization::MAX_FRAME_SIZE;
use crate::transport::strategy::{
    DEFAULT_RETRY_INTERVAL, FixedDelay, NoReconnect, ReconnectionStrategy,
};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Which side of the TCP handshake a connection was created on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionRole {
    /// This side dialed the peer.
    Initiator,
    /// A listener accepted the socket.
    Accepted,
}

impl ConnectionRole {
    /// Lowercase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionRole::Initiator => "initiator",
            ConnectionRole::Accepted => "accepted",
        }
    }
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables of a single connection.
///
/// # Examples
///
/// ```rust
/// use nestrpc::transport::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::initiator()
///     .with_retry_interval(Duration::from_millis(250))
///     .with_default_call_timeout(Some(Duration::from_secs(5)));
/// assert!(config.auto_reconnect());
/// assert!(!config.auto_execute());
///
/// let accepted = ConnectionConfig::accepted();
/// assert!(accepted.auto_execute());
/// assert!(!accepted.auto_reconnect());
/// ```
#[derive(Clone)]
pub struct ConnectionConfig {
    retry_interval: Duration,
    auto_reconnect: bool,
    auto_execute: bool,
    max_workers: usize,
    read_chunk_size: usize,
    send_connect_timeout: Duration,
    default_call_timeout: Option<Duration>,
    max_frame_size: u32,
    reconnection_strategy: Option<Arc<dyn ReconnectionStrategy>>,
}

impl ConnectionConfig {
    /// Defaults for a connection that dials its peer.
    #[must_use]
    pub fn initiator() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            auto_reconnect: true,
            auto_execute: false,
            max_workers: 8,
            read_chunk_size: 1024,
            send_connect_timeout: Duration::from_secs(2),
            default_call_timeout: None,
            max_frame_size: MAX_FRAME_SIZE,
            reconnection_strategy: None,
        }
    }

    /// Defaults for a connection created by a listener.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            auto_reconnect: false,
            auto_execute: true,
            ..Self::initiator()
        }
    }

    /// Defaults for `role`.
    #[must_use]
    pub fn for_role(role: ConnectionRole) -> Self {
        match role {
            ConnectionRole::Initiator => Self::initiator(),
            ConnectionRole::Accepted => Self::accepted(),
        }
    }

    /// Sets the delay between connect attempts.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Enables or disables reconnecting after a lost connection.
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Enables or disables running inbound calls on the worker pool.
    ///
    /// With auto-execution off, inbound calls queue until a caller blocked
    /// on a result or [`serve_one`](crate::rpc::RpcProxy::serve_one) takes them.
    #[must_use]
    pub fn with_auto_execute(mut self, enabled: bool) -> Self {
        self.auto_execute = enabled;
        self
    }

    /// Sets the worker pool size. Clamped to at least one.
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers.max(1);
        self
    }

    /// Sets the socket read size. Clamped to at least one byte.
    #[must_use]
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Sets how long a send waits for a connection that is being established.
    #[must_use]
    pub fn with_send_connect_timeout(mut self, timeout: Duration) -> Self {
        self.send_connect_timeout = timeout;
        self
    }

    /// Sets the timeout used by calls that do not pass one.
    #[must_use]
    pub fn with_default_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_call_timeout = timeout;
        self
    }

    /// Sets the largest accepted payload.
    #[must_use]
    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Overrides the strategy derived from `retry_interval` and `auto_reconnect`.
    #[must_use]
    pub fn with_reconnection_strategy(mut self, strategy: Arc<dyn ReconnectionStrategy>) -> Self {
        self.reconnection_strategy = Some(strategy);
        self
    }

    /// Delay between connect attempts.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    /// Whether a lost connection is dialed again.
    #[must_use]
    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    /// Whether inbound calls run on the worker pool.
    #[must_use]
    pub fn auto_execute(&self) -> bool {
        self.auto_execute
    }

    /// Worker pool size.
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Socket read size.
    #[must_use]
    pub fn read_chunk_size(&self) -> usize {
        self.read_chunk_size
    }

    /// How long a send waits for the connection.
    #[must_use]
    pub fn send_connect_timeout(&self) -> Duration {
        self.send_connect_timeout
    }

    /// Timeout for calls that do not pass one; `None` waits forever.
    #[must_use]
    pub fn default_call_timeout(&self) -> Option<Duration> {
        self.default_call_timeout
    }

    /// Largest accepted payload.
    #[must_use]
    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    /// The strategy the reader uses after a lost connection.
    pub fn reconnection_strategy(&self) -> Arc<dyn ReconnectionStrategy> {
        match &self.reconnection_strategy {
            Some(strategy) => Arc::clone(strategy),
            None if self.auto_reconnect => Arc::new(FixedDelay::new(self.retry_interval)),
            None => Arc::new(NoReconnect::new()),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::initiator()
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("retry_interval", &self.retry_interval)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("auto_execute", &self.auto_execute)
            .field("max_workers", &self.max_workers)
            .field("read_chunk_size", &self.read_chunk_size)
            .field("send_connect_timeout", &self.send_connect_timeout)
            .field("default_call_timeout", &self.default_call_timeout)
            .field("max_frame_size", &self.max_frame_size)
            .field(
                "reconnection_strategy",
                &self.reconnection_strategy.as_ref().map(|s| s.name()),
            )
            .finish()
    }
}
