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

//! Connection lifecycle state.

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::time::{Duration, Instant};

/// Lifecycle of a connection.
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Closing -> Closed
///                     ^             |
///                     +-------------+  (lost, reconnecting)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket and no attempt in progress.
    Disconnected,
    /// Dialing the peer.
    Connecting,
    /// The socket is open.
    Connected,
    /// `stop()` is tearing the connection down.
    Closing,
    /// Stopped for good.
    Closed,
}

impl ConnectionState {
    /// Returns `true` once `stop()` has begun.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Closing => write!(f, "Closing"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// A [`ConnectionState`] threads can block on.
#[derive(Debug)]
pub(crate) struct StateCell {
    state: Mutex<ConnectionState>,
    changed: Condvar,
}

impl StateCell {
    pub(crate) fn new(initial: ConnectionState) -> Self {
        Self {
            state: Mutex::new(initial),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Moves to `next` unless the connection is already closing or closed.
    ///
    /// Returns `false` when the transition was refused.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.lock();
        if state.is_terminal() && !next.is_terminal() {
            return false;
        }
        if *state != next {
            tracing::trace!(from = %*state, to = %next, "Connection state change");
            *state = next;
            self.changed.notify_all();
        }
        true
    }

    /// Blocks until `done` holds or `timeout` elapses, returning the last state seen.
    pub(crate) fn wait_until(
        &self,
        timeout: Option<Duration>,
        done: impl Fn(ConnectionState) -> bool,
    ) -> ConnectionState {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        while !done(*state) {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }
        *state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_terminal_states_stick() {
        let cell = StateCell::new(ConnectionState::Connected);
        assert!(cell.transition(ConnectionState::Closing));
        assert!(!cell.transition(ConnectionState::Connected));
        assert!(cell.transition(ConnectionState::Closed));
        assert_eq!(cell.get(), ConnectionState::Closed);
    }

    #[test]
    fn test_wait_until_wakes() {
        let cell = Arc::new(StateCell::new(ConnectionState::Connecting));
        let waiter = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || {
                cell.wait_until(Some(Duration::from_secs(5)), |s| {
                    s == ConnectionState::Connected
                })
            })
        };
        thread::sleep(Duration::from_millis(20));
        cell.transition(ConnectionState::Connected);
        assert_eq!(waiter.join().unwrap(), ConnectionState::Connected);
    }

    #[test]
    fn test_wait_until_times_out() {
        let cell = StateCell::new(ConnectionState::Connecting);
        let state = cell.wait_until(Some(Duration::from_millis(20)), |s| {
            s == ConnectionState::Connected
        });
        assert_eq!(state, ConnectionState::Connecting);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Closing.to_string(), "Closing");
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
    }
}
