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

//! Tracking of outbound calls awaiting their results.
//!
//! Each waiting caller registers its call id and gets a receiver. The reader
//! thread completes the registration when the matching result arrives.
//! Dropping a registration's sender wakes the waiter with a disconnect, which
//! is how a lost connection fails every outstanding call at once.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Outbound calls awaiting a result, keyed by call id.
///
/// # Example
///
/// ```rust
/// use nestrpc::correlation::PendingResults;
///
/// let pending = PendingResults::<String>::new();
/// let rx = pending.register(42);
/// assert!(pending.complete(42, "response".to_string()));
/// assert_eq!(rx.recv().unwrap(), "response");
/// ```
#[derive(Debug)]
pub struct PendingResults<T> {
    waiters: Mutex<HashMap<u64, Sender<T>>>,
}

impl<T> PendingResults<T> {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a waiter for `call_id`.
    ///
    /// A second registration for the same id replaces the first, whose
    /// receiver then reports a disconnect.
    pub fn register(&self, call_id: u64) -> Receiver<T> {
        let (tx, rx) = channel::bounded(1);
        self.waiters.lock().insert(call_id, tx);
        rx
    }

    /// Hands `value` to the waiter for `call_id`.
    ///
    /// Returns `false` if nobody is waiting for that id any more.
    pub fn complete(&self, call_id: u64, value: T) -> bool {
        match self.waiters.lock().remove(&call_id) {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Removes the waiter for `call_id` without completing it.
    pub fn cancel(&self, call_id: u64) -> bool {
        self.waiters.lock().remove(&call_id).is_some()
    }

    /// Returns `true` if a waiter is registered for `call_id`.
    pub fn contains(&self, call_id: u64) -> bool {
        self.waiters.lock().contains_key(&call_id)
    }

    /// Disconnects every waiter and returns how many there were.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = self.waiters.lock().drain().collect();
        drained.len()
    }

    /// Number of registered waiters.
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Returns `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}

impl<T> Default for PendingResults<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_register_and_complete() {
        let pending = PendingResults::<String>::new();
        let rx = pending.register(42);
        assert_eq!(pending.len(), 1);

        assert!(pending.complete(42, "response".to_string()));
        assert_eq!(rx.recv().unwrap(), "response");
        assert!(pending.is_empty());
    }

    #[test]
    fn test_complete_nonexistent() {
        let pending = PendingResults::<String>::new();
        assert!(!pending.complete(99, "response".to_string()));
    }

    #[test]
    fn test_cancel() {
        let pending = PendingResults::<u32>::new();
        let rx = pending.register(42);
        assert!(pending.cancel(42));
        assert!(rx.recv().is_err());
        assert!(!pending.cancel(42));
    }

    #[test]
    fn test_fail_all_wakes_waiters() {
        let pending = std::sync::Arc::new(PendingResults::<u32>::new());
        let rx1 = pending.register(1);
        let rx2 = pending.register(2);

        let waiter = thread::spawn(move || rx1.recv().is_err());
        assert_eq!(pending.fail_all(), 2);
        assert!(waiter.join().unwrap());
        assert!(rx2.recv().is_err());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_out_of_order_completion() {
        let pending = PendingResults::<&'static str>::new();
        let rx1 = pending.register(1);
        let rx2 = pending.register(2);
        assert!(pending.contains(2));

        pending.complete(2, "two");
        pending.complete(1, "one");
        assert_eq!(rx1.recv().unwrap(), "one");
        assert_eq!(rx2.recv().unwrap(), "two");
    }
}
