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

//! Per-connection call correlation.
//!
//! Both peers of a connection keep the calls that are currently open on it
//! as a stack. A call handler may open and close further calls before its own
//! result goes out, so open calls nest like an ordinary call stack and the
//! most recently opened one is always the next to close.
//!
//! The tracker also numbers every packet a side sends (`seq_id`) and checks
//! that the peer's packets arrive with consecutive numbers.
//!
//! # Example
//!
//! ```rust
//! use nestrpc::correlation::CorrelationTracker;
//!
//! let mut tracker = CorrelationTracker::new();
//! let a = tracker.on_send_call();
//! let b = tracker.on_send_call();
//! assert_eq!(tracker.on_send_result().unwrap().call_id, b.call_id);
//! assert_eq!(tracker.on_send_result().unwrap().call_id, a.call_id);
//! ```

use crate::correlation::CorrelationError;
use crate::serialization::{CorrelationId, Header};

/// Which side opened a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallDirection {
    /// This side sent the call and waits for its result.
    Outbound,
    /// The peer sent the call and this side owes the result.
    Inbound,
}

/// An entry on the open-call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenCall {
    /// Id the caller assigned.
    pub call_id: u64,
    /// Who opened it.
    pub direction: CallDirection,
}

/// Outcome of checking an incoming packet's sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// The packet carries the expected sequence number.
    InOrder,
    /// One or more packets were skipped.
    Gap {
        /// Sequence number that was expected.
        expected: u64,
        /// Sequence number received.
        received: u64,
    },
    /// The packet was already seen or is older than expected.
    Duplicate {
        /// Sequence number that was expected.
        expected: u64,
        /// Sequence number received.
        received: u64,
    },
}

impl SequenceCheck {
    /// Returns `true` if the packet should be processed.
    #[must_use]
    pub const fn is_in_order(&self) -> bool {
        matches!(self, SequenceCheck::InOrder)
    }
}

/// Call-id and sequence bookkeeping for one connection.
///
/// The tracker is not synchronized; a connection keeps it behind a mutex.
#[derive(Debug, Clone, Default)]
pub struct CorrelationTracker {
    open_calls: Vec<OpenCall>,
    next_call_id: u64,
    next_seq_id: u64,
    expected_incoming_seq: u64,
}

impl CorrelationTracker {
    /// Creates a tracker with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take_seq_id(&mut self) -> u64 {
        let seq_id = self.next_seq_id;
        self.next_seq_id += 1;
        seq_id
    }

    /// Assigns ids to an outgoing call and opens it.
    pub fn on_send_call(&mut self) -> CorrelationId {
        let call_id = self.next_call_id;
        self.next_call_id += 1;
        let seq_id = self.take_seq_id();
        self.open_calls.push(OpenCall {
            call_id,
            direction: CallDirection::Outbound,
        });
        CorrelationId::new(call_id, seq_id)
    }

    /// Closes the call on top of the stack and assigns ids to its result.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::NoOpenCall`] if no call is open.
    pub fn on_send_result(&mut self) -> Result<CorrelationId, CorrelationError> {
        let open = self.open_calls.pop().ok_or(CorrelationError::NoOpenCall)?;
        Ok(CorrelationId::new(open.call_id, self.take_seq_id()))
    }

    /// Closes the inbound call `call_id` and assigns ids to its result.
    ///
    /// With strictly nested calls the entry is on top of the stack and this is
    /// the same as [`on_send_result`](Self::on_send_result). Handlers running
    /// concurrently may finish in any order, so the nearest matching entry is
    /// removed wherever it sits.
    ///
    /// # Errors
    ///
    /// [`CorrelationError::UnknownCall`] if `call_id` is not an open inbound
    /// call.
    pub fn on_send_result_for(&mut self, call_id: u64) -> Result<CorrelationId, CorrelationError> {
        let index = self
            .find(call_id, CallDirection::Inbound)
            .ok_or(CorrelationError::UnknownCall { call_id })?;
        if index + 1 != self.open_calls.len() {
            tracing::debug!(
                call_id,
                depth = self.open_calls.len(),
                "Closing call below the top of the open-call stack"
            );
        }
        self.open_calls.remove(index);
        Ok(CorrelationId::new(call_id, self.take_seq_id()))
    }

    /// Checks the sequence number of an incoming packet.
    ///
    /// Only an in-order packet advances the expected sequence number, so a gap
    /// stays detectable when the missing packet never turns up.
    pub fn on_receive(&mut self, header: &Header) -> SequenceCheck {
        let expected = self.expected_incoming_seq;
        let received = header.seq_id;
        match received.cmp(&expected) {
            std::cmp::Ordering::Equal => {
                self.expected_incoming_seq += 1;
                SequenceCheck::InOrder
            }
            std::cmp::Ordering::Greater => SequenceCheck::Gap { expected, received },
            std::cmp::Ordering::Less => SequenceCheck::Duplicate { expected, received },
        }
    }

    /// Opens an inbound call that this side must answer.
    pub fn on_receive_call(&mut self, call_id: u64) {
        self.open_calls.push(OpenCall {
            call_id,
            direction: CallDirection::Inbound,
        });
    }

    /// Closes the outbound call a received result answers.
    ///
    /// Returns `false` if no such call is open, e.g. because its caller gave up.
    pub fn on_receive_result(&mut self, call_id: u64) -> bool {
        self.remove(call_id, CallDirection::Outbound)
    }

    /// Forgets an outbound call whose caller stopped waiting.
    pub fn abandon(&mut self, call_id: u64) -> bool {
        self.remove(call_id, CallDirection::Outbound)
    }

    /// Clears the stack and restarts every counter at zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn find(&self, call_id: u64, direction: CallDirection) -> Option<usize> {
        self.open_calls
            .iter()
            .rposition(|open| open.call_id == call_id && open.direction == direction)
    }

    fn remove(&mut self, call_id: u64, direction: CallDirection) -> bool {
        match self.find(call_id, direction) {
            Some(index) => {
                self.open_calls.remove(index);
                true
            }
            None => false,
        }
    }

    /// Open calls, oldest first.
    #[must_use]
    pub fn open_calls(&self) -> &[OpenCall] {
        &self.open_calls
    }

    /// Most recently opened call still awaiting its result.
    #[must_use]
    pub fn top(&self) -> Option<OpenCall> {
        self.open_calls.last().copied()
    }

    /// Number of open calls.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open_calls.len()
    }

    /// Id the next outbound call will get.
    #[must_use]
    pub fn next_call_id(&self) -> u64 {
        self.next_call_id
    }

    /// Sequence number of the next packet sent.
    #[must_use]
    pub fn next_seq_id(&self) -> u64 {
        self.next_seq_id
    }

    /// Sequence number the next incoming packet must carry.
    #[must_use]
    pub fn expected_incoming_seq(&self) -> u64 {
        self.expected_incoming_seq
    }
}
