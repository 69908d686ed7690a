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

//! Per-connection counters.
//!
//! Counters are plain atomics updated by the reader thread, the senders and
//! the dispatch workers. Read them through [`ConnectionMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Traffic and anomaly counters of one connection.
///
/// # Examples
///
/// ```rust
/// use nestrpc::observability::ConnectionMetrics;
///
/// let metrics = ConnectionMetrics::new();
/// metrics.record_packet_sent(64);
/// metrics.record_packet_received(32);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.packets_sent, 1);
/// assert_eq!(snapshot.bytes_received, 32);
/// ```
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    packets_sent: AtomicU64,
    packets_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    sequence_gaps: AtomicU64,
    duplicates: AtomicU64,
    malformed_packets: AtomicU64,
    reconnects: AtomicU64,
    calls_dispatched: AtomicU64,
    call_timeouts: AtomicU64,
}

impl ConnectionMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one packet written to the socket.
    pub fn record_packet_sent(&self, bytes: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records one reassembled packet.
    pub fn record_packet_received(&self, bytes: usize) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Records a sequence gap.
    pub fn record_sequence_gap(&self) {
        self.sequence_gaps.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a duplicate or stale packet.
    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a packet that could not be decoded.
    pub fn record_malformed(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful reconnect.
    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound call handed to a handler.
    pub fn record_call_dispatched(&self) {
        self.calls_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an outbound call that timed out.
    pub fn record_call_timeout(&self) {
        self.call_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            sequence_gaps: self.sequence_gaps.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            calls_dispatched: self.calls_dispatched.load(Ordering::Relaxed),
            call_timeouts: self.call_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ConnectionMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Packets written.
    pub packets_sent: u64,
    /// Packets reassembled.
    pub packets_received: u64,
    /// Bytes written, headers included.
    pub bytes_sent: u64,
    /// Bytes of reassembled packets, headers included.
    pub bytes_received: u64,
    /// Sequence gaps detected.
    pub sequence_gaps: u64,
    /// Duplicate or stale packets dropped.
    pub duplicates: u64,
    /// Packets dropped as undecodable.
    pub malformed_packets: u64,
    /// Successful reconnects.
    pub reconnects: u64,
    /// Inbound calls handed to handlers.
    pub calls_dispatched: u64,
    /// Outbound calls that timed out.
    pub call_timeouts: u64,
}
