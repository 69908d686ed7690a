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

//! Packet, header and payload types.
//!
//! # Header layout
//!
//! Every packet starts with a fixed 22-byte header, all fields big-endian:
//!
//! ```text
//! +--------------+--------------+-------------------+----------------------+
//! | call_id (8)  | seq_id (8)   | payload_type (2)  | payload_length (4)   |
//! +--------------+--------------+-------------------+----------------------+
//! ```
//!
//! followed immediately by `payload_length` bytes of payload. There is no
//! version byte, compression or checksum at this layer.

use crate::serialization::{Value, WireError};
use std::collections::BTreeMap;
use std::fmt;

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 22;

/// Default maximum payload size (16 MB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Result key conventionally holding the return value or error marker.
pub const RETURN_KEY: &str = "return";

/// Payload type tags understood by both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PayloadType {
    /// A request to run a named function.
    Call = 0x0101,
    /// The outcome of a previously sent call.
    Result = 0x0103,
}

impl PayloadType {
    /// Wire tag.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for PayloadType {
    type Error = WireError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        match tag {
            0x0101 => Ok(PayloadType::Call),
            0x0103 => Ok(PayloadType::Result),
            tag => Err(WireError::UnknownPacketType { tag }),
        }
    }
}

/// The `(call_id, seq_id)` pair matching results to calls and detecting loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CorrelationId {
    /// Identifies one open remote call.
    pub call_id: u64,
    /// Per-connection packet counter of the sending side.
    pub seq_id: u64,
}

impl CorrelationId {
    /// Creates a correlation id.
    #[must_use]
    pub const fn new(call_id: u64, seq_id: u64) -> Self {
        Self { call_id, seq_id }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call {} / seq {}", self.call_id, self.seq_id)
    }
}

/// Fixed-size packet preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Call this packet opens or answers.
    pub call_id: u64,
    /// Sender's packet sequence number.
    pub seq_id: u64,
    /// Raw payload type tag.
    pub payload_type: u16,
    /// Number of payload bytes following the header.
    pub payload_length: u32,
}

impl Header {
    /// Creates a header for the given ids and payload type with an unset length.
    #[must_use]
    pub const fn new(correlation: CorrelationId, payload_type: PayloadType) -> Self {
        Self {
            call_id: correlation.call_id,
            seq_id: correlation.seq_id,
            payload_type: payload_type.as_u16(),
            payload_length: 0,
        }
    }

    /// Correlation ids carried by this header.
    #[must_use]
    pub const fn correlation(&self) -> CorrelationId {
        CorrelationId::new(self.call_id, self.seq_id)
    }

    /// Typed payload tag.
    pub fn kind(&self) -> Result<PayloadType, WireError> {
        PayloadType::try_from(self.payload_type)
    }

    /// Serializes the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.call_id.to_be_bytes());
        bytes[8..16].copy_from_slice(&self.seq_id.to_be_bytes());
        bytes[16..18].copy_from_slice(&self.payload_type.to_be_bytes());
        bytes[18..22].copy_from_slice(&self.payload_length.to_be_bytes());
        bytes
    }

    /// Parses a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        let Some(bytes) = bytes.get(..HEADER_SIZE) else {
            return Err(WireError::IncompleteHeader {
                have: bytes.len(),
                need: HEADER_SIZE,
            });
        };

        let mut call_id = [0u8; 8];
        let mut seq_id = [0u8; 8];
        let mut payload_type = [0u8; 2];
        let mut payload_length = [0u8; 4];
        call_id.copy_from_slice(&bytes[0..8]);
        seq_id.copy_from_slice(&bytes[8..16]);
        payload_type.copy_from_slice(&bytes[16..18]);
        payload_length.copy_from_slice(&bytes[18..22]);

        Ok(Self {
            call_id: u64::from_be_bytes(call_id),
            seq_id: u64::from_be_bytes(seq_id),
            payload_type: u16::from_be_bytes(payload_type),
            payload_length: u32::from_be_bytes(payload_length),
        })
    }
}

/// Request to execute a named function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Call {
    /// Name the function is registered under.
    pub name: String,
    /// Positional arguments.
    pub positional: Vec<Value>,
    /// Named arguments.
    pub named: BTreeMap<String, Value>,
}

impl Call {
    /// Creates a call without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            positional: Vec::new(),
            named: BTreeMap::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Returns `true` if every argument fits the structured encoding.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.positional.iter().all(Value::is_structured)
            && self.named.values().all(Value::is_structured)
    }
}

/// Outcome of a call as a set of named values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallResult {
    /// Named result values; [`RETURN_KEY`] holds the return value.
    pub values: BTreeMap<String, Value>,
}

impl CallResult {
    /// Creates a result holding `value` under [`RETURN_KEY`].
    pub fn returning(value: impl Into<Value>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(RETURN_KEY.to_string(), value.into());
        Self { values }
    }

    /// The return slot, if present.
    #[must_use]
    pub fn return_value(&self) -> Option<&Value> {
        self.values.get(RETURN_KEY)
    }

    /// Removes and returns the return slot, [`Value::Null`] if absent.
    pub fn take_return_value(&mut self) -> Value {
        self.values.remove(RETURN_KEY).unwrap_or_default()
    }

    /// Returns `true` if every value fits the structured encoding.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.values.values().all(Value::is_structured)
    }
}

/// Packet payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A function call.
    Call(Call),
    /// The result of a call.
    Result(CallResult),
}

impl Payload {
    /// Payload type tag for this variant.
    #[must_use]
    pub const fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Call(_) => PayloadType::Call,
            Payload::Result(_) => PayloadType::Result,
        }
    }
}

impl From<Call> for Payload {
    fn from(call: Call) -> Self {
        Payload::Call(call)
    }
}

impl From<CallResult> for Payload {
    fn from(result: CallResult) -> Self {
        Payload::Result(result)
    }
}

/// Unit of wire transfer.
///
/// `header.payload_length` is authoritative on decoded packets; the encoder
/// always recomputes it from the payload it writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// Correlation ids, type tag and payload length.
    pub header: Header,
    /// Call or result body.
    pub payload: Payload,
}

impl Packet {
    /// Creates a packet with the given correlation ids.
    pub fn new(correlation: CorrelationId, payload: impl Into<Payload>) -> Self {
        let payload = payload.into();
        Self {
            header: Header::new(correlation, payload.payload_type()),
            payload,
        }
    }

    /// Correlation ids of this packet.
    #[must_use]
    pub const fn correlation(&self) -> CorrelationId {
        self.header.correlation()
    }

    /// Returns `true` for call packets.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self.payload, Payload::Call(_))
    }

    /// Returns `true` for result packets.
    #[must_use]
    pub const fn is_result(&self) -> bool {
        matches!(self.payload, Payload::Result(_))
    }
}
