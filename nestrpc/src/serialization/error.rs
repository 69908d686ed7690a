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

//! Wire and value conversion error types.

use crate::serialization::Header;
use std::error::Error as StdError;
use thiserror::Error;

/// Errors raised while encoding or decoding packets.
#[derive(Debug, Error)]
pub enum WireError {
    /// The payload bytes do not match the header or cannot be parsed.
    #[error("malformed payload: {reason}")]
    MalformedPayload {
        /// What was wrong with the payload.
        reason: String,
    },

    /// The header carries a payload type tag this side does not know.
    #[error("unknown packet type {tag:#06x}")]
    UnknownPacketType {
        /// The unrecognized tag.
        tag: u16,
    },

    /// Fewer bytes than a full header were supplied.
    #[error("incomplete header: have {have} bytes, need {need} bytes")]
    IncompleteHeader {
        /// Bytes available.
        have: usize,
        /// Bytes required.
        need: usize,
    },

    /// A payload exceeds the configured maximum frame size.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Declared or encoded payload size.
        size: u64,
        /// Configured maximum.
        max: u32,
    },

    /// A structured-only payload was asked to carry a fallback object value.
    #[error("{context} contain values outside the structured encoding")]
    UnsupportedValue {
        /// Which part of the packet held the value.
        context: &'static str,
    },

    /// The underlying serializer failed.
    #[error("{format} encoding failed: {source}")]
    Encode {
        /// Serializer name.
        format: &'static str,
        /// Serializer error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The underlying deserializer failed.
    #[error("{format} decoding failed: {source}")]
    Decode {
        /// Deserializer name.
        format: &'static str,
        /// Deserializer error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl WireError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        WireError::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the byte stream can no longer be split into packets
    /// after this error.
    ///
    /// Payload-level failures drop one packet; an oversized frame leaves the
    /// reader without a trustworthy boundary for the next header.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, WireError::FrameTooLarge { .. })
    }
}

/// A packet the [`StreamReassembler`](crate::serialization::StreamReassembler)
/// had to drop.
///
/// Carries the packet's header whenever it was parsed, so the reader can still
/// account for the packet's sequence number.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct FrameError {
    /// Header of the dropped packet, if it could be read.
    pub header: Option<Header>,
    /// Why the packet was dropped.
    #[source]
    pub source: WireError,
}

impl FrameError {
    pub(crate) fn new(header: Option<Header>, source: WireError) -> Self {
        Self { header, source }
    }

    /// See [`WireError::is_fatal`].
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.source.is_fatal()
    }
}

impl From<postcard::Error> for WireError {
    fn from(err: postcard::Error) -> Self {
        WireError::Decode {
            format: "postcard",
            source: Box::new(err),
        }
    }
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        WireError::Decode {
            format: "json",
            source: Box::new(err),
        }
    }
}

/// Errors raised when converting a [`Value`](crate::serialization::Value) into a
/// Rust type.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The value has a different shape.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected shape.
        expected: &'static str,
        /// Actual shape.
        found: &'static str,
    },

    /// An integer does not fit the requested type.
    #[error("integer {value} is out of range for {target}")]
    OutOfRange {
        /// The integer received.
        value: i64,
        /// Requested Rust type.
        target: &'static str,
    },

    /// A positional argument is missing.
    #[error("missing positional argument {index}")]
    MissingPositional {
        /// Zero-based argument index.
        index: usize,
    },

    /// A named argument is missing.
    #[error("missing named argument '{name}'")]
    MissingNamed {
        /// Argument name.
        name: String,
    },

    /// Object graph (de)serialization failed.
    #[error("object conversion failed: {source}")]
    Object {
        /// Underlying serde_json error.
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let error = WireError::malformed("length mismatch");
        assert_eq!(error.to_string(), "malformed payload: length mismatch");
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_unknown_packet_type_display() {
        let error = WireError::UnknownPacketType { tag: 0x0abc };
        assert_eq!(error.to_string(), "unknown packet type 0x0abc");
    }

    #[test]
    fn test_frame_too_large_is_fatal() {
        let error = WireError::FrameTooLarge {
            size: 1 << 30,
            max: 16,
        };
        assert!(error.is_fatal());
    }

    #[test]
    fn test_decode_error_has_source() {
        let json_err = serde_json::from_slice::<u32>(b"nope").unwrap_err();
        let error: WireError = json_err.into();
        assert!(StdError::source(&error).is_some());
        assert!(error.to_string().starts_with("json decoding failed"));
    }

    #[test]
    fn test_value_error_display() {
        let error = ValueError::MissingNamed {
            name: "tup".to_string(),
        };
        assert_eq!(error.to_string(), "missing named argument 'tup'");
    }
}
