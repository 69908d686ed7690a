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

//! Stream reassembly.
//!
//! TCP delivers a byte stream, not packets. [`StreamReassembler`] buffers the
//! chunks handed to it by the reader and cuts complete packets out of the front
//! of that buffer.
//!
//! Reassembly is pull-one-packet-per-call: when a single chunk carries several
//! packets, [`StreamReassembler::add_chunk`] returns the first and every further
//! packet is obtained through [`StreamReassembler::next_packet`] until it returns
//! `None`.
//!
//! # Examples
//!
//! ```rust
//! use nestrpc::serialization::{codec, CallResult, CorrelationId, Packet, StreamReassembler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let packet = Packet::new(CorrelationId::new(0, 0), CallResult::returning(1));
//! let bytes = codec::encode(&packet)?;
//!
//! let mut reassembler = StreamReassembler::new();
//! assert!(reassembler.add_chunk(&bytes[..5])?.is_none());
//! let decoded = reassembler.add_chunk(&bytes[5..])?.expect("complete packet");
//! assert_eq!(decoded.payload, packet.payload);
//! # Ok(())
//! # }
//! ```

use crate::serialization::{
    FrameError, HEADER_SIZE, Header, MAX_FRAME_SIZE, Packet, WireError, codec,
};

/// Rebuilds packets from arbitrarily sized byte chunks.
#[derive(Debug)]
pub struct StreamReassembler {
    buffer: Vec<u8>,
    header: Option<Header>,
    max_frame_size: u32,
}

impl StreamReassembler {
    /// Creates a reassembler enforcing [`MAX_FRAME_SIZE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    /// Creates a reassembler rejecting payloads larger than `max_frame_size`.
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: u32) -> Self {
        Self {
            buffer: Vec::new(),
            header: None,
            max_frame_size,
        }
    }

    /// Appends `chunk` and returns the next complete packet, if any.
    ///
    /// # Errors
    ///
    /// Returns the decode error of a complete but undecodable packet together
    /// with its header. That packet's bytes are consumed, so the next call
    /// continues with whatever follows it. [`WireError::FrameTooLarge`]
    /// discards the whole buffer since the stream has no usable packet
    /// boundary after it.
    pub fn add_chunk(&mut self, chunk: &[u8]) -> Result<Option<Packet>, FrameError> {
        self.buffer.extend_from_slice(chunk);
        self.next_packet()
    }

    /// Returns the next complete packet already held in the buffer.
    ///
    /// # Errors
    ///
    /// See [`add_chunk`](Self::add_chunk).
    pub fn next_packet(&mut self) -> Result<Option<Packet>, FrameError> {
        if self.header.is_none() {
            if self.buffer.len() < HEADER_SIZE {
                return Ok(None);
            }
            let header = Header::from_bytes(&self.buffer).map_err(|e| FrameError::new(None, e))?;
            if header.payload_length > self.max_frame_size {
                self.reset();
                return Err(FrameError::new(
                    Some(header),
                    WireError::FrameTooLarge {
                        size: u64::from(header.payload_length),
                        max: self.max_frame_size,
                    },
                ));
            }
            self.header = Some(header);
        }

        let Some(header) = self.header else {
            return Ok(None);
        };
        let end = HEADER_SIZE + header.payload_length as usize;
        if self.buffer.len() < end {
            return Ok(None);
        }

        self.header = None;
        let result = codec::decode_payload(header, &self.buffer[HEADER_SIZE..end]);
        self.buffer.drain(..end);
        result.map(Some).map_err(|e| FrameError::new(Some(header), e))
    }

    /// Drops buffered bytes and any parsed header.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.header = None;
    }

    /// Number of bytes waiting for the rest of their packet.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if some bytes of an incomplete packet are buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty()
    }
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{Call, CallResult, CorrelationId, PayloadType};

    fn sample() -> (Packet, Vec<u8>) {
        let packet = Packet::new(
            CorrelationId::new(7, 11),
            Call::new("example_function").arg("John").named("age", 12),
        );
        let bytes = codec::encode(&packet).unwrap();
        (packet, bytes)
    }

    #[test]
    fn test_every_split_point() {
        let (packet, bytes) = sample();
        for k in 1..bytes.len() {
            let mut reassembler = StreamReassembler::new();
            assert!(reassembler.add_chunk(&bytes[..k]).unwrap().is_none(), "split {k}");
            let decoded = reassembler.add_chunk(&bytes[k..]).unwrap().unwrap();
            assert_eq!(decoded.payload, packet.payload);
            assert_eq!(decoded.correlation(), packet.correlation());
            assert!(!reassembler.has_partial());
        }
    }

    #[test]
    fn test_one_packet_per_call() {
        let first = Packet::new(CorrelationId::new(0, 0), CallResult::returning(1));
        let second = Packet::new(CorrelationId::new(1, 1), CallResult::returning(2));
        let mut bytes = codec::encode(&first).unwrap();
        bytes.extend(codec::encode(&second).unwrap());

        let mut reassembler = StreamReassembler::new();
        let a = reassembler.add_chunk(&bytes).unwrap().unwrap();
        assert_eq!(a.payload, first.payload);
        assert!(reassembler.has_partial());
        let b = reassembler.next_packet().unwrap().unwrap();
        assert_eq!(b.payload, second.payload);
        assert!(reassembler.next_packet().unwrap().is_none());
        assert_eq!(reassembler.buffered_len(), 0);
    }

    #[test]
    fn test_bad_packet_is_skipped() {
        let bogus = Header {
            call_id: 0,
            seq_id: 0,
            payload_type: 0x0777,
            payload_length: 2,
        };
        let mut bytes = bogus.to_bytes().to_vec();
        bytes.extend_from_slice(&[1, 2]);
        let (packet, good) = sample();
        bytes.extend(good);

        let mut reassembler = StreamReassembler::new();
        let err = reassembler.add_chunk(&bytes).unwrap_err();
        assert!(matches!(err.source, WireError::UnknownPacketType { tag: 0x0777 }));
        assert!(!err.is_fatal());
        assert_eq!(err.header, Some(bogus));
        let decoded = reassembler.next_packet().unwrap().unwrap();
        assert_eq!(decoded.payload, packet.payload);
    }

    #[test]
    fn test_oversized_frame_resets() {
        let header = Header {
            call_id: 0,
            seq_id: 0,
            payload_type: PayloadType::Call.as_u16(),
            payload_length: 1024,
        };
        let mut reassembler = StreamReassembler::with_max_frame_size(64);
        let err = reassembler.add_chunk(&header.to_bytes()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.header.map(|h| h.payload_length), Some(1024));
        assert_eq!(reassembler.buffered_len(), 0);
    }

    #[test]
    fn test_reset_discards_partial() {
        let (_, bytes) = sample();
        let mut reassembler = StreamReassembler::new();
        reassembler.add_chunk(&bytes[..HEADER_SIZE + 1]).unwrap();
        assert!(reassembler.has_partial());
        reassembler.reset();
        assert!(!reassembler.has_partial());
    }
}
