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

//! Serialization layer for nestrpc.
//!
//! This module owns everything that touches bytes on the wire: the value model
//! carried by calls and results, the fixed packet header, the two-tier payload
//! codec, and reassembly of packets from a TCP byte stream.
//!
//! # Overview
//!
//! - **[`Value`]**: closed set of argument and result shapes, plus
//!   [`Value::Object`] for arbitrary serde types
//! - **[`packet`] module**: [`Header`], [`Call`], [`CallResult`] and [`Packet`]
//! - **[`codec`] module**: packet encoding and decoding
//! - **[`framing`] module**: [`StreamReassembler`]
//! - **Error types**: [`WireError`], [`FrameError`] and [`ValueError`]
//!
//! # Payload encodings
//!
//! ## Structured (postcard)
//!
//! Used for every call and for results whose values are all structured:
//! - Very compact binary format
//! - Deterministic output
//! - Closed set of shapes, no object graphs
//!
//! ## Fallback (JSON)
//!
//! Used for results that carry at least one [`Value::Object`]:
//! - Arbitrary serde object graphs
//! - Larger output size
//!
//! # Examples
//!
//! ```rust
//! use nestrpc::serialization::{codec, Call, CorrelationId, Packet, Payload};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let call = Call::new("example_function").arg("John").arg("Miller").named("age", 12);
//! let packet = Packet::new(CorrelationId::new(0, 0), call);
//!
//! let bytes = codec::encode(&packet)?;
//! let decoded = codec::decode(&bytes)?;
//! assert!(matches!(decoded.payload, Payload::Call(ref c) if c.name == "example_function"));
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod error;
pub mod framing;
pub mod packet;
mod value;

pub use codec::PayloadEncoding;
pub use error::{FrameError, ValueError, WireError};
pub use framing::StreamReassembler;
pub use packet::{
    Call, CallResult, CorrelationId, HEADER_SIZE, Header, MAX_FRAME_SIZE, Packet, Payload,
    PayloadType, RETURN_KEY,
};
pub use value::{FromValue, IntoValue, MAX_NESTING, Object, RemoteError, RemoteErrorKind, Value};
