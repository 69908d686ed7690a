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

//! Packet encoder and decoder.
//!
//! Payloads use one of two encodings:
//!
//! - **Structured**: postcard over the closed [`Value`] set. Used whenever
//!   every value in the payload is structured.
//! - **Fallback**: JSON, used only for results that carry a
//!   [`Value::Object`].
//!
//! Call payloads are always structured; a call holding an object value is
//! rejected with [`WireError::UnsupportedValue`]. Result payloads start with
//! a one-byte [`PayloadEncoding`] marker so the receiver knows which decoder
//! to apply.

use crate::serialization::{
    Call, CallResult, Header, HEADER_SIZE, MAX_FRAME_SIZE, Packet, Payload, PayloadType, Value,
    WireError,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// Encoding used for a result payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadEncoding {
    /// Postcard over structured values.
    Structured = 0,
    /// JSON, able to carry object graphs.
    Fallback = 1,
}

impl TryFrom<u8> for PayloadEncoding {
    type Error = WireError;

    fn try_from(marker: u8) -> Result<Self, Self::Error> {
        match marker {
            0 => Ok(PayloadEncoding::Structured),
            1 => Ok(PayloadEncoding::Fallback),
            other => Err(WireError::malformed(format!(
                "unknown result encoding marker {other}"
            ))),
        }
    }
}

/// Encodes a packet into header plus payload bytes, enforcing [`MAX_FRAME_SIZE`].
pub fn encode(packet: &Packet) -> Result<Vec<u8>, WireError> {
    encode_with_limit(packet, MAX_FRAME_SIZE)
}

/// Encodes a packet, rejecting payloads larger than `max_frame_size`.
///
/// The header's `payload_length` and `payload_type` are derived from the
/// payload; the values stored in `packet.header` are ignored.
pub fn encode_with_limit(packet: &Packet, max_frame_size: u32) -> Result<Vec<u8>, WireError> {
    let payload = encode_payload(&packet.payload)?;
    let payload_length = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= max_frame_size)
        .ok_or(WireError::FrameTooLarge {
            size: payload.len() as u64,
            max: max_frame_size,
        })?;

    let header = Header {
        call_id: packet.header.call_id,
        seq_id: packet.header.seq_id,
        payload_type: packet.payload.payload_type().as_u16(),
        payload_length,
    };

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&header.to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Encodes a payload body without a header.
pub fn encode_payload(payload: &Payload) -> Result<Vec<u8>, WireError> {
    match payload {
        Payload::Call(call) => encode_call(call),
        Payload::Result(result) => encode_result(result),
    }
}

fn encode_call(call: &Call) -> Result<Vec<u8>, WireError> {
    if !call.is_structured() {
        return Err(WireError::UnsupportedValue {
            context: "call arguments",
        });
    }
    postcard_to_vec(&(&call.name, &call.positional, &call.named))
}

fn encode_result(result: &CallResult) -> Result<Vec<u8>, WireError> {
    let encoding = result_encoding(result);
    let body = match encoding {
        PayloadEncoding::Structured => postcard_to_vec(&result.values)?,
        PayloadEncoding::Fallback => {
            serde_json::to_vec(&result.values).map_err(|e| WireError::Encode {
                format: "json",
                source: Box::new(e),
            })?
        }
    };

    let mut bytes = Vec::with_capacity(1 + body.len());
    bytes.push(encoding as u8);
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Encoding a result will be written with.
#[must_use]
pub fn result_encoding(result: &CallResult) -> PayloadEncoding {
    if result.is_structured() {
        PayloadEncoding::Structured
    } else {
        PayloadEncoding::Fallback
    }
}

fn postcard_to_vec<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, WireError> {
    postcard::to_stdvec(value).map_err(|e| WireError::Encode {
        format: "postcard",
        source: Box::new(e),
    })
}

/// Decodes one complete packet from `bytes`.
///
/// `bytes` must hold exactly one header followed by exactly
/// `payload_length` payload bytes.
pub fn decode(bytes: &[u8]) -> Result<Packet, WireError> {
    let header = Header::from_bytes(bytes)?;
    let payload = &bytes[HEADER_SIZE..];
    if payload.len() != header.payload_length as usize {
        return Err(WireError::malformed(format!(
            "header declares {} payload bytes, got {}",
            header.payload_length,
            payload.len()
        )));
    }
    decode_payload(header, payload)
}

/// Decodes a payload body for an already parsed header.
pub fn decode_payload(header: Header, payload: &[u8]) -> Result<Packet, WireError> {
    let payload = match header.kind()? {
        PayloadType::Call => Payload::Call(decode_call(payload)?),
        PayloadType::Result => Payload::Result(decode_result(payload)?),
    };
    Ok(Packet { header, payload })
}

fn decode_call(bytes: &[u8]) -> Result<Call, WireError> {
    let (name, positional, named): (String, Vec<Value>, BTreeMap<String, Value>) =
        postcard_exact(bytes)?;
    let call = Call {
        name,
        positional,
        named,
    };
    if !call.is_structured() {
        return Err(WireError::UnsupportedValue {
            context: "call arguments",
        });
    }
    Ok(call)
}

fn decode_result(bytes: &[u8]) -> Result<CallResult, WireError> {
    let Some((&marker, body)) = bytes.split_first() else {
        return Err(WireError::malformed("empty result payload"));
    };
    let values = match PayloadEncoding::try_from(marker)? {
        PayloadEncoding::Structured => postcard_exact(body)?,
        PayloadEncoding::Fallback => serde_json::from_slice(body)?,
    };
    Ok(CallResult { values })
}

fn postcard_exact<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    let (value, rest) = postcard::take_from_bytes(bytes)?;
    if !rest.is_empty() {
        return Err(WireError::malformed(format!(
            "{} trailing bytes after payload",
            rest.len()
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{CorrelationId, MAX_NESTING, RETURN_KEY, RemoteError};

    fn assert_reencodes(packet: &Packet) -> Packet {
        let bytes = encode(packet).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.correlation(), packet.correlation());
        assert_eq!(decoded.payload, packet.payload);
        assert_eq!(encode(&decoded).unwrap(), bytes);
        decoded
    }

    #[test]
    fn test_call_roundtrip() {
        let packet = Packet::new(
            CorrelationId::new(1, 0),
            Call::new("example_function")
                .arg("John")
                .arg("Miller")
                .named("age", 12),
        );
        let decoded = assert_reencodes(&packet);
        assert_eq!(
            decoded.header.payload_length as usize,
            encode_payload(&packet.payload).unwrap().len()
        );
    }

    #[test]
    fn test_result_roundtrip_structured() {
        let packet = Packet::new(CorrelationId::new(1, 2), CallResult::returning("Nothing"));
        let bytes = encode(&packet).unwrap();
        assert_eq!(bytes[HEADER_SIZE], PayloadEncoding::Structured as u8);
        assert_reencodes(&packet);
    }

    #[test]
    fn test_result_roundtrip_fallback() {
        let object = serde_json::json!({ "name": "widget", "sizes": [1, 2, 3] });
        let packet = Packet::new(
            CorrelationId::new(9, 9),
            CallResult::returning(Value::Object(object)),
        );
        let bytes = encode(&packet).unwrap();
        assert_eq!(bytes[HEADER_SIZE], PayloadEncoding::Fallback as u8);
        assert_reencodes(&packet);
    }

    #[test]
    fn test_error_marker_roundtrip() {
        let packet = Packet::new(
            CorrelationId::new(4, 1),
            CallResult::returning(RemoteError::failed("boom")),
        );
        let decoded = assert_reencodes(&packet);
        let Payload::Result(result) = decoded.payload else {
            panic!("expected result");
        };
        assert!(result.return_value().unwrap().as_error().is_some());
    }

    #[test]
    fn test_call_with_object_rejected() {
        let packet = Packet::new(
            CorrelationId::default(),
            Call::new("f").arg(Value::Object(serde_json::json!({}))),
        );
        assert!(matches!(
            encode(&packet),
            Err(WireError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let packet = Packet::new(CorrelationId::new(1, 1), CallResult::returning(5));
        let mut bytes = encode(&packet).unwrap();
        bytes.push(0);
        assert!(matches!(
            decode(&bytes),
            Err(WireError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let header = Header {
            call_id: 0,
            seq_id: 0,
            payload_type: 0x0fff,
            payload_length: 0,
        };
        assert!(matches!(
            decode(&header.to_bytes()),
            Err(WireError::UnknownPacketType { tag: 0x0fff })
        ));
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let header = Header {
            call_id: 0,
            seq_id: 0,
            payload_type: PayloadType::Result.as_u16(),
            payload_length: 3,
        };
        let mut bytes = header.to_bytes().to_vec();
        bytes.extend_from_slice(&[7, 7, 7]);
        assert!(decode(&bytes).is_err());
    }

    fn fallback_floats(floats: &[f64]) -> Vec<Value> {
        let mut values: Vec<Value> = floats.iter().copied().map(Value::Float).collect();
        values.push(Value::Object(serde_json::json!({})));
        let packet = Packet::new(CorrelationId::new(3, 3), CallResult::returning(values));
        let bytes = encode(&packet).unwrap();
        assert_eq!(bytes[HEADER_SIZE], PayloadEncoding::Fallback as u8);

        let Payload::Result(mut result) = decode(&bytes).unwrap().payload else {
            panic!("expected result");
        };
        let Value::List(mut decoded) = result.take_return_value() else {
            panic!("expected list");
        };
        assert!(matches!(decoded.pop(), Some(Value::Object(_))));
        decoded
    }

    #[test]
    fn test_fallback_keeps_non_finite_floats() {
        let decoded = fallback_floats(&[f64::INFINITY, f64::NEG_INFINITY, f64::NAN]);
        assert_eq!(decoded[0], Value::Float(f64::INFINITY));
        assert_eq!(decoded[1], Value::Float(f64::NEG_INFINITY));
        assert!(matches!(decoded[2], Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_fallback_floats_are_exact() {
        let mut floats = vec![
            1.0715660391465826e-75,
            0.1 + 0.2,
            f64::MIN_POSITIVE,
            5e-324,
            f64::MAX,
            f64::MIN,
            1e21,
            2.0,
        ];
        // Deterministic spread over the whole bit range.
        let mut state = 0x2545_f491_4f6c_dd1du64;
        while floats.len() < 2000 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let f = f64::from_bits(state);
            if f.is_finite() {
                floats.push(f);
            }
        }

        let decoded = fallback_floats(&floats);
        assert_eq!(decoded.len(), floats.len());
        for (original, value) in floats.iter().zip(&decoded) {
            let Value::Float(f) = value else {
                panic!("expected float, got {value:?}");
            };
            assert_eq!(f.to_bits(), original.to_bits(), "{original:e} came back as {f:e}");
        }
    }

    /// Postcard bytes of `depth` lists nested inside each other.
    fn nested_lists(depth: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(depth * 2 + 2);
        for _ in 0..depth {
            // Value::List tag, one element.
            bytes.extend_from_slice(&[6, 1]);
        }
        bytes.extend_from_slice(&[6, 0]);
        bytes
    }

    fn call_header(payload: &[u8]) -> Header {
        Header {
            call_id: 0,
            seq_id: 0,
            payload_type: PayloadType::Call.as_u16(),
            payload_length: payload.len() as u32,
        }
    }

    #[test]
    fn test_deep_nesting_rejected() {
        // name "f", one positional argument, no named arguments.
        let mut payload = vec![1, b'f', 1];
        payload.extend(nested_lists(200_000));
        payload.push(0);

        let err = decode_payload(call_header(&payload), &payload).unwrap_err();
        assert!(matches!(err, WireError::Decode { format: "postcard", .. }), "{err:?}");
        assert!(!err.is_fatal());

        let mut result = vec![PayloadEncoding::Structured as u8, 1, 6];
        result.extend_from_slice(RETURN_KEY.as_bytes());
        result.extend(nested_lists(200_000));
        let header = Header {
            payload_type: PayloadType::Result.as_u16(),
            ..call_header(&result)
        };
        assert!(decode_payload(header, &result).is_err());
    }

    #[test]
    fn test_nesting_within_limit() {
        let mut payload = vec![1, b'f', 1];
        payload.extend(nested_lists(MAX_NESTING - 1));
        payload.push(0);

        let packet = decode_payload(call_header(&payload), &payload).unwrap();
        let Payload::Call(call) = packet.payload else {
            panic!("expected call");
        };
        let mut depth = 0;
        let mut value = &call.positional[0];
        while let Value::List(items) = value {
            match items.first() {
                Some(inner) => {
                    depth += 1;
                    value = inner;
                }
                None => break,
            }
        }
        assert_eq!(depth, MAX_NESTING - 1);
        assert_eq!(encode_payload(&Payload::Call(call)).unwrap(), payload);
    }

    #[test]
    fn test_frame_limit_enforced() {
        let packet = Packet::new(
            CorrelationId::default(),
            CallResult::returning(Value::bytes(vec![0u8; 64])),
        );
        assert!(matches!(
            encode_with_limit(&packet, 16),
            Err(WireError::FrameTooLarge { max: 16, .. })
        ));
    }
}
