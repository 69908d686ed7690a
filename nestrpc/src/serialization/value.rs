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

//! Dynamically typed values carried by calls and results.
//!
//! Every argument and every named result travels as a [`Value`]. The enum is a
//! closed set of primitive and composite shapes that the structured encoder
//! understands, plus one escape hatch, [`Value::Object`], which holds an
//! arbitrary serde object graph and forces the fallback encoder.
//!
//! # Conversions
//!
//! Rust values enter the set through `From` impls and leave it through
//! [`FromValue`]:
//!
//! ```rust
//! use nestrpc::serialization::{FromValue, Value};
//!
//! let value = Value::from(vec![1i64, 2, 3]);
//! let numbers = Vec::<i64>::from_value(value).unwrap();
//! assert_eq!(numbers, vec![1, 2, 3]);
//! ```
//!
//! Types that only implement serde go through [`Object`]:
//!
//! ```rust
//! use nestrpc::serialization::{FromValue, Object, Value};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Person { name: String, age: u32 }
//!
//! let value = Value::object(&Person { name: "John".into(), age: 12 }).unwrap();
//! assert!(!value.is_structured());
//!
//! let Object(person) = Object::<Person>::from_value(value).unwrap();
//! assert_eq!(person.age, 12);
//! ```
//!
//! # Limits
//!
//! Decoding rejects lists and maps nested deeper than [`MAX_NESTING`]
//! levels, so a hostile payload cannot exhaust the reader's stack. In
//! human-readable formats non-finite floats are written as the strings
//! `"inf"`, `"-inf"` and `"NaN"`, which JSON has no numbers for.

use crate::serialization::ValueError;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Deepest list or map nesting accepted when decoding a [`Value`].
pub const MAX_NESTING: usize = 64;

/// A single argument or result value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum Value {
    /// Absence of a value; also what a function without a return value yields.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer. Narrower integers widen into this variant.
    Int(i64),
    /// 64-bit float.
    Float(#[serde(serialize_with = "serialize_float")] f64),
    /// UTF-8 string.
    Str(String),
    /// Opaque byte string.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    List(Vec<Value>),
    /// String-keyed mapping.
    Map(BTreeMap<String, Value>),
    /// Error marker reported by the remote side in place of a return value.
    Error(RemoteError),
    /// Arbitrary object graph outside the structured set.
    Object(serde_json::Value),
}

impl Value {
    /// Wraps a byte string. `Vec<u8>` converts to a list of integers through
    /// `From`, so bytes need an explicit constructor.
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(bytes.into())
    }

    /// Captures any serde-serializable type as a fallback [`Value::Object`].
    pub fn object<T>(value: &T) -> Result<Self, ValueError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_value(value)
            .map(Value::Object)
            .map_err(|e| ValueError::Object { source: e })
    }

    /// Rebuilds a serde type from this value.
    ///
    /// Works for [`Value::Object`] as well as for structured values whose JSON
    /// shape matches `T`.
    pub fn to_object<T>(&self) -> Result<T, ValueError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(self.to_json()).map_err(|e| ValueError::Object { source: e })
    }

    /// Returns `true` if this value, and every value nested inside it, belongs to
    /// the closed set understood by the structured encoder.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        match self {
            Value::Object(_) => false,
            Value::List(items) => items.iter().all(Value::is_structured),
            Value::Map(entries) => entries.values().all(Value::is_structured),
            _ => true,
        }
    }

    /// Returns the error marker if this value carries one.
    #[must_use]
    pub fn as_error(&self) -> Option<&RemoteError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Error(_) => "error",
            Value::Object(_) => "object",
        }
    }

    /// Plain JSON view of the value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Error(e) => serde_json::json!({ "kind": e.kind.as_str(), "message": e.message }),
            Value::Object(json) => json.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Error(e) => write!(f, "<error {}>", e),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Category of an error reported by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// No function with the requested name is registered on the remote side.
    FunctionNotFound,
    /// The function exists but rejected the supplied arguments.
    InvalidArguments,
    /// The function ran and reported a failure.
    Failed,
    /// The function panicked while executing.
    Panicked,
}

impl RemoteErrorKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FunctionNotFound => "function_not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::Failed => "failed",
            Self::Panicked => "panicked",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error value produced while executing an inbound call.
///
/// It is sent back inside the Result's return slot and re-raised on the caller's
/// side as [`RpcError::Remote`](crate::RpcError::Remote).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    /// Error category.
    pub kind: RemoteErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl RemoteError {
    /// Creates a new remote error.
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The function ran and failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Failed, message)
    }

    /// The arguments did not match what the function expects.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidArguments, message)
    }

    /// No function with this name is registered.
    pub fn function_not_found(name: &str) -> Self {
        Self::new(
            RemoteErrorKind::FunctionNotFound,
            format!("no function named '{}' is registered", name),
        )
    }
}

impl From<ValueError> for RemoteError {
    fn from(error: ValueError) -> Self {
        RemoteError::invalid_arguments(error.to_string())
    }
}

/// Conversion into a [`Value`], implemented for everything that is `Into<Value>`.
pub trait IntoValue {
    /// Converts `self` into a value.
    fn into_value(self) -> Value;
}

impl<T: Into<Value>> IntoValue for T {
    fn into_value(self) -> Value {
        self.into()
    }
}

/// Conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// Converts the value, failing if its shape does not match `Self`.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(()),
            other => Err(mismatch("null", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let wide = i64::from_value(value)?;
                    <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                        value: wide,
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

narrow_int!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(mismatch("str", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            Value::Bytes(bytes) => bytes
                .into_iter()
                .map(|b| T::from_value(Value::Int(i64::from(b))))
                .collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for BTreeMap<String, T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }
}

impl FromValue for RemoteError {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Error(e) => Ok(e),
            other => Err(mismatch("error", &other)),
        }
    }
}

/// Adapter carrying a serde type through the fallback object encoding.
///
/// `Object<T>` converts into [`Value::Object`] and back, so any type with serde
/// derives can be used as an argument or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object<T>(pub T);

impl<T: DeserializeOwned> FromValue for Object<T> {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.to_object().map(Object)
    }
}

impl<T: Serialize> TryFrom<Object<T>> for Value {
    type Error = ValueError;

    fn try_from(object: Object<T>) -> Result<Self, ValueError> {
        Value::object(&object.0)
    }
}

macro_rules! from_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(i64::from(value))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<RemoteError> for Value {
    fn from(value: RemoteError) -> Self {
        Value::Error(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(entries: BTreeMap<String, T>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

fn serialize_float<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if !serializer.is_human_readable() || value.is_finite() {
        return serializer.serialize_f64(*value);
    }
    let text = if value.is_nan() {
        "NaN"
    } else if value.is_sign_positive() {
        "inf"
    } else {
        "-inf"
    };
    serializer.serialize_str(text)
}

const VARIANTS: &[&str] = &[
    "Null", "Bool", "Int", "Float", "Str", "Bytes", "List", "Map", "Error", "Object",
];

#[derive(Deserialize)]
#[serde(variant_identifier)]
enum Tag {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Map,
    Error,
    Object,
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ValueSeed { depth: 0 }.deserialize(deserializer)
    }
}

/// Decodes one value `depth` lists or maps below the top.
#[derive(Clone, Copy)]
struct ValueSeed {
    depth: usize,
}

impl ValueSeed {
    fn nested(self) -> Self {
        Self {
            depth: self.depth + 1,
        }
    }
}

impl<'de> DeserializeSeed<'de> for ValueSeed {
    type Value = Value;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        if self.depth > MAX_NESTING {
            return Err(de::Error::custom(format!(
                "values nested deeper than {MAX_NESTING} levels"
            )));
        }
        deserializer.deserialize_enum("Value", VARIANTS, self)
    }
}

impl<'de> Visitor<'de> for ValueSeed {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a nestrpc value")
    }

    fn visit_enum<A: EnumAccess<'de>>(self, data: A) -> Result<Value, A::Error> {
        let (tag, variant) = data.variant::<Tag>()?;
        match tag {
            Tag::Null => variant.unit_variant().map(|()| Value::Null),
            Tag::Bool => variant.newtype_variant().map(Value::Bool),
            Tag::Int => variant.newtype_variant().map(Value::Int),
            Tag::Float => variant.newtype_variant_seed(FloatSeed).map(Value::Float),
            Tag::Str => variant.newtype_variant().map(Value::Str),
            Tag::Bytes => variant.newtype_variant().map(Value::Bytes),
            Tag::List => variant
                .newtype_variant_seed(ListSeed(self.nested()))
                .map(Value::List),
            Tag::Map => variant
                .newtype_variant_seed(MapSeed(self.nested()))
                .map(Value::Map),
            Tag::Error => variant.newtype_variant().map(Value::Error),
            Tag::Object => variant.newtype_variant().map(Value::Object),
        }
    }
}

struct ListSeed(ValueSeed);

impl<'de> DeserializeSeed<'de> for ListSeed {
    type Value = Vec<Value>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Vec<Value>, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for ListSeed {
    type Value = Vec<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a list of values")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Value>, A::Error> {
        // The length prefix is untrusted.
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element_seed(self.0)? {
            items.push(item);
        }
        Ok(items)
    }
}

struct MapSeed(ValueSeed);

impl<'de> DeserializeSeed<'de> for MapSeed {
    type Value = BTreeMap<String, Value>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for MapSeed {
    type Value = BTreeMap<String, Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value_seed(self.0)?;
            entries.insert(key, value);
        }
        Ok(entries)
    }
}

struct FloatSeed;

impl<'de> DeserializeSeed<'de> for FloatSeed {
    type Value = f64;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<f64, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(self)
        } else {
            deserializer.deserialize_f64(self)
        }
    }
}

impl<'de> Visitor<'de> for FloatSeed {
    type Value = f64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a float, \"inf\", \"-inf\" or \"NaN\"")
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
        Ok(value)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
        match value {
            "inf" => Ok(f64::INFINITY),
            "-inf" => Ok(f64::NEG_INFINITY),
            "NaN" => Ok(f64::NAN),
            other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct DummyPerson {
        name: String,
        age: u32,
    }

    #[test]
    fn test_primitive_conversions() {
        assert_eq!(i64::from_value(Value::from(42i32)).unwrap(), 42);
        assert_eq!(String::from_value(Value::from("John")).unwrap(), "John");
        assert!(bool::from_value(Value::from(true)).unwrap());
        assert_eq!(f64::from_value(Value::Int(3)).unwrap(), 3.0);
        assert_eq!(<()>::from_value(Value::Null).unwrap(), ());
    }

    #[test]
    fn test_bytes_into_byte_vec() {
        let bytes = Vec::<u8>::from_value(Value::bytes(b"abc".to_vec())).unwrap();
        assert_eq!(bytes, b"abc");
        assert_eq!(7i32.into_value(), Value::Int(7));
    }

    #[test]
    fn test_narrowing_out_of_range() {
        let err = u8::from_value(Value::Int(300)).unwrap_err();
        assert!(matches!(err, ValueError::OutOfRange { value: 300, .. }));
        assert_eq!(u8::from_value(Value::Int(255)).unwrap(), 255);
    }

    #[test]
    fn test_type_mismatch() {
        let err = String::from_value(Value::Int(1)).unwrap_err();
        assert!(matches!(
            err,
            ValueError::TypeMismatch {
                expected: "str",
                found: "int"
            }
        ));
    }

    #[test]
    fn test_option_and_list() {
        let value = Value::from(vec![Some(1i64), None, Some(3)]);
        let decoded = Vec::<Option<i64>>::from_value(value).unwrap();
        assert_eq!(decoded, vec![Some(1), None, Some(3)]);
    }

    #[test]
    fn test_map_conversion() {
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), 1i64);
        entries.insert("b".to_string(), 2i64);

        let value = Value::from(entries.clone());
        assert_eq!(BTreeMap::<String, i64>::from_value(value).unwrap(), entries);
    }

    #[test]
    fn test_is_structured() {
        assert!(Value::from(vec![1i64, 2]).is_structured());
        assert!(Value::bytes(vec![1u8, 2]).is_structured());
        assert!(Value::Error(RemoteError::failed("x")).is_structured());

        let person = DummyPerson {
            name: "He".to_string(),
            age: 12,
        };
        let object = Value::object(&person).unwrap();
        assert!(!object.is_structured());
        assert!(!Value::List(vec![Value::Int(1), object]).is_structured());
    }

    #[test]
    fn test_object_round_trip() {
        let person = DummyPerson {
            name: "He".to_string(),
            age: 12,
        };
        let value = Value::try_from(Object(&person)).unwrap();
        let Object(decoded) = Object::<DummyPerson>::from_value(value).unwrap();
        assert_eq!(decoded, person);
    }

    #[test]
    fn test_structured_value_to_object() {
        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Value::from("Miller"));
        entries.insert("age".to_string(), Value::from(40u32));

        let person: DummyPerson = Value::Map(entries).to_object().unwrap();
        assert_eq!(person.name, "Miller");
        assert_eq!(person.age, 40);
    }

    #[test]
    fn test_non_finite_floats_in_json() {
        let json = serde_json::to_string(&Value::Float(f64::NEG_INFINITY)).unwrap();
        assert_eq!(json, r#"{"Float":"-inf"}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Float(f64::NEG_INFINITY));

        let back: Value = serde_json::from_str(r#"{"Float":2}"#).unwrap();
        assert_eq!(back, Value::Float(2.0));
        assert!(serde_json::from_str::<Value>(r#"{"Float":"huge"}"#).is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let mut value = Value::Null;
        for _ in 0..=MAX_NESTING {
            value = Value::List(vec![value]);
        }
        let bytes = postcard::to_stdvec(&value).unwrap();
        assert!(postcard::from_bytes::<Value>(&bytes).is_err());

        let Value::List(mut items) = value else {
            unreachable!()
        };
        let inner = items.remove(0);
        let bytes = postcard::to_stdvec(&inner).unwrap();
        assert_eq!(postcard::from_bytes::<Value>(&bytes).unwrap(), inner);
    }

    #[test]
    fn test_remote_error_display() {
        let error = RemoteError::function_not_found("missing");
        assert_eq!(error.kind, RemoteErrorKind::FunctionNotFound);
        assert!(error.to_string().starts_with("function_not_found"));
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn test_value_error_into_remote_error() {
        let error: RemoteError = ValueError::TypeMismatch {
            expected: "int",
            found: "str",
        }
        .into();
        assert_eq!(error.kind, RemoteErrorKind::InvalidArguments);
    }
}
