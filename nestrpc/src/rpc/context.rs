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

//! What a handler sees of the call it is running.

use crate::rpc::RpcProxy;
use crate::serialization::{Call, CorrelationId, FromValue, RemoteError, Value, ValueError};
use std::collections::BTreeMap;

/// A call received from the peer, waiting to be executed.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundCall {
    /// Ids the peer sent the call with.
    pub correlation: CorrelationId,
    /// Function name and arguments.
    pub call: Call,
}

impl InboundCall {
    /// Pairs a call with its correlation ids.
    #[must_use]
    pub fn new(correlation: CorrelationId, call: Call) -> Self {
        Self { correlation, call }
    }
}

/// Arguments of an inbound call.
///
/// Accessors convert on the fly and report shape mismatches as
/// [`InvalidArguments`](crate::serialization::RemoteErrorKind::InvalidArguments)
/// errors, which go back to the caller.
///
/// # Examples
///
/// ```rust
/// use nestrpc::rpc::Arguments;
/// use nestrpc::serialization::Value;
/// use std::collections::BTreeMap;
///
/// let mut named = BTreeMap::new();
/// named.insert("age".to_string(), Value::from(12));
/// let args = Arguments::new(vec![Value::from("John")], named);
///
/// assert_eq!(args.positional::<String>(0).unwrap(), "John");
/// assert_eq!(args.named::<u32>("age").unwrap(), 12);
/// assert_eq!(args.named_or("height", 150u32).unwrap(), 150);
/// assert!(args.positional::<i64>(1).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    positional: Vec<Value>,
    named: BTreeMap<String, Value>,
}

impl Arguments {
    /// Creates an argument set.
    #[must_use]
    pub fn new(positional: Vec<Value>, named: BTreeMap<String, Value>) -> Self {
        Self { positional, named }
    }

    /// Converts positional argument `index`.
    pub fn positional<T: FromValue>(&self, index: usize) -> Result<T, RemoteError> {
        let value = self
            .positional
            .get(index)
            .ok_or(ValueError::MissingPositional { index })?;
        T::from_value(value.clone()).map_err(|e| {
            RemoteError::invalid_arguments(format!("argument {index}: {e}"))
        })
    }

    /// Converts named argument `name`.
    pub fn named<T: FromValue>(&self, name: &str) -> Result<T, RemoteError> {
        let value = self.named.get(name).ok_or_else(|| ValueError::MissingNamed {
            name: name.to_string(),
        })?;
        T::from_value(value.clone())
            .map_err(|e| RemoteError::invalid_arguments(format!("argument '{name}': {e}")))
    }

    /// Converts named argument `name`, or returns `default` if it is absent.
    pub fn named_or<T: FromValue>(&self, name: &str, default: T) -> Result<T, RemoteError> {
        if self.named.contains_key(name) {
            self.named(name)
        } else {
            Ok(default)
        }
    }

    /// Raw positional values.
    #[must_use]
    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    /// Raw named values.
    #[must_use]
    pub fn named_values(&self) -> &BTreeMap<String, Value> {
        &self.named
    }

    /// Number of positional arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Returns `true` if there are no arguments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Splits into positional and named values.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Value>, BTreeMap<String, Value>) {
        (self.positional, self.named)
    }
}

impl From<Call> for Arguments {
    fn from(call: Call) -> Self {
        Self::new(call.positional, call.named)
    }
}

/// Context of the inbound call a handler is running.
///
/// The [`proxy`](Self::proxy) issues calls over the same connection, which is
/// how a handler calls back into its caller before returning.
#[derive(Debug, Clone)]
pub struct CallContext {
    correlation: CorrelationId,
    function: String,
    proxy: RpcProxy,
}

impl CallContext {
    /// Creates a context.
    #[must_use]
    pub fn new(correlation: CorrelationId, function: impl Into<String>, proxy: RpcProxy) -> Self {
        Self {
            correlation,
            function: function.into(),
            proxy,
        }
    }

    /// Ids the caller sent the call with.
    #[must_use]
    pub fn correlation(&self) -> CorrelationId {
        self.correlation
    }

    /// The caller's call id.
    #[must_use]
    pub fn call_id(&self) -> u64 {
        self.correlation.call_id
    }

    /// Name the function was called by.
    #[must_use]
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Proxy over the connection the call arrived on.
    #[must_use]
    pub fn proxy(&self) -> &RpcProxy {
        &self.proxy
    }
}
