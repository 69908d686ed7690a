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

//! Calling remote functions and serving inbound calls.

use crate::error::RpcError;
use crate::rpc::{CallContext, InboundCall};
use crate::serialization::{Call, CallResult, CorrelationId, FromValue, Value};
use crate::transport::{Connection, WeakConnection};
use std::collections::BTreeMap;
use std::time::Duration;

/// Caller-side handle to a connection.
///
/// A proxy holds the connection weakly, so handlers and worker threads can
/// keep one without keeping the connection alive. Once the connection is
/// gone every call fails with [`RpcError::NotConnected`].
///
/// # Examples
///
/// ```rust,no_run
/// use nestrpc::rpc::FunctionRegistry;
/// use nestrpc::transport::{Connection, ConnectionConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), nestrpc::RpcError> {
/// let connection = Connection::initiator(
///     "127.0.0.1:5555",
///     Arc::new(FunctionRegistry::new()),
///     ConnectionConfig::initiator(),
/// );
/// connection.start(true, Some(Duration::from_secs(5)));
///
/// let proxy = connection.proxy();
/// let sum: i64 = proxy.call_typed("add", vec![1.into(), 2.into()], Default::default(), None)?;
/// assert_eq!(sum, 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RpcProxy {
    connection: WeakConnection,
}

impl RpcProxy {
    /// Creates a proxy for `connection`.
    #[must_use]
    pub fn new(connection: &Connection) -> Self {
        Self {
            connection: connection.downgrade(),
        }
    }

    /// A proxy bound to no connection; every call fails.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// The connection, if it still exists.
    pub fn connection(&self) -> Result<Connection, RpcError> {
        self.connection.upgrade().ok_or(RpcError::NotConnected)
    }

    /// Returns `true` if the connection exists and is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .upgrade()
            .is_some_and(|connection| connection.is_connected())
    }

    /// Calls `name` on the peer and returns its return value.
    ///
    /// `timeout` falls back to the connection's default call timeout; with
    /// neither the call waits until the result arrives or the connection stops.
    ///
    /// # Errors
    ///
    /// Transport and timeout failures as described on
    /// [`Connection::call`], plus [`RpcError::Remote`] when the peer reports an
    /// error instead of a value.
    pub fn call(
        &self,
        name: &str,
        positional: Vec<Value>,
        named: BTreeMap<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, RpcError> {
        self.invoke(
            Call {
                name: name.to_string(),
                positional,
                named,
            },
            timeout,
        )
    }

    /// Like [`call`](Self::call), converting the return value to `R`.
    pub fn call_typed<R: FromValue>(
        &self,
        name: &str,
        positional: Vec<Value>,
        named: BTreeMap<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<R, RpcError> {
        let value = self.call(name, positional, named, timeout)?;
        Ok(R::from_value(value)?)
    }

    /// Sends a prepared call and waits for its return value.
    pub fn invoke(&self, call: Call, timeout: Option<Duration>) -> Result<Value, RpcError> {
        let connection = self.connection()?;
        let timeout = timeout.or(connection.config().default_call_timeout());
        let name = call.name.clone();
        let mut result = connection.call(call, timeout)?;
        match result.take_return_value() {
            Value::Error(error) => {
                tracing::debug!(function = %name, error = %error, "Remote function failed");
                Err(RpcError::Remote(error))
            }
            value => Ok(value),
        }
    }

    /// Executes an inbound call and sends its result back.
    ///
    /// Runs on whichever thread picked the call up: a dispatch worker, a
    /// caller waiting for a nested result, or the application through
    /// [`serve_one`](Self::serve_one).
    pub fn handle_call(&self, inbound: InboundCall) -> Result<CorrelationId, RpcError> {
        let connection = self.connection()?;
        connection.metrics().record_call_dispatched();

        let call_id = inbound.correlation.call_id;
        let ctx = CallContext::new(inbound.correlation, inbound.call.name.clone(), self.clone());
        tracing::trace!(function = %inbound.call.name, call_id, "Executing call");

        let value = connection.functions().invoke(&ctx, inbound.call);
        connection.send_result(call_id, CallResult::returning(value))
    }

    /// Executes the next queued inbound call, waiting up to `timeout` for one.
    ///
    /// Returns `Ok(false)` if no call arrived. Meant for connections whose
    /// automatic execution is turned off.
    pub fn serve_one(&self, timeout: Option<Duration>) -> Result<bool, RpcError> {
        let connection = self.connection()?;
        match connection.next_call(timeout) {
            Some(inbound) => {
                self.handle_call(inbound)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_proxy_fails() {
        let proxy = RpcProxy::detached();
        assert!(!proxy.is_connected());
        let err = proxy.call("f", vec![], BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, RpcError::NotConnected));
        assert!(matches!(proxy.serve_one(None), Err(RpcError::NotConnected)));
    }

    #[test]
    fn test_handle_call_without_connection() {
        let inbound = InboundCall::new(CorrelationId::new(1, 1), Call::new("f"));
        let err = RpcProxy::detached().handle_call(inbound).unwrap_err();
        assert!(matches!(err, RpcError::NotConnected));
    }
}
