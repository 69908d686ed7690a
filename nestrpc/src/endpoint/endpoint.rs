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

//! Handle for one registry slot.

use crate::endpoint::{ConnectionRegistry, EndpointId};
use crate::error::RpcError;
use crate::rpc::RpcProxy;
use crate::transport::Connection;
use std::thread;
use std::time::Duration;

/// Connect, call and close through one [`EndpointId`] of a registry.
///
/// Obtained from [`ConnectionRegistry::endpoint`] or
/// [`ConnectionRegistry::single`].
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'r> {
    registry: &'r ConnectionRegistry,
    id: EndpointId,
}

impl<'r> Endpoint<'r> {
    pub(crate) fn new(registry: &'r ConnectionRegistry, id: EndpointId) -> Self {
        Self { registry, id }
    }

    /// The id this handle addresses.
    #[must_use]
    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Starts the endpoint's connection to `address`.
    ///
    /// With `blocking` set, waits up to `timeout` for the connection to come
    /// up; a connection that does not make it in time is stopped and will be
    /// replaced by the next `connect`. An already running connection is
    /// reused.
    ///
    /// Returns whether the endpoint is connected.
    pub fn connect(&self, address: &str, blocking: bool, timeout: Option<Duration>) -> bool {
        let connection = self.registry.get_or_create(self.id, address);
        let connected = connection.start(blocking, timeout);
        if blocking && !connected {
            tracing::warn!(endpoint = %self.id, peer = %address, ?timeout, "Endpoint did not connect in time");
        }
        connected
    }

    /// Stops the endpoint's connection and frees the slot.
    ///
    /// With `blocking` set, waits up to `timeout` for the stop to finish.
    /// Called from a handler running on the connection's own threads, it
    /// never waits: the stop joins the calling thread and so completes only
    /// after the handler returns. Does nothing if the endpoint has no
    /// connection.
    pub fn close_connection(&self, blocking: bool, timeout: Option<Duration>) {
        let Ok(connection) = self.registry.remove(self.id) else {
            return;
        };
        let blocking = blocking && !connection.is_own_thread();

        let stopper = connection.clone();
        let spawned = thread::Builder::new()
            .name(format!("nestrpc-close-{}", self.id))
            .spawn(move || stopper.stop());
        if let Err(e) = spawned {
            tracing::debug!(endpoint = %self.id, error = %e, "Stopping connection inline");
            connection.stop();
            return;
        }

        if blocking && !connection.wait_closed(timeout) {
            tracing::warn!(endpoint = %self.id, ?timeout, "Connection still closing");
        }
    }

    /// Returns `true` if the endpoint has a connected connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection().is_some_and(|c| c.is_connected())
    }

    /// The endpoint's connection, if one is registered.
    #[must_use]
    pub fn connection(&self) -> Option<Connection> {
        self.registry.get(self.id)
    }

    /// Proxy for calling functions on the endpoint's peer.
    ///
    /// # Errors
    ///
    /// [`RpcError::UnknownEndpoint`] if the endpoint has no connection.
    pub fn proxy(&self) -> Result<RpcProxy, RpcError> {
        self.connection()
            .map(|c| c.proxy())
            .ok_or(RpcError::UnknownEndpoint { id: self.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::FunctionRegistry;
    use crate::transport::ConnectionConfig;
    use std::sync::Arc;

    #[test]
    fn test_unconnected_endpoint() {
        let registry =
            ConnectionRegistry::new(Arc::new(FunctionRegistry::new()), ConnectionConfig::initiator());
        let endpoint = registry.endpoint(EndpointId::Keyed(2));
        assert_eq!(endpoint.id(), EndpointId::Keyed(2));
        assert!(!endpoint.is_connected());
        assert!(matches!(endpoint.proxy(), Err(RpcError::UnknownEndpoint { .. })));
        endpoint.close_connection(true, Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_close_frees_slot() {
        let registry =
            ConnectionRegistry::new(Arc::new(FunctionRegistry::new()), ConnectionConfig::initiator());
        let connection = registry.get_or_create(EndpointId::Single, "127.0.0.1:1");
        registry.single().close_connection(true, Some(Duration::from_secs(5)));
        assert!(registry.is_empty());
        assert!(!connection.is_running());
        assert!(registry.single().connection().is_none());
    }
}
