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

//! Process-wide table of outbound connections.

use crate::endpoint::Endpoint;
use crate::error::RpcError;
use crate::rpc::FunctionRegistry;
use crate::transport::{Connection, ConnectionConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Identifies a logical endpoint in a [`ConnectionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EndpointId {
    /// The one unnamed endpoint.
    Single,
    /// One of many endpoints, told apart by key.
    Keyed(u64),
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("single"),
            Self::Keyed(key) => write!(f, "keyed:{key}"),
        }
    }
}

impl From<u64> for EndpointId {
    fn from(key: u64) -> Self {
        Self::Keyed(key)
    }
}

/// Holds at most one live connection per [`EndpointId`].
///
/// Every connection the registry creates shares its function registry and
/// config. Concurrent [`get_or_create`](Self::get_or_create) calls for the
/// same id see the same connection.
///
/// # Examples
///
/// ```rust
/// use nestrpc::endpoint::{ConnectionRegistry, EndpointId};
/// use nestrpc::rpc::FunctionRegistry;
/// use nestrpc::transport::ConnectionConfig;
/// use std::sync::Arc;
///
/// let registry = ConnectionRegistry::new(
///     Arc::new(FunctionRegistry::new()),
///     ConnectionConfig::initiator(),
/// );
///
/// let a = registry.get_or_create(EndpointId::Keyed(5), "127.0.0.1:5555");
/// let b = registry.get_or_create(EndpointId::Keyed(5), "127.0.0.1:5555");
/// assert!(a.ptr_eq(&b));
/// assert_eq!(registry.len(), 1);
///
/// registry.close_all();
/// assert!(registry.is_empty());
/// ```
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<EndpointId, Connection>>,
    functions: Arc<FunctionRegistry>,
    config: ConnectionConfig,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(functions: Arc<FunctionRegistry>, config: ConnectionConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            functions,
            config,
        }
    }

    /// The process-wide registry, created on first use with an empty
    /// function registry and the default initiator config.
    pub fn global() -> &'static ConnectionRegistry {
        static GLOBAL: OnceLock<ConnectionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            ConnectionRegistry::new(Arc::new(FunctionRegistry::new()), ConnectionConfig::initiator())
        })
    }

    /// Functions served to every peer this registry connects to.
    #[must_use]
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.functions
    }

    /// Config used for new connections.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the connection for `id`, creating one for `address` if there
    /// is none or the existing one has been stopped.
    ///
    /// New connections are not started. An existing live connection is
    /// returned as is, even if it dials a different address.
    pub fn get_or_create(&self, id: EndpointId, address: &str) -> Connection {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&id) {
            if existing.is_running() {
                if existing.address() != address {
                    tracing::debug!(endpoint = %id, current = %existing.address(), requested = %address, "Endpoint already bound to another address");
                }
                return existing.clone();
            }
            tracing::debug!(endpoint = %id, "Replacing stopped connection");
        }

        let connection = Connection::initiator(address, self.functions.clone(), self.config.clone());
        entries.insert(id, connection.clone());
        tracing::debug!(endpoint = %id, peer = %address, "Created connection");
        connection
    }

    /// The connection registered for `id`.
    #[must_use]
    pub fn get(&self, id: EndpointId) -> Option<Connection> {
        self.entries.lock().get(&id).cloned()
    }

    /// Removes the entry for `id` without stopping it.
    ///
    /// # Errors
    ///
    /// [`RpcError::UnknownEndpoint`] if nothing is registered under `id`.
    pub fn remove(&self, id: EndpointId) -> Result<Connection, RpcError> {
        self.entries
            .lock()
            .remove(&id)
            .ok_or(RpcError::UnknownEndpoint { id })
    }

    /// Empties the registry and returns what it held.
    pub fn remove_all(&self) -> HashMap<EndpointId, Connection> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Empties the registry and stops every connection it held.
    pub fn close_all(&self) {
        let entries = self.remove_all();
        tracing::debug!(count = entries.len(), "Closing all endpoints");
        for connection in entries.into_values() {
            connection.stop();
        }
    }

    /// Ids currently registered, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<EndpointId> {
        let mut ids: Vec<EndpointId> = self.entries.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Handle for endpoint `id`.
    #[must_use]
    pub fn endpoint(&self, id: EndpointId) -> Endpoint<'_> {
        Endpoint::new(self, id)
    }

    /// Handle for the single unnamed endpoint.
    #[must_use]
    pub fn single(&self) -> Endpoint<'_> {
        self.endpoint(EndpointId::Single)
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("endpoints", &self.ids())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(Arc::new(FunctionRegistry::new()), ConnectionConfig::initiator())
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = registry();
        let a = registry.get_or_create(EndpointId::Keyed(5), "127.0.0.1:1");
        let b = registry.get_or_create(EndpointId::Keyed(5), "127.0.0.1:2");
        assert!(a.ptr_eq(&b));
        assert_eq!(b.address(), "127.0.0.1:1");

        let single = registry.get_or_create(EndpointId::Single, "127.0.0.1:1");
        assert!(!single.ptr_eq(&a));
        assert_eq!(registry.len(), 2);
        registry.close_all();
    }

    #[test]
    fn test_concurrent_get_or_create() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.get_or_create(EndpointId::Keyed(1), "127.0.0.1:1"))
            })
            .collect();
        let connections: Vec<Connection> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(connections.windows(2).all(|w| w[0].ptr_eq(&w[1])));
        assert_eq!(registry.len(), 1);
        registry.close_all();
    }

    #[test]
    fn test_stopped_connection_is_replaced() {
        let registry = registry();
        let first = registry.get_or_create(EndpointId::Single, "127.0.0.1:1");
        first.stop();
        let second = registry.get_or_create(EndpointId::Single, "127.0.0.1:1");
        assert!(!first.ptr_eq(&second));
        assert!(second.is_running());
        registry.close_all();
    }

    #[test]
    fn test_remove_unknown() {
        let err = registry().remove(EndpointId::Keyed(3)).unwrap_err();
        assert!(matches!(err, RpcError::UnknownEndpoint { id: EndpointId::Keyed(3) }));
    }

    #[test]
    fn test_remove_all_returns_entries() {
        let registry = registry();
        registry.get_or_create(EndpointId::Keyed(1), "127.0.0.1:1");
        registry.get_or_create(EndpointId::Keyed(2), "127.0.0.1:1");
        let removed = registry.remove_all();
        assert_eq!(removed.len(), 2);
        assert!(registry.is_empty());
        for connection in removed.into_values() {
            connection.stop();
        }
    }

    #[test]
    fn test_endpoint_id_display() {
        assert_eq!(EndpointId::Single.to_string(), "single");
        assert_eq!(EndpointId::from(7).to_string(), "keyed:7");
    }
}
