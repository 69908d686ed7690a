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

//! Accept side of the protocol.
//!
//! A [`Listener`] binds a TCP address and turns every accepted socket into
//! an [`Accepted`](crate::transport::ConnectionRole::Accepted) [`Connection`] that runs
//! inbound calls on its worker pool.

use crate::rpc::FunctionRegistry;
use crate::transport::{Connection, ConnectionConfig, TransportError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Accepts connections on a dedicated thread.
///
/// # Examples
///
/// ```rust,no_run
/// use nestrpc::rpc::FunctionRegistry;
/// use nestrpc::transport::{ConnectionConfig, Listener};
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let functions = Arc::new(FunctionRegistry::new());
/// functions.register("ping", |_ctx, _args| Ok("pong"));
///
/// let listener = Listener::bind("127.0.0.1:0", functions, ConnectionConfig::accepted())?;
/// println!("listening on {}", listener.local_addr());
/// listener.stop();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerInner>,
}

struct ListenerInner {
    local_addr: SocketAddr,
    running: AtomicBool,
    clients: Mutex<HashMap<SocketAddr, Connection>>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
    functions: Arc<FunctionRegistry>,
    config: ConnectionConfig,
}

impl Listener {
    /// Binds `address` and starts accepting.
    ///
    /// # Errors
    ///
    /// [`TransportError::BindFailed`] if the address cannot be bound, or
    /// [`TransportError::Io`] if the accept thread cannot be spawned.
    pub fn bind(
        address: impl ToSocketAddrs + ToString,
        functions: Arc<FunctionRegistry>,
        config: ConnectionConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(&address).map_err(|source| TransportError::BindFailed {
            address: address.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;

        let inner = Arc::new(ListenerInner {
            local_addr,
            running: AtomicBool::new(true),
            clients: Mutex::new(HashMap::new()),
            accept_thread: Mutex::new(None),
            functions,
            config,
        });

        let weak = Arc::downgrade(&inner);
        let handle = thread::Builder::new()
            .name(format!("nestrpc-listener-{local_addr}"))
            .spawn(move || accept_loop(listener, weak))?;
        *inner.accept_thread.lock() = Some(handle);

        tracing::info!(%local_addr, "Listening");
        Ok(Self { inner })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Number of live client connections.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.clients.lock().len()
    }

    /// Live client connections.
    #[must_use]
    pub fn clients(&self) -> Vec<Connection> {
        self.inner.clients.lock().values().cloned().collect()
    }

    /// Returns `true` until [`stop`](Self::stop) is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Stops accepting and stops every client connection. Idempotent.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        // accept() only returns once a connection arrives.
        let wake = wake_address(self.inner.local_addr);
        if let Err(e) = TcpStream::connect_timeout(&wake, Duration::from_secs(1)) {
            tracing::debug!(error = %e, "Could not wake accept thread");
        }
        let handle = self.inner.accept_thread.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::error!("Accept thread panicked");
            }
        }

        let clients: Vec<Connection> = self.inner.clients.lock().drain().map(|(_, c)| c).collect();
        for client in clients {
            client.stop();
        }
        tracing::info!(local_addr = %self.inner.local_addr, "Listener stopped");
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("local_addr", &self.inner.local_addr)
            .field("running", &self.is_running())
            .field("clients", &self.client_count())
            .finish()
    }
}

fn wake_address(local: SocketAddr) -> SocketAddr {
    match local {
        SocketAddr::V4(v4) if v4.ip().is_unspecified() => {
            SocketAddr::from((Ipv4Addr::LOCALHOST, v4.port()))
        }
        SocketAddr::V6(v6) if v6.ip().is_unspecified() => {
            SocketAddr::from((Ipv6Addr::LOCALHOST, v6.port()))
        }
        other => other,
    }
}

fn accept_loop(listener: TcpListener, weak: Weak<ListenerInner>) {
    for stream in listener.incoming() {
        let Some(inner) = weak.upgrade() else {
            break;
        };
        if !inner.running.load(Ordering::SeqCst) {
            break;
        }

        let (stream, peer) = match stream.and_then(|s| s.peer_addr().map(|peer| (s, peer))) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Accept failed");
                continue;
            }
        };

        let connection = match Connection::accepted(
            stream,
            Arc::clone(&inner.functions),
            inner.config.clone(),
        ) {
            Ok(connection) => connection,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "Dropping accepted socket");
                continue;
            }
        };

        let clients = Weak::clone(&weak);
        connection.set_on_close(move |_| {
            if let Some(inner) = clients.upgrade() {
                inner.clients.lock().remove(&peer);
            }
        });
        inner.clients.lock().insert(peer, connection.clone());
        tracing::info!(%peer, "Accepted connection");
        connection.start(false, None);
    }
    tracing::debug!("Accept thread finished");
}
