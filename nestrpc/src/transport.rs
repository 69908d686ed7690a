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

//! Transport layer for nestrpc.
//!
//! Everything here runs on plain threads over blocking `std::net` sockets:
//!
//! - [`Connection`]: one persistent TCP connection with its reader thread,
//!   send lock, correlation state and optional worker pool
//! - [`Listener`]: accept loop creating [`ConnectionRole::Accepted`] connections
//! - [`ConnectionConfig`]: retry, reconnect, execution and framing settings
//! - [`strategy`]: what an initiator does after losing its connection
//! - [`TransportError`]: socket-level failures
//!
//! # Examples
//!
//! ```rust,no_run
//! use nestrpc::rpc::FunctionRegistry;
//! use nestrpc::serialization::Call;
//! use nestrpc::transport::{Connection, ConnectionConfig, Listener};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server_functions = Arc::new(FunctionRegistry::new());
//! server_functions.register("add", |_ctx, args| {
//!     Ok(args.positional::<i64>(0)? + args.positional::<i64>(1)?)
//! });
//! let listener = Listener::bind("127.0.0.1:0", server_functions, ConnectionConfig::accepted())?;
//!
//! let client = Connection::initiator(
//!     listener.local_addr().to_string(),
//!     Arc::new(FunctionRegistry::new()),
//!     ConnectionConfig::initiator(),
//! );
//! assert!(client.start(true, Some(Duration::from_secs(5))));
//!
//! let result = client.call(Call::new("add").arg(2).arg(3), Some(Duration::from_secs(5)))?;
//! println!("{:?}", result.return_value());
//!
//! client.stop();
//! listener.stop();
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod listener;
mod state;
pub mod strategy;

pub use config::{ConnectionConfig, ConnectionRole};
pub use connection::{Connection, PendingCall, WeakConnection};
pub use error::TransportError;
pub use listener::Listener;
pub use state::ConnectionState;
