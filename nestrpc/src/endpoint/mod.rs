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

//! Named outbound connections.
//!
//! A [`ConnectionRegistry`] maps [`EndpointId`]s to connections and hands out
//! [`Endpoint`] handles for them. Applications talking to one peer use the
//! [`single`](ConnectionRegistry::single) endpoint; applications talking to
//! several use [`Keyed`](EndpointId::Keyed) ids.
//!
//! # Examples
//!
//! ```rust,no_run
//! use nestrpc::endpoint::ConnectionRegistry;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), nestrpc::RpcError> {
//! let registry = ConnectionRegistry::global();
//! registry.functions().register("ping", |_ctx, _args| Ok("pong"));
//!
//! let server = registry.single();
//! if server.connect("127.0.0.1:5555", true, Some(Duration::from_secs(5))) {
//!     let reply = server.proxy()?.call("status", vec![], Default::default(), None)?;
//!     println!("{reply}");
//! }
//! server.close_connection(true, None);
//! # Ok(())
//! # }
//! ```

mod endpoint;
mod registry;

pub use endpoint::Endpoint;
pub use registry::{ConnectionRegistry, EndpointId};
