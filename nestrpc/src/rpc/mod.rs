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

//! Calling and serving remote functions.
//!
//! A [`FunctionRegistry`] holds the functions this side offers. Inbound calls
//! are executed either by a connection's [`DispatchExecutor`] or, with
//! automatic execution off, by the application through
//! [`RpcProxy::serve_one`]. Outbound calls go through an [`RpcProxy`], or a
//! typed client declared with [`remote_functions!`](crate::remote_functions).
//!
//! A handler may call back into its caller through
//! [`CallContext::proxy`] before it returns. The caller's thread runs that
//! nested call while it waits, so arbitrarily deep call chains need no free
//! worker.

mod context;
mod executor;
mod macros;
mod proxy;
mod registry;

pub use context::{Arguments, CallContext, InboundCall};
pub use executor::DispatchExecutor;
pub use proxy::RpcProxy;
pub use registry::FunctionRegistry;
