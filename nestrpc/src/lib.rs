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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod correlation;
pub mod endpoint;
pub mod error;
pub mod observability;
pub mod rpc;
pub mod serialization;
pub mod transport;

pub use endpoint::{ConnectionRegistry, Endpoint, EndpointId};
pub use error::RpcError;
pub use rpc::{Arguments, CallContext, FunctionRegistry, RpcProxy};
pub use serialization::{FromValue, IntoValue, RemoteError, RemoteErrorKind, Value};
pub use transport::{Connection, ConnectionConfig, Listener};
