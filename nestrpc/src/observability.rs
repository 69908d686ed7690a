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

//! Observability support for nestrpc.
//!
//! Logging goes through the `tracing` facade; the library never installs a
//! subscriber. Applications that want output install one themselves:
//!
//! ```rust,no_run
//! tracing_subscriber::fmt()
//!     .with_env_filter("nestrpc=debug")
//!     .init();
//! ```
//!
//! Counters are kept per connection in [`ConnectionMetrics`] and exposed
//! through [`Connection::metrics`](crate::transport::Connection::metrics).

mod metrics;

pub use metrics::{ConnectionMetrics, MetricsSnapshot};
