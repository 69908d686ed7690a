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

//! Call correlation for a single connection.
//!
//! - [`CorrelationTracker`]: open-call stack, call ids and sequence numbers
//! - [`PendingResults`]: callers blocked on a result, woken by the reader

mod error;
mod pending;
mod tracker;

pub use error::CorrelationError;
pub use pending::PendingResults;
pub use tracker::{CallDirection, CorrelationTracker, OpenCall, SequenceCheck};
