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

//! Error types for the correlation layer.

use thiserror::Error;

/// Errors raised by [`CorrelationTracker`](super::CorrelationTracker).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    /// A result was sent while no call is open on the connection.
    #[error("no open call to answer")]
    NoOpenCall,

    /// A result was sent for a call that is not open as an inbound call.
    #[error("call {call_id} is not an open inbound call")]
    UnknownCall {
        /// The call id that was answered.
        call_id: u64,
    },
}
