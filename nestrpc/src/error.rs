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

//! Top-level error type.
//!
//! [`RpcError`] composes the per-layer errors and separates the three ways a
//! remote call can end badly:
//!
//! - **Transport**: the call never completed on the wire (connection lost,
//!   send failed, not connected). Check with [`RpcError::is_transport_error`].
//! - **Timeout**: the peer did not answer in time. Check with
//!   [`RpcError::is_timeout`].
//! - **Remote**: the peer answered with an error value. Check with
//!   [`RpcError::is_remote`].
//!
//! # Examples
//!
//! ```rust
//! use nestrpc::RpcError;
//! use nestrpc::serialization::RemoteError;
//! use nestrpc::transport::TransportError;
//!
//! let err: RpcError = TransportError::Closed.into();
//! assert!(err.is_transport_error());
//!
//! let err = RpcError::Remote(RemoteError::failed("disk full"));
//! assert!(err.is_remote());
//! assert!(!err.should_close_transport());
//! ```

use crate::correlation::CorrelationError;
use crate::endpoint::EndpointId;
use crate::serialization::{RemoteError, ValueError, WireError};
use crate::transport::TransportError;
use std::time::Duration;

/// Error returned by public operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A packet could not be encoded or decoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Correlation bookkeeping was violated, e.g. a result with no open call.
    #[error("correlation error: {0}")]
    Correlation(#[from] CorrelationError),

    /// There is no live connection to use.
    #[error("not connected")]
    NotConnected,

    /// Writing a packet failed; the connection has been marked disconnected.
    #[error("send failed: {source}")]
    SendFailed {
        /// The write error.
        #[source]
        source: TransportError,
    },

    /// No result arrived in time. The call has been abandoned.
    #[error("call {call_id} timed out after {duration:?}")]
    Timeout {
        /// Id of the abandoned call.
        call_id: u64,
        /// How long the caller waited.
        duration: Duration,
    },

    /// The peer returned an error value.
    #[error("remote error: {0}")]
    Remote(RemoteError),

    /// The connection dropped or stopped while the call was waiting.
    #[error("connection lost while waiting for call {call_id}")]
    ConnectionLost {
        /// Id of the failed call.
        call_id: u64,
    },

    /// No connection is registered under this endpoint id.
    #[error("unknown endpoint {id}")]
    UnknownEndpoint {
        /// The endpoint asked for.
        id: EndpointId,
    },

    /// A return value did not convert to the requested type.
    #[error("conversion error: {0}")]
    Conversion(#[from] ValueError),
}

impl RpcError {
    /// Returns `true` if the call failed below the application layer.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::NotConnected
                | Self::SendFailed { .. }
                | Self::ConnectionLost { .. }
        )
    }

    /// Returns `true` for [`RpcError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` for [`RpcError::Remote`].
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// The remote error value, if the peer reported one.
    #[must_use]
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if retrying the call may succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) | Self::SendFailed { source: e } => e.is_recoverable(),
            Self::NotConnected | Self::ConnectionLost { .. } | Self::Timeout { .. } => true,
            Self::Wire(e) => !e.is_fatal(),
            Self::Correlation(_)
            | Self::Remote(_)
            | Self::UnknownEndpoint { .. }
            | Self::Conversion(_) => false,
        }
    }

    /// Returns `true` if the error means the transport has to be closed.
    #[must_use]
    pub fn should_close_transport(&self) -> bool {
        match self {
            Self::Transport(e) | Self::SendFailed { source: e } => e.should_close_transport(),
            Self::Wire(e) => e.is_fatal(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::RemoteErrorKind;

    #[test]
    fn test_outcome_classes() {
        let lost = RpcError::ConnectionLost { call_id: 4 };
        assert!(lost.is_transport_error());
        assert!(!lost.is_timeout());

        let timeout = RpcError::Timeout {
            call_id: 4,
            duration: Duration::from_secs(1),
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_transport_error());
        assert!(!timeout.is_remote());

        let remote = RpcError::Remote(RemoteError::function_not_found("f"));
        assert!(remote.is_remote());
        assert_eq!(remote.remote().map(|e| e.kind), Some(RemoteErrorKind::FunctionNotFound));
    }

    #[test]
    fn test_from_layers() {
        let err: RpcError = TransportError::NotConnected.into();
        assert!(err.is_transport_error());

        let err: RpcError = CorrelationError::NoOpenCall.into();
        assert!(matches!(err, RpcError::Correlation(CorrelationError::NoOpenCall)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_should_close_transport() {
        let err = RpcError::SendFailed {
            source: TransportError::lost("reset"),
        };
        assert!(err.should_close_transport());
        assert!(!RpcError::NotConnected.should_close_transport());
    }

    #[test]
    fn test_display() {
        let err = RpcError::Timeout {
            call_id: 9,
            duration: Duration::from_millis(500),
        };
        assert_eq!(err.to_string(), "call 9 timed out after 500ms");
        let err = RpcError::UnknownEndpoint {
            id: EndpointId::Keyed(5),
        };
        assert!(err.to_string().contains('5'));
    }
}
