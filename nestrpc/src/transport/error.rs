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

//! Transport layer error types.
//!
//! Transport errors describe failures of the TCP connection itself. The
//! reader thread recovers from most of them locally by marking the
//! connection disconnected and, for initiators, reconnecting. They reach the
//! caller only through a failed send or when reconnecting is disabled.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use nestrpc::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::ConnectionFailed {
///     address: "127.0.0.1:8080".to_string(),
///     source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
/// };
/// assert!(error.is_recoverable());
/// assert!(error.is_refused());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the socket failed.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// Address that was dialed
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// An established connection went away.
    ///
    /// Raised on a zero-length read or a reset from the peer.
    #[error("connection lost: {reason}")]
    ConnectionLost {
        /// Why the connection is considered gone
        reason: String,
        /// The underlying I/O error, if any
        #[source]
        source: Option<io::Error>,
    },

    /// Reading from the socket failed.
    #[error("read failed: {source}")]
    ReadFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Writing to the socket failed.
    #[error("write failed: {source}")]
    WriteFailed {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The socket accepted zero bytes of a packet.
    #[error("send failed after {written} of {total} bytes")]
    SendFailed {
        /// Bytes written before the socket stalled
        written: usize,
        /// Size of the encoded packet
        total: usize,
    },

    /// Connecting did not succeed within the allowed time.
    #[error("connect timed out after {duration:?}")]
    Timeout {
        /// Time spent trying
        duration: Duration,
    },

    /// The connection was stopped and cannot be used again.
    #[error("connection is closed")]
    Closed,

    /// No socket is currently open.
    #[error("connection is not connected")]
    NotConnected,

    /// The listener could not bind its address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// Address that failed to bind
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Any other I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl TransportError {
    /// Returns `true` if reconnecting or retrying may succeed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nestrpc::transport::TransportError;
    ///
    /// assert!(TransportError::NotConnected.is_recoverable());
    /// assert!(!TransportError::Closed.is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. }
            | TransportError::ConnectionLost { .. }
            | TransportError::SendFailed { .. }
            | TransportError::Timeout { .. }
            | TransportError::NotConnected => true,

            TransportError::ReadFailed { source }
            | TransportError::WriteFailed { source }
            | TransportError::Io { source } => is_transient(source.kind()),

            TransportError::Closed | TransportError::BindFailed { .. } => false,
        }
    }

    /// Returns `true` if the socket is unusable after this error.
    #[must_use]
    pub fn should_close_transport(&self) -> bool {
        match self {
            TransportError::ConnectionLost { .. }
            | TransportError::SendFailed { .. }
            | TransportError::Closed => true,

            TransportError::ConnectionFailed { .. }
            | TransportError::Timeout { .. }
            | TransportError::NotConnected
            | TransportError::BindFailed { .. } => false,

            TransportError::ReadFailed { source }
            | TransportError::WriteFailed { source }
            | TransportError::Io { source } => !matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
        }
    }

    /// Returns `true` if the peer actively refused the connection.
    #[must_use]
    pub fn is_refused(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { source, .. }
                if source.kind() == io::ErrorKind::ConnectionRefused
        )
    }

    pub(crate) fn lost(reason: impl Into<String>) -> Self {
        TransportError::ConnectionLost {
            reason: reason.into(),
            source: None,
        }
    }
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Io { source: error }
    }
}
