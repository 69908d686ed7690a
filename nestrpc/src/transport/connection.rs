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

//! A single persistent TCP connection carrying calls in both directions.
//!
//! # Threads
//!
//! Every connection owns one reader thread for its whole lifetime. The reader
//! dials the peer (initiators only), reads the socket, reassembles packets
//! and routes them:
//!
//! - results go to the caller blocked on that call id
//! - calls go to one shared inbound queue
//!
//! The inbound queue is drained by the [`DispatchExecutor`] worker pool when
//! auto-execution is on, by callers blocked in
//! [`wait_for_result`](Connection::wait_for_result) (which run calls inline,
//! so a peer can nest a call back into a caller that is waiting), and by
//! [`next_call`](Connection::next_call) in manual mode.
//!
//! # Sending
//!
//! Writers are serialized by a per-connection send lock. Correlation ids are
//! assigned while that lock is held, so packets leave in `seq_id` order.
//!
//! # Stopping
//!
//! [`stop`](Connection::stop) shuts the socket down, which is what unblocks
//! the reader's pending read and any write stuck on a peer that stopped
//! reading, then joins the reader and the workers unless it runs on one of
//! those threads. The shutdown goes through a separate handle of the socket
//! that is never held across I/O, so it does not wait for the send lock.

use crate::correlation::{CorrelationError, CorrelationTracker, PendingResults, SequenceCheck};
use crate::error::RpcError;
use crate::observability::ConnectionMetrics;
use crate::rpc::{DispatchExecutor, FunctionRegistry, InboundCall, RpcProxy};
use crate::serialization::{
    Call, CallResult, CorrelationId, HEADER_SIZE, Header, Packet, Payload, StreamReassembler,
    WireError, codec,
};
use crate::transport::state::StateCell;
use crate::transport::strategy::{FixedDelay, ReconnectionStrategy};
use crate::transport::{ConnectionConfig, ConnectionRole, ConnectionState, TransportError};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use crossbeam::select;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
#[cfg(feature = "observability")]
use tracing::instrument;

/// Bounds for a single dial attempt. Within them a dial lasts one
/// `retry_interval`, so `stop()` never waits long on a silent address.
const MIN_DIAL_TIMEOUT: Duration = Duration::from_secs(1);
const MAX_DIAL_TIMEOUT: Duration = Duration::from_secs(10);

type CloseCallback = Box<dyn FnOnce(&Connection) + Send>;

/// An outbound call that was sent and awaits its result.
#[derive(Debug)]
pub struct PendingCall {
    correlation: CorrelationId,
    receiver: Receiver<CallResult>,
}

impl PendingCall {
    /// Ids the call was sent with.
    #[must_use]
    pub fn correlation(&self) -> CorrelationId {
        self.correlation
    }

    /// Call id the result will carry.
    #[must_use]
    pub fn call_id(&self) -> u64 {
        self.correlation.call_id
    }
}

/// Handle to a connection. Clones share the same socket and threads.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`Connection`].
#[derive(Clone, Default)]
pub struct WeakConnection {
    inner: Weak<Inner>,
}

impl WeakConnection {
    /// Returns the connection if it still exists.
    pub fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

impl fmt::Debug for WeakConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(connection) => f
                .debug_tuple("WeakConnection")
                .field(&connection.inner.address)
                .finish(),
            None => f.write_str("WeakConnection(<dropped>)"),
        }
    }
}

struct Inner {
    address: String,
    role: ConnectionRole,
    config: ConnectionConfig,
    strategy: Arc<dyn ReconnectionStrategy>,
    functions: Arc<FunctionRegistry>,
    state: StateCell,
    running: AtomicBool,
    /// Write half of the socket; the mutex is the send lock.
    writer: Mutex<Option<TcpStream>>,
    /// Second handle of the same socket, used to clone the read half and to
    /// shut the socket down without taking the send lock.
    closer: Mutex<Option<TcpStream>>,
    tracker: Mutex<CorrelationTracker>,
    pending: PendingResults<CallResult>,
    calls_tx: Sender<InboundCall>,
    calls_rx: Receiver<InboundCall>,
    /// Dropped by `stop()`; every receiver then wakes with a disconnect.
    shutdown_tx: Mutex<Option<Sender<()>>>,
    shutdown_rx: Receiver<()>,
    reader: Mutex<Option<JoinHandle<()>>>,
    executor: Mutex<Option<DispatchExecutor>>,
    on_close: Mutex<Option<CloseCallback>>,
    metrics: ConnectionMetrics,
}

impl Connection {
    fn with_parts(
        address: String,
        role: ConnectionRole,
        stream: Option<(TcpStream, TcpStream)>,
        functions: Arc<FunctionRegistry>,
        config: ConnectionConfig,
    ) -> Self {
        let (calls_tx, calls_rx) = channel::unbounded();
        let (shutdown_tx, shutdown_rx) = channel::bounded(0);
        let initial = if stream.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Connecting
        };
        let (writer, closer) = stream.unzip();
        Self {
            inner: Arc::new(Inner {
                address,
                role,
                strategy: config.reconnection_strategy(),
                config,
                functions,
                state: StateCell::new(initial),
                running: AtomicBool::new(true),
                writer: Mutex::new(writer),
                closer: Mutex::new(closer),
                tracker: Mutex::new(CorrelationTracker::new()),
                pending: PendingResults::new(),
                calls_tx,
                calls_rx,
                shutdown_tx: Mutex::new(Some(shutdown_tx)),
                shutdown_rx,
                reader: Mutex::new(None),
                executor: Mutex::new(None),
                on_close: Mutex::new(None),
                metrics: ConnectionMetrics::new(),
            }),
        }
    }

    /// Creates a connection that dials `address` once started.
    pub fn initiator(
        address: impl Into<String>,
        functions: Arc<FunctionRegistry>,
        config: ConnectionConfig,
    ) -> Self {
        Self::with_parts(
            address.into(),
            ConnectionRole::Initiator,
            None,
            functions,
            config,
        )
    }

    /// Wraps a socket returned by `accept`.
    ///
    /// # Errors
    ///
    /// Fails if the peer address cannot be read, which means the socket is
    /// already unusable.
    pub fn accepted(
        stream: TcpStream,
        functions: Arc<FunctionRegistry>,
        config: ConnectionConfig,
    ) -> Result<Self, TransportError> {
        let peer = stream.peer_addr()?;
        let _ = stream.set_nodelay(true);
        let closer = stream.try_clone()?;
        Ok(Self::with_parts(
            peer.to_string(),
            ConnectionRole::Accepted,
            Some((stream, closer)),
            functions,
            config,
        ))
    }

    /// Registers a callback run once when the connection has stopped.
    pub fn set_on_close(&self, callback: impl FnOnce(&Connection) + Send + 'static) {
        *self.inner.on_close.lock() = Some(Box::new(callback));
    }

    /// Starts the reader thread and, with auto-execution on, the worker pool.
    ///
    /// An initiator gives up its first dial once `timeout` (`None` waits
    /// forever) elapses and then stops. With `blocking` set, `start` also
    /// waits that long for the connection to come up and stops it if it does
    /// not. Calling `start` again on a running connection only repeats the
    /// wait.
    ///
    /// Returns whether the connection is connected.
    pub fn start(&self, blocking: bool, timeout: Option<Duration>) -> bool {
        if !self.is_running() {
            return false;
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        if !self.spawn_threads(deadline) {
            self.stop();
            return false;
        }

        if blocking {
            let state = self.inner.state.wait_until(timeout, |state| {
                state == ConnectionState::Connected || state.is_terminal()
            });
            if state != ConnectionState::Connected {
                tracing::debug!(peer = %self.inner.address, "Stopping connection after connect timeout");
                self.stop();
            }
        }
        self.is_connected()
    }

    fn spawn_threads(&self, deadline: Option<Instant>) -> bool {
        let mut reader = self.inner.reader.lock();
        if reader.is_some() {
            return true;
        }

        if self.inner.config.auto_execute() {
            match DispatchExecutor::start(self, self.inner.config.max_workers()) {
                Ok(executor) => *self.inner.executor.lock() = Some(executor),
                Err(e) => {
                    tracing::error!(peer = %self.inner.address, error = %e, "Failed to start dispatch workers");
                    return false;
                }
            }
        }

        let connection = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("nestrpc-reader-{}", self.inner.address))
            .spawn(move || connection.run_reader(deadline));
        match spawned {
            Ok(handle) => {
                *reader = Some(handle);
                true
            }
            Err(e) => {
                tracing::error!(peer = %self.inner.address, error = %e, "Failed to spawn reader thread");
                false
            }
        }
    }

    /// Dials the peer from the calling thread, retrying every
    /// `retry_interval` until connected, stopped, or `timeout` elapses.
    ///
    /// Started initiators dial on their reader thread; this is for callers
    /// that drive the connection themselves. Accepted connections cannot
    /// dial and return their current status.
    pub fn connect(&self, timeout: Option<Duration>) -> bool {
        if self.inner.role == ConnectionRole::Accepted {
            return self.is_connected();
        }
        let deadline = timeout.map(|t| Instant::now() + t);
        let strategy = FixedDelay::new(self.inner.config.retry_interval());
        self.connect_loop(deadline, &strategy)
    }

    fn connect_loop(&self, deadline: Option<Instant>, strategy: &dyn ReconnectionStrategy) -> bool {
        let mut attempt = 0u32;
        loop {
            if !self.is_running() {
                return false;
            }
            if self.is_connected() {
                return true;
            }
            self.inner.state.transition(ConnectionState::Connecting);

            let cap = self
                .inner
                .config
                .retry_interval()
                .clamp(MIN_DIAL_TIMEOUT, MAX_DIAL_TIMEOUT);
            let dial_timeout = deadline
                .map_or(cap, |d| d.saturating_duration_since(Instant::now()).min(cap))
                .max(Duration::from_millis(1));

            let error = match self.dial(dial_timeout) {
                Ok(stream) => {
                    if self.install(stream) {
                        strategy.on_connected();
                        tracing::info!(peer = %self.inner.address, attempt, "Connected");
                        return true;
                    }
                    return self.is_connected();
                }
                Err(error) => error,
            };

            if error.is_refused() {
                tracing::warn!(peer = %self.inner.address, attempt, "Connection refused, retrying");
            } else {
                tracing::error!(peer = %self.inner.address, attempt, error = %error, "Connect failed, retrying");
            }
            strategy.on_disconnected(&error);

            attempt = attempt.saturating_add(1);
            if !strategy.should_reconnect(attempt, &error) {
                tracing::warn!(peer = %self.inner.address, strategy = strategy.name(), "Giving up connecting");
                self.inner.state.transition(ConnectionState::Disconnected);
                return false;
            }

            let mut wait = strategy.next_delay(attempt);
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    tracing::warn!(peer = %self.inner.address, "Connection timeout");
                    self.inner.state.transition(ConnectionState::Disconnected);
                    return false;
                }
                wait = wait.min(remaining);
            }
            if self.sleep_unless_stopped(wait) {
                return false;
            }
        }
    }

    fn dial(&self, timeout: Duration) -> Result<(TcpStream, TcpStream), TransportError> {
        let failed = |source: io::Error| TransportError::ConnectionFailed {
            address: self.inner.address.clone(),
            source,
        };
        let addrs: Vec<SocketAddr> = self
            .inner
            .address
            .to_socket_addrs()
            .map_err(failed)?
            .collect();

        let mut last = io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing");
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    let closer = stream.try_clone().map_err(failed)?;
                    return Ok((stream, closer));
                }
                Err(e) => last = e,
            }
        }
        Err(failed(last))
    }

    /// Makes `stream` the connection's socket. Fresh sockets start from
    /// fresh correlation state.
    fn install(&self, (stream, closer): (TcpStream, TcpStream)) -> bool {
        let mut writer = self.inner.writer.lock();
        if !self.is_running() {
            let _ = stream.shutdown(Shutdown::Both);
            return false;
        }
        if writer.is_some() {
            let _ = stream.shutdown(Shutdown::Both);
            return true;
        }
        self.inner.tracker.lock().reset();
        *self.inner.closer.lock() = Some(closer);
        *writer = Some(stream);
        self.inner.state.transition(ConnectionState::Connected)
    }

    /// Shuts the current socket down without waiting for the send lock.
    /// Unblocks the reader and any sender stuck in a write.
    fn shutdown_socket(&self) {
        if let Some(closer) = self.inner.closer.lock().take() {
            let _ = closer.shutdown(Shutdown::Both);
        }
    }

    /// Returns `true` if `stop()` interrupted the sleep.
    fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        !matches!(
            self.inner.shutdown_rx.recv_timeout(duration),
            Err(RecvTimeoutError::Timeout)
        )
    }

    fn reader_clone(&self) -> Option<TcpStream> {
        let closer = self.inner.closer.lock();
        let stream = closer.as_ref()?;
        match stream.try_clone() {
            Ok(clone) => Some(clone),
            Err(e) => {
                tracing::error!(peer = %self.inner.address, error = %e, "Failed to clone socket for reading");
                None
            }
        }
    }

    fn run_reader(self, deadline: Option<Instant>) {
        tracing::debug!(peer = %self.inner.address, role = %self.inner.role, "Reader thread started");
        let mut reassembler = StreamReassembler::with_max_frame_size(self.inner.config.max_frame_size());
        let mut buffer = vec![0u8; self.inner.config.read_chunk_size()];
        let mut stream: Option<TcpStream> = None;
        let mut was_connected = false;

        while self.is_running() {
            let Some(socket) = stream.as_mut() else {
                if let Some(clone) = self.reader_clone() {
                    reassembler.reset();
                    stream = Some(clone);
                    was_connected = true;
                } else if !self.establish(was_connected, deadline) {
                    break;
                }
                continue;
            };

            match socket.read(&mut buffer) {
                Ok(0) => {
                    self.connection_lost(TransportError::lost("peer closed the connection"));
                    stream = None;
                }
                Ok(n) => {
                    if let ControlFlow::Break(reason) = self.process_chunk(&mut reassembler, &buffer[..n]) {
                        self.connection_lost(TransportError::lost(reason));
                        stream = None;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    if self.is_running() {
                        self.connection_lost(TransportError::ReadFailed { source: e });
                    }
                    stream = None;
                }
            }
        }

        if self.is_running() {
            self.stop();
        }
        tracing::debug!(peer = %self.inner.address, "Reader thread finished");
    }

    /// Brings the socket (back) up. Returns `false` when the reader should exit.
    ///
    /// `deadline` only bounds the first dial; reconnects follow the strategy.
    fn establish(&self, was_connected: bool, deadline: Option<Instant>) -> bool {
        if self.inner.role == ConnectionRole::Accepted {
            return false;
        }
        if !was_connected {
            let strategy = FixedDelay::new(self.inner.config.retry_interval());
            return self.connect_loop(deadline, &strategy);
        }

        let strategy = Arc::clone(&self.inner.strategy);
        if !strategy.should_reconnect(0, &TransportError::lost("reconnecting")) {
            return false;
        }
        let reconnected = self.connect_loop(None, strategy.as_ref());
        if reconnected {
            self.inner.metrics.record_reconnect();
        }
        reconnected
    }

    fn connection_lost(&self, error: TransportError) {
        if self.mark_disconnected() {
            tracing::warn!(peer = %self.inner.address, error = %error, "Disconnected");
            self.inner.strategy.on_disconnected(&error);
        }
    }

    /// Drops the socket and everything tied to it. Returns `true` if a socket
    /// was open.
    fn mark_disconnected(&self) -> bool {
        self.shutdown_socket();
        let stream = self.inner.writer.lock().take();
        let was_open = stream.is_some();
        if let Some(stream) = stream {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.inner.state.transition(ConnectionState::Disconnected);

        let failed = self.inner.pending.fail_all();
        if failed > 0 {
            tracing::debug!(peer = %self.inner.address, failed, "Failed calls awaiting results");
        }
        self.inner.tracker.lock().reset();
        while self.inner.calls_rx.try_recv().is_ok() {}
        was_open
    }

    fn process_chunk(
        &self,
        reassembler: &mut StreamReassembler,
        chunk: &[u8],
    ) -> ControlFlow<String> {
        let mut next = reassembler.add_chunk(chunk);
        loop {
            match next {
                Ok(Some(packet)) => self.route_packet(packet)?,
                Ok(None) => return ControlFlow::Continue(()),
                Err(e) if e.is_fatal() => {
                    self.inner.metrics.record_malformed();
                    tracing::error!(peer = %self.inner.address, error = %e, "Unrecoverable framing error");
                    return ControlFlow::Break(e.to_string());
                }
                Err(e) => {
                    self.inner.metrics.record_malformed();
                    tracing::warn!(
                        peer = %self.inner.address,
                        call_id = e.header.map(|h| h.call_id),
                        seq_id = e.header.map(|h| h.seq_id),
                        error = %e,
                        "Dropping malformed packet"
                    );
                    // The packet still used up its sequence number.
                    if let Some(header) = e.header {
                        self.check_sequence(&mut self.inner.tracker.lock(), &header)?;
                    }
                }
            }
            next = reassembler.next_packet();
        }
    }

    fn route_packet(&self, packet: Packet) -> ControlFlow<String> {
        let header = packet.header;
        self.inner
            .metrics
            .record_packet_received(HEADER_SIZE + header.payload_length as usize);
        tracing::trace!(
            peer = %self.inner.address,
            call_id = header.call_id,
            seq_id = header.seq_id,
            payload_type = header.payload_type,
            "Received packet"
        );

        let mut tracker = self.inner.tracker.lock();
        if !self.check_sequence(&mut tracker, &header)? {
            return ControlFlow::Continue(());
        }

        match packet.payload {
            Payload::Call(call) => {
                tracker.on_receive_call(header.call_id);
                drop(tracker);
                tracing::debug!(peer = %self.inner.address, call_id = header.call_id, function = %call.name, "Queued inbound call");
                let inbound = InboundCall::new(header.correlation(), call);
                if self.inner.calls_tx.send(inbound).is_err() {
                    tracing::error!(peer = %self.inner.address, "Inbound call queue closed");
                }
            }
            Payload::Result(result) => {
                tracker.on_receive_result(header.call_id);
                drop(tracker);
                if !self.inner.pending.complete(header.call_id, result) {
                    tracing::warn!(peer = %self.inner.address, call_id = header.call_id, "Dropping result nobody waits for");
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Runs `header` through the incoming sequence check. Continues with
    /// `false` for a duplicate that must be dropped and breaks on a gap.
    fn check_sequence(
        &self,
        tracker: &mut CorrelationTracker,
        header: &Header,
    ) -> ControlFlow<String, bool> {
        match tracker.on_receive(header) {
            SequenceCheck::InOrder => ControlFlow::Continue(true),
            SequenceCheck::Duplicate { expected, received } => {
                self.inner.metrics.record_duplicate();
                tracing::warn!(peer = %self.inner.address, expected, received, "Dropping duplicate packet");
                ControlFlow::Continue(false)
            }
            SequenceCheck::Gap { expected, received } => {
                self.inner.metrics.record_sequence_gap();
                tracing::error!(peer = %self.inner.address, expected, received, "Packet lost, closing transport");
                ControlFlow::Break(format!(
                    "sequence gap: expected {expected}, received {received}"
                ))
            }
        }
    }

    /// Blocks until the connection is usable or `send_connect_timeout` elapses.
    fn await_connected(&self) -> Result<(), RpcError> {
        if !self.is_running() {
            return Err(RpcError::NotConnected);
        }
        let state = self
            .inner
            .state
            .wait_until(Some(self.inner.config.send_connect_timeout()), |state| {
                state == ConnectionState::Connected || state.is_terminal()
            });
        if state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(RpcError::NotConnected)
        }
    }

    /// Encodes `payload`, assigns its ids through `assign` and writes it.
    fn send_payload<F>(&self, payload: &Payload, assign: F) -> Result<CorrelationId, RpcError>
    where
        F: FnOnce(&mut CorrelationTracker) -> Result<CorrelationId, CorrelationError>,
    {
        let body = codec::encode_payload(payload)?;
        let max = self.inner.config.max_frame_size();
        let payload_length = u32::try_from(body.len())
            .ok()
            .filter(|len| *len <= max)
            .ok_or(WireError::FrameTooLarge {
                size: body.len() as u64,
                max,
            })?;

        self.await_connected()?;
        let mut writer = self.inner.writer.lock();
        let Some(stream) = writer.as_mut() else {
            return Err(RpcError::NotConnected);
        };

        let correlation = assign(&mut self.inner.tracker.lock())?;
        let header = Header {
            call_id: correlation.call_id,
            seq_id: correlation.seq_id,
            payload_type: payload.payload_type().as_u16(),
            payload_length,
        };
        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.len());
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&body);

        match write_all(stream, &bytes) {
            Ok(()) => {
                self.inner.metrics.record_packet_sent(bytes.len());
                tracing::trace!(
                    peer = %self.inner.address,
                    call_id = correlation.call_id,
                    seq_id = correlation.seq_id,
                    bytes = bytes.len(),
                    "Sent packet"
                );
                Ok(correlation)
            }
            Err(error) => {
                tracing::error!(peer = %self.inner.address, error = %error, "Could not send packet");
                if let Some(stream) = writer.take() {
                    let _ = stream.shutdown(Shutdown::Both);
                }
                drop(writer);
                self.shutdown_socket();
                self.inner.state.transition(ConnectionState::Disconnected);
                Err(RpcError::SendFailed { source: error })
            }
        }
    }

    /// Sends a call and registers for its result.
    ///
    /// # Errors
    ///
    /// - [`RpcError::NotConnected`] if the connection does not come up within
    ///   `send_connect_timeout`
    /// - [`RpcError::SendFailed`] if the socket write failed
    /// - [`RpcError::Wire`] if the call holds object values or is too large
    #[cfg_attr(feature = "observability", instrument(skip(self, call), fields(peer = %self.inner.address, function = %call.name)))]
    pub fn send_call(&self, call: Call) -> Result<PendingCall, RpcError> {
        let payload = Payload::Call(call);
        let mut registered = None;
        let sent = self.send_payload(&payload, |tracker| {
            let correlation = tracker.on_send_call();
            registered = Some((correlation, self.inner.pending.register(correlation.call_id)));
            Ok(correlation)
        });
        match (sent, registered) {
            (Ok(_), Some((correlation, receiver))) => Ok(PendingCall {
                correlation,
                receiver,
            }),
            (Err(error), Some((correlation, _))) => {
                self.inner.pending.cancel(correlation.call_id);
                self.inner.tracker.lock().abandon(correlation.call_id);
                Err(error)
            }
            (Err(error), None) => Err(error),
            (Ok(_), None) => Err(RpcError::NotConnected),
        }
    }

    /// Sends the result of the inbound call `call_id`.
    ///
    /// # Errors
    ///
    /// [`RpcError::Correlation`] if `call_id` is not an open inbound call, e.g.
    /// because the connection was re-established since the call arrived.
    pub fn send_result(&self, call_id: u64, result: CallResult) -> Result<CorrelationId, RpcError> {
        let payload = Payload::Result(result);
        self.send_payload(&payload, |tracker| tracker.on_send_result_for(call_id))
    }

    /// Blocks until the result of `call` arrives.
    ///
    /// Inbound calls arriving meanwhile run on this thread, which lets the
    /// peer call back into this side while it waits.
    ///
    /// # Errors
    ///
    /// - [`RpcError::Timeout`] after `timeout`; the call is abandoned
    /// - [`RpcError::ConnectionLost`] if the connection drops or stops first
    pub fn wait_for_result(
        &self,
        call: PendingCall,
        timeout: Option<Duration>,
    ) -> Result<CallResult, RpcError> {
        let call_id = call.call_id();
        let deadline = timeout.map_or_else(channel::never, channel::after);
        let proxy = self.proxy();

        loop {
            select! {
                recv(call.receiver) -> result => {
                    return result.map_err(|_| RpcError::ConnectionLost { call_id });
                }
                recv(self.inner.calls_rx) -> inbound => {
                    if let Ok(inbound) = inbound {
                        if let Err(e) = proxy.handle_call(inbound) {
                            tracing::warn!(peer = %self.inner.address, error = %e, "Nested call failed");
                        }
                    }
                }
                recv(self.inner.shutdown_rx) -> _ => {
                    self.inner.pending.cancel(call_id);
                    return Err(RpcError::ConnectionLost { call_id });
                }
                recv(deadline) -> _ => {
                    self.inner.pending.cancel(call_id);
                    self.inner.tracker.lock().abandon(call_id);
                    self.inner.metrics.record_call_timeout();
                    let duration = timeout.unwrap_or_default();
                    tracing::warn!(peer = %self.inner.address, call_id, ?duration, "Call timed out");
                    return Err(RpcError::Timeout { call_id, duration });
                }
            }
        }
    }

    /// Sends `call` and waits for its result.
    pub fn call(&self, call: Call, timeout: Option<Duration>) -> Result<CallResult, RpcError> {
        let pending = self.send_call(call)?;
        self.wait_for_result(pending, timeout)
    }

    /// Takes the next queued inbound call, waiting up to `timeout`.
    ///
    /// Returns `None` on timeout or once the connection stops.
    pub fn next_call(&self, timeout: Option<Duration>) -> Option<InboundCall> {
        let deadline = timeout.map_or_else(channel::never, channel::after);
        select! {
            recv(self.inner.calls_rx) -> inbound => inbound.ok(),
            recv(self.inner.shutdown_rx) -> _ => None,
            recv(deadline) -> _ => None,
        }
    }

    /// Stops the connection. Idempotent and callable from any thread.
    ///
    /// Closes the socket, fails every caller still waiting, joins the reader
    /// and worker threads (except the calling one), clears the correlation
    /// state and finally runs the close callback.
    pub fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(peer = %self.inner.address, role = %self.inner.role, "Stopping connection");
        self.inner.state.transition(ConnectionState::Closing);
        drop(self.inner.shutdown_tx.lock().take());

        self.shutdown_socket();
        if let Some(stream) = self.inner.writer.lock().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.inner.pending.fail_all();

        let current = thread::current().id();
        let reader = self.inner.reader.lock().take();
        if let Some(reader) = reader {
            if reader.thread().id() != current && reader.join().is_err() {
                tracing::error!(peer = %self.inner.address, "Reader thread panicked");
            }
        }
        let executor = self.inner.executor.lock().take();
        if let Some(executor) = executor {
            executor.join();
        }

        self.inner.tracker.lock().reset();
        while self.inner.calls_rx.try_recv().is_ok() {}
        self.inner.state.transition(ConnectionState::Closed);
        tracing::info!(peer = %self.inner.address, "Connection closed");

        let callback = self.inner.on_close.lock().take();
        if let Some(callback) = callback {
            callback(self);
        }
    }

    /// Returns `true` when called from this connection's reader thread or
    /// from one of its dispatch workers, i.e. from inside a handler it runs.
    #[must_use]
    pub fn is_own_thread(&self) -> bool {
        let current = thread::current().id();
        let on_reader = self
            .inner
            .reader
            .lock()
            .as_ref()
            .is_some_and(|r| r.thread().id() == current);
        on_reader
            || self
                .inner
                .executor
                .lock()
                .as_ref()
                .is_some_and(|e| e.owns(current))
    }

    /// Waits up to `timeout` for `stop()` to finish. Returns whether it has.
    pub fn wait_closed(&self, timeout: Option<Duration>) -> bool {
        self.inner
            .state
            .wait_until(timeout, |state| state == ConnectionState::Closed)
            == ConnectionState::Closed
    }

    /// Returns `true` until `stop()` is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Returns `true` while a socket is open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.get()
    }

    /// Peer address as given or as reported by `accept`.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    /// Side of the handshake this connection was created on.
    #[must_use]
    pub fn role(&self) -> ConnectionRole {
        self.inner.role
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }

    /// Functions inbound calls are resolved against.
    #[must_use]
    pub fn functions(&self) -> &Arc<FunctionRegistry> {
        &self.inner.functions
    }

    /// Traffic counters.
    #[must_use]
    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.inner.metrics
    }

    /// Number of open calls in either direction.
    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.inner.tracker.lock().depth()
    }

    /// Number of callers waiting for a result.
    #[must_use]
    pub fn pending_results(&self) -> usize {
        self.inner.pending.len()
    }

    /// A proxy issuing calls over this connection.
    #[must_use]
    pub fn proxy(&self) -> RpcProxy {
        RpcProxy::new(self)
    }

    /// A non-owning handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if both handles refer to the same connection.
    #[must_use]
    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn inbound_calls(&self) -> Receiver<InboundCall> {
        self.inner.calls_rx.clone()
    }

    pub(crate) fn shutdown_signal(&self) -> Receiver<()> {
        self.inner.shutdown_rx.clone()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.inner.address)
            .field("role", &self.inner.role)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn write_all(stream: &mut TcpStream, bytes: &[u8]) -> Result<(), TransportError> {
    let mut written = 0;
    while written < bytes.len() {
        match stream.write(&bytes[written..]) {
            Ok(0) => {
                return Err(TransportError::SendFailed {
                    written,
                    total: bytes.len(),
                });
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(TransportError::WriteFailed { source: e }),
        }
    }
    Ok(())
}
