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

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use nestrpc::rpc::FunctionRegistry;
use nestrpc::serialization::{Call, CallResult, CorrelationId, Packet, StreamReassembler, codec};
use nestrpc::transport::{Connection, ConnectionConfig, Listener};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Once};
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(5);

/// Installs a test subscriber once per test binary.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Listener on an ephemeral loopback port.
pub fn listen(functions: Arc<FunctionRegistry>) -> Listener {
    init_tracing();
    Listener::bind("127.0.0.1:0", functions, ConnectionConfig::accepted()).unwrap()
}

/// Started initiator connected to `addr`.
pub fn connect(addr: SocketAddr, functions: Arc<FunctionRegistry>) -> Connection {
    connect_with(addr, functions, ConnectionConfig::initiator())
}

pub fn connect_with(
    addr: SocketAddr,
    functions: Arc<FunctionRegistry>,
    config: ConnectionConfig,
) -> Connection {
    init_tracing();
    let connection = Connection::initiator(addr.to_string(), functions, config);
    assert!(connection.start(true, Some(WAIT)), "failed to connect to {addr}");
    connection
}

/// Polls `condition` until it holds or `WAIT` elapses.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = std::time::Instant::now() + WAIT;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// Hand-driven peer speaking the wire format directly.
pub struct RawPeer {
    pub stream: TcpStream,
    reassembler: StreamReassembler,
}

impl RawPeer {
    /// Binds a listener; accept with [`RawPeer::accept`].
    pub fn bind() -> TcpListener {
        init_tracing();
        TcpListener::bind("127.0.0.1:0").unwrap()
    }

    pub fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(WAIT)).unwrap();
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            stream,
            reassembler: StreamReassembler::new(),
        }
    }

    pub fn send(&mut self, packet: &Packet) {
        let bytes = codec::encode(packet).unwrap();
        self.stream.write_all(&bytes).unwrap();
    }

    pub fn send_call(&mut self, call_id: u64, seq_id: u64, call: Call) {
        self.send(&Packet::new(CorrelationId::new(call_id, seq_id), call));
    }

    pub fn send_result(&mut self, call_id: u64, seq_id: u64, result: CallResult) {
        self.send(&Packet::new(CorrelationId::new(call_id, seq_id), result));
    }

    /// Reads until a whole packet is available.
    pub fn recv(&mut self) -> Packet {
        if let Some(packet) = self.reassembler.next_packet().unwrap() {
            return packet;
        }
        let mut buf = [0u8; 1024];
        loop {
            let n = self.stream.read(&mut buf).unwrap();
            assert!(n > 0, "peer closed the connection");
            if let Some(packet) = self.reassembler.add_chunk(&buf[..n]).unwrap() {
                return packet;
            }
        }
    }

    /// Returns `true` once the other side has closed the socket.
    pub fn closed_by_peer(&mut self) -> bool {
        let mut buf = [0u8; 64];
        matches!(self.stream.read(&mut buf), Ok(0) | Err(_))
    }
}
