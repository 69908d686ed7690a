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

//! Wire-level behavior against a hand-driven peer.

mod common;

use common::{RawPeer, WAIT, connect, connect_with, eventually, listen};
use nestrpc::rpc::FunctionRegistry;
use nestrpc::serialization::{
    Call, CallResult, CorrelationId, Header, Packet, Payload, PayloadType, Value, codec,
};
use nestrpc::transport::{ConnectionConfig, ConnectionState};
use nestrpc::RpcError;
use std::collections::BTreeMap;
use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn adder() -> Arc<FunctionRegistry> {
    let functions = Arc::new(FunctionRegistry::new());
    functions.register("add", |_ctx, args| {
        Ok(args.positional::<i64>(0)? + args.positional::<i64>(1)?)
    });
    functions
}

fn expect_call(packet: &Packet, call_id: u64, seq_id: u64, name: &str) {
    assert_eq!(packet.correlation(), CorrelationId::new(call_id, seq_id));
    match &packet.payload {
        Payload::Call(call) => assert_eq!(call.name, name),
        other => panic!("expected call {name}, got {other:?}"),
    }
}

fn expect_result(packet: &Packet, call_id: u64, seq_id: u64) -> Value {
    assert_eq!(packet.correlation(), CorrelationId::new(call_id, seq_id));
    match &packet.payload {
        Payload::Result(result) => result.return_value().cloned().unwrap_or_default(),
        other => panic!("expected result, got {other:?}"),
    }
}

#[test]
fn test_nested_call_ids_on_the_wire() {
    let raw = RawPeer::bind();
    let functions = Arc::new(FunctionRegistry::new());
    functions.register("g", |ctx, _args| {
        let inner: i64 = ctx
            .proxy()
            .call_typed("inner", vec![], BTreeMap::new(), Some(WAIT))
            .map_err(|e| nestrpc::RemoteError::failed(e.to_string()))?;
        Ok(inner * 2)
    });
    let client = connect(raw.local_addr().unwrap(), functions);
    let mut peer = RawPeer::accept(&raw);

    let proxy = client.proxy();
    let caller = thread::spawn(move || proxy.call("outer", vec![], BTreeMap::new(), Some(WAIT)));

    expect_call(&peer.recv(), 0, 0, "outer");
    peer.send_call(7, 0, Call::new("g"));
    expect_call(&peer.recv(), 1, 1, "inner");
    peer.send_result(1, 1, CallResult::returning(5));
    assert_eq!(expect_result(&peer.recv(), 7, 2), Value::Int(10));
    peer.send_result(0, 2, CallResult::returning("done"));

    assert_eq!(caller.join().unwrap().unwrap(), Value::from("done"));
    assert_eq!(client.open_calls(), 0);
    client.stop();
}

#[test]
fn test_packet_split_across_reads() {
    let raw = RawPeer::bind();
    let client = connect(raw.local_addr().unwrap(), Arc::new(FunctionRegistry::new()));
    let mut peer = RawPeer::accept(&raw);
    peer.stream.set_nodelay(true).unwrap();

    let proxy = client.proxy();
    let caller = thread::spawn(move || proxy.call("echo", vec![], BTreeMap::new(), Some(WAIT)));
    expect_call(&peer.recv(), 0, 0, "echo");

    let text = "x".repeat(3000);
    let bytes = codec::encode(&Packet::new(
        CorrelationId::new(0, 0),
        CallResult::returning(text.as_str()),
    ))
    .unwrap();
    for (i, byte) in bytes.iter().enumerate() {
        peer.stream.write_all(std::slice::from_ref(byte)).unwrap();
        if i % 512 == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    assert_eq!(caller.join().unwrap().unwrap(), Value::from(text));
    client.stop();
}

#[test]
fn test_two_results_in_one_write() {
    let raw = RawPeer::bind();
    let client = connect(raw.local_addr().unwrap(), Arc::new(FunctionRegistry::new()));
    let mut peer = RawPeer::accept(&raw);

    let first = client.proxy();
    let a = thread::spawn(move || first.call("a", vec![], BTreeMap::new(), Some(WAIT)));
    let first_packet = peer.recv();
    let second = client.proxy();
    let b = thread::spawn(move || second.call("b", vec![], BTreeMap::new(), Some(WAIT)));
    let second_packet = peer.recv();

    let mut bytes = codec::encode(&Packet::new(
        CorrelationId::new(second_packet.header.call_id, 0),
        CallResult::returning("second"),
    ))
    .unwrap();
    bytes.extend(
        codec::encode(&Packet::new(
            CorrelationId::new(first_packet.header.call_id, 1),
            CallResult::returning("first"),
        ))
        .unwrap(),
    );
    peer.stream.write_all(&bytes).unwrap();

    assert_eq!(a.join().unwrap().unwrap(), Value::from("first"));
    assert_eq!(b.join().unwrap().unwrap(), Value::from("second"));
    assert_eq!(client.open_calls(), 0);
    client.stop();
}

#[test]
fn test_gap_reconnects_initiator() {
    let raw = RawPeer::bind();
    let config = ConnectionConfig::initiator().with_retry_interval(Duration::from_millis(50));
    let client = connect_with(raw.local_addr().unwrap(), Arc::new(FunctionRegistry::new()), config);
    let mut peer = RawPeer::accept(&raw);

    let proxy = client.proxy();
    let caller = thread::spawn(move || proxy.call("x", vec![], BTreeMap::new(), Some(WAIT)));
    expect_call(&peer.recv(), 0, 0, "x");

    // seq 3 where 0 is expected.
    peer.send_result(0, 3, CallResult::returning(1));
    let err = caller.join().unwrap().unwrap_err();
    assert!(matches!(err, RpcError::ConnectionLost { call_id: 0 }), "got {err:?}");
    assert!(peer.closed_by_peer());

    // The new transport starts from fresh correlation state.
    let mut peer = RawPeer::accept(&raw);
    assert!(eventually(|| client.is_connected()));
    let proxy = client.proxy();
    let caller = thread::spawn(move || proxy.call("y", vec![], BTreeMap::new(), Some(WAIT)));
    expect_call(&peer.recv(), 0, 0, "y");
    peer.send_result(0, 0, CallResult::returning(2));
    assert_eq!(caller.join().unwrap().unwrap(), Value::Int(2));

    let metrics = client.metrics().snapshot();
    assert_eq!(metrics.sequence_gaps, 1);
    assert!(metrics.reconnects >= 1);
    client.stop();
}

#[test]
fn test_gap_stops_accepted_connection() {
    let listener = listen(adder());
    let mut stream = TcpStream::connect(listener.local_addr()).unwrap();
    stream.set_read_timeout(Some(WAIT)).unwrap();
    assert!(eventually(|| listener.client_count() == 1));
    let accepted = listener.clients().remove(0);

    let packet = Packet::new(CorrelationId::new(0, 4), Call::new("add").arg(1).arg(2));
    stream.write_all(&codec::encode(&packet).unwrap()).unwrap();

    assert!(accepted.wait_closed(Some(WAIT)));
    assert_eq!(accepted.state(), ConnectionState::Closed);
    assert!(eventually(|| listener.client_count() == 0));
    listener.stop();
}

#[test]
fn test_duplicate_is_dropped() {
    let listener = listen(adder());
    let raw_stream = TcpStream::connect(listener.local_addr()).unwrap();
    raw_stream.set_read_timeout(Some(WAIT)).unwrap();
    let mut peer = RawPeer::from_stream(raw_stream);
    assert!(eventually(|| listener.client_count() == 1));

    peer.send_call(0, 0, Call::new("add").arg(1).arg(2));
    assert_eq!(expect_result(&peer.recv(), 0, 0), Value::Int(3));

    peer.send_call(0, 0, Call::new("add").arg(1).arg(2));
    peer.send_call(1, 1, Call::new("add").arg(10).arg(20));
    assert_eq!(expect_result(&peer.recv(), 1, 1), Value::Int(30));

    let accepted = listener.clients().remove(0);
    assert_eq!(accepted.metrics().snapshot().duplicates, 1);
    assert!(accepted.is_connected());
    listener.stop();
}

#[test]
fn test_malformed_packet_is_skipped() {
    let listener = listen(adder());
    let raw_stream = TcpStream::connect(listener.local_addr()).unwrap();
    raw_stream.set_read_timeout(Some(WAIT)).unwrap();
    let mut peer = RawPeer::from_stream(raw_stream);
    assert!(eventually(|| listener.client_count() == 1));

    let mut header = Header::new(CorrelationId::new(0, 0), PayloadType::Call);
    header.payload_length = 3;
    let mut bytes = header.to_bytes().to_vec();
    bytes.extend_from_slice(&[0xff, 0xff, 0xff]);
    peer.stream.write_all(&bytes).unwrap();

    // The dropped packet used up seq 0, so the next one carries seq 1.
    peer.send_call(1, 1, Call::new("add").arg(2).arg(2));
    assert_eq!(expect_result(&peer.recv(), 1, 0), Value::Int(4));

    let accepted = listener.clients().remove(0);
    let metrics = accepted.metrics().snapshot();
    assert_eq!(metrics.malformed_packets, 1);
    assert_eq!(metrics.sequence_gaps, 0);
    assert!(accepted.is_connected());
    assert_eq!(listener.client_count(), 1);
    listener.stop();
}
