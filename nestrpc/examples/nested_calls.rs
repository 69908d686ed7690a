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

//! # Nested Calls Example
//!
//! Two peers on one TCP connection, each calling the other.
//!
//! ## What This Example Shows
//!
//! - Registering functions on both sides
//! - A server function calling back into the client before it returns
//! - A typed client declared with `remote_functions!`
//! - Remote errors arriving as `RpcError::Remote`
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=debug cargo run --example nested_calls
//! ```

use nestrpc::rpc::FunctionRegistry;
use nestrpc::serialization::RemoteError;
use nestrpc::transport::{Connection, ConnectionConfig, Listener};
use nestrpc::remote_functions;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

remote_functions! {
    /// Functions the server offers.
    struct Server {
        fn factorial(n: i64) -> i64;
        fn checkout(item: &str) -> String;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== nestrpc nested calls ===\n");

    // factorial(n) asks the client for factorial(n - 1), which asks the
    // server again, until n reaches 1.
    let server_functions = Arc::new(FunctionRegistry::new());
    server_functions.register("factorial", |ctx, args| {
        let n: i64 = args.positional(0)?;
        if n <= 1 {
            return Ok(1);
        }
        let rest: i64 = ctx
            .proxy()
            .call_typed("client_factorial", vec![(n - 1).into()], BTreeMap::new(), None)
            .map_err(|e| RemoteError::failed(e.to_string()))?;
        Ok(n * rest)
    });
    server_functions.register("checkout", |ctx, args| {
        let item: String = args.positional(0)?;
        let confirmed: bool = ctx
            .proxy()
            .call_typed("confirm", vec![item.clone().into()], BTreeMap::new(), None)
            .map_err(|e| RemoteError::failed(e.to_string()))?;
        if !confirmed {
            return Err(RemoteError::failed(format!("{item} was not confirmed")));
        }
        Ok(format!("{item} is on its way"))
    });

    let listener = Listener::bind("127.0.0.1:0", server_functions, ConnectionConfig::accepted())?;
    println!("Server listening on {}", listener.local_addr());

    let client_functions = Arc::new(FunctionRegistry::new());
    client_functions.register("client_factorial", |ctx, args| {
        let n: i64 = args.positional(0)?;
        if n <= 1 {
            return Ok(1);
        }
        let rest: i64 = ctx
            .proxy()
            .call_typed("factorial", vec![(n - 1).into()], BTreeMap::new(), None)
            .map_err(|e| RemoteError::failed(e.to_string()))?;
        Ok(n * rest)
    });
    client_functions.register("confirm", |_ctx, args| {
        let item: String = args.positional(0)?;
        println!("  client: confirming {item}");
        Ok(item != "nothing")
    });

    let client = Connection::initiator(
        listener.local_addr().to_string(),
        client_functions,
        ConnectionConfig::initiator(),
    );
    if !client.start(true, Some(Duration::from_secs(5))) {
        return Err("could not connect".into());
    }
    println!("Client connected\n");

    let server = Server::new(client.proxy()).with_timeout(Duration::from_secs(10));

    for n in [1, 5, 10, 20] {
        println!("factorial({n}) = {}", server.factorial(n)?);
    }
    println!();

    println!("checkout(book) = {}", server.checkout("book")?);
    match server.checkout("nothing") {
        Ok(reply) => println!("checkout(nothing) = {reply}"),
        Err(e) => println!("checkout(nothing) failed: {e}"),
    }

    let metrics = client.metrics().snapshot();
    println!(
        "\nClient sent {} packets, received {}, ran {} nested calls",
        metrics.packets_sent, metrics.packets_received, metrics.calls_dispatched
    );

    client.stop();
    listener.stop();
    println!("\n=== done ===");
    Ok(())
}
