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

//! Worker pool executing inbound calls.

use crate::transport::Connection;
use crossbeam::select;
use std::io;
use std::thread::{self, JoinHandle, ThreadId};

/// Fixed pool of threads pulling inbound calls off a connection's queue.
///
/// The pool bounds how many handlers run at once. Callers blocked on a
/// nested result drain the same queue themselves, so a full pool never
/// starves a reply the peer is waiting on.
#[derive(Debug)]
pub struct DispatchExecutor {
    workers: Vec<JoinHandle<()>>,
}

impl DispatchExecutor {
    /// Spawns `workers` threads (at least one) serving `connection`.
    ///
    /// # Errors
    ///
    /// Returns the spawn error if a thread cannot be created; workers
    /// already started exit once the connection stops.
    pub fn start(connection: &Connection, workers: usize) -> io::Result<Self> {
        let count = workers.max(1);
        let mut handles = Vec::with_capacity(count);
        for index in 0..count {
            let calls = connection.inbound_calls();
            let shutdown = connection.shutdown_signal();
            let proxy = connection.proxy();
            let peer = connection.address().to_string();
            let handle = thread::Builder::new()
                .name(format!("nestrpc-worker-{index}"))
                .spawn(move || {
                    tracing::trace!(peer = %peer, worker = index, "Worker started");
                    loop {
                        select! {
                            recv(calls) -> inbound => {
                                let Ok(inbound) = inbound else { break };
                                if let Err(e) = proxy.handle_call(inbound) {
                                    tracing::warn!(peer = %peer, worker = index, error = %e, "Failed to answer call");
                                }
                            }
                            recv(shutdown) -> _ => break,
                        }
                    }
                    tracing::trace!(peer = %peer, worker = index, "Worker stopped");
                })?;
            handles.push(handle);
        }
        tracing::debug!(peer = %connection.address(), workers = count, "Started dispatch executor");
        Ok(Self { workers: handles })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` if the pool has no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Returns `true` if `thread` is one of the pool's workers.
    pub(crate) fn owns(&self, thread: ThreadId) -> bool {
        self.workers.iter().any(|w| w.thread().id() == thread)
    }

    /// Waits for every worker to exit, skipping the calling thread.
    ///
    /// The connection's shutdown signal must already have fired.
    pub fn join(self) {
        let current = thread::current().id();
        for worker in self.workers {
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("Dispatch worker panicked");
            }
        }
    }
}
