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

//! Named functions the peer may call.

use crate::rpc::{Arguments, CallContext};
use crate::serialization::{Call, RemoteError, RemoteErrorKind, Value};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

type Handler = Arc<dyn Fn(&CallContext, Arguments) -> Result<Value, RemoteError> + Send + Sync>;

/// Table of callable functions, shared by every connection that serves them.
///
/// Registration is open at any time; a call looks its handler up when it is
/// executed, so functions registered after a connection starts are reachable.
///
/// # Examples
///
/// ```rust
/// use nestrpc::rpc::FunctionRegistry;
/// use nestrpc::serialization::RemoteError;
///
/// let functions = FunctionRegistry::new();
/// functions.register("divide", |_ctx, args| {
///     let (a, b) = (args.positional::<i64>(0)?, args.positional::<i64>(1)?);
///     if b == 0 {
///         return Err(RemoteError::failed("division by zero"));
///     }
///     Ok(a / b)
/// });
///
/// assert!(functions.contains("divide"));
/// ```
#[derive(Default)]
pub struct FunctionRegistry {
    handlers: RwLock<HashMap<String, Handler>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any previous one.
    ///
    /// Returns `true` if a function of that name already existed.
    pub fn register<F, R>(&self, name: impl Into<String>, handler: F) -> bool
    where
        F: Fn(&CallContext, Arguments) -> Result<R, RemoteError> + Send + Sync + 'static,
        R: Into<Value>,
    {
        let name = name.into();
        let handler: Handler =
            Arc::new(move |ctx: &CallContext, args: Arguments| handler(ctx, args).map(Into::into));
        let replaced = self.handlers.write().insert(name.clone(), handler).is_some();
        tracing::debug!(function = %name, replaced, "Registered function");
        replaced
    }

    /// Removes `name`. Returns `true` if it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.handlers.write().remove(name).is_some()
    }

    /// Returns `true` if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Runs `call` and returns the value for its return slot.
    ///
    /// Failures never escape: an unknown name, a handler error or a handler
    /// panic all become a [`Value::Error`] for the caller.
    pub fn invoke(&self, ctx: &CallContext, call: Call) -> Value {
        // Clone the handler out so the lock is not held while it runs; handlers
        // may register functions or make nested calls.
        let handler = self.handlers.read().get(&call.name).cloned();
        let Some(handler) = handler else {
            tracing::warn!(function = %call.name, "Call to unknown function");
            return Value::Error(RemoteError::function_not_found(&call.name));
        };

        let args = Arguments::new(call.positional, call.named);
        match panic::catch_unwind(AssertUnwindSafe(|| handler(ctx, args))) {
            Ok(Ok(value)) => value,
            Ok(Err(error)) => {
                tracing::debug!(function = %call.name, error = %error, "Function returned an error");
                Value::Error(error)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(function = %call.name, panic = %message, "Function panicked");
                Value::Error(RemoteError::new(RemoteErrorKind::Panicked, message))
            }
        }
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
