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

//! Typed client declarations.

/// Declares a client struct whose methods call remote functions by name.
///
/// Each method sends its arguments positionally and converts the return
/// value with [`FromValue`](crate::serialization::FromValue). A method may
/// name the remote function explicitly with `as "name"`; otherwise the
/// method name is used.
///
/// # Examples
///
/// ```rust
/// use nestrpc::remote_functions;
///
/// remote_functions! {
///     /// Client for the calculator service.
///     pub struct Calculator {
///         fn add(a: i64, b: i64) -> i64;
///         fn describe(value: f64) -> String as "describe_number";
///     }
/// }
///
/// let calculator = Calculator::new(nestrpc::rpc::RpcProxy::detached());
/// assert!(calculator.add(1, 2).is_err());
/// ```
#[macro_export]
macro_rules! remote_functions {
    (
        $(#[$meta:meta])*
        $vis:vis struct $client:ident {
            $(
                $(#[$method_meta:meta])*
                fn $method:ident ($($arg:ident : $arg_ty:ty),* $(,)?) -> $ret_ty:ty $(as $remote:literal)?;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $client {
            proxy: $crate::rpc::RpcProxy,
            timeout: ::std::option::Option<::std::time::Duration>,
        }

        impl $client {
            /// Creates a client calling through `proxy`.
            #[allow(dead_code)]
            pub fn new(proxy: $crate::rpc::RpcProxy) -> Self {
                Self { proxy, timeout: ::std::option::Option::None }
            }

            /// Sets the timeout applied to every call.
            #[allow(dead_code)]
            pub fn with_timeout(mut self, timeout: ::std::time::Duration) -> Self {
                self.timeout = ::std::option::Option::Some(timeout);
                self
            }

            /// The underlying proxy.
            #[allow(dead_code)]
            pub fn proxy(&self) -> &$crate::rpc::RpcProxy {
                &self.proxy
            }

            $(
                $(#[$method_meta])*
                #[allow(dead_code)]
                pub fn $method(&self, $($arg: $arg_ty),*) -> ::std::result::Result<$ret_ty, $crate::RpcError> {
                    let name = $crate::__remote_function_name!($method $(, $remote)?);
                    self.proxy.call_typed(
                        name,
                        ::std::vec![$($crate::serialization::IntoValue::into_value($arg)),*],
                        ::std::collections::BTreeMap::new(),
                        self.timeout,
                    )
                }
            )*
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __remote_function_name {
    ($method:ident) => {
        ::std::stringify!($method)
    };
    ($method:ident, $remote:literal) => {
        $remote
    };
}
