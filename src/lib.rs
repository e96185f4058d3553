//! # objroute
//!
//! **objroute** binds *service objects* to HTTP routes. A service object is a
//! plain Rust value whose methods handle requests; objroute discovers which of
//! its published methods have the handler shape, builds route keys from a
//! pattern plus the type and method names, and installs a dispatch function
//! per route that borrows a pooled instance of the object for every request.
//!
//! ## Architecture
//!
//! - **[`handler`]** - method tables, the handler signature check and lifecycle hooks
//! - **[`binding`]** - the three binding modes, route key synthesis and pooled dispatch
//! - **[`pool`]** - idle-timeout object pool backing each bound type
//! - **[`router`]** - exact-key route table (`METHOD:path@domain`)
//! - **[`server`]** - request/response context and the [`Server`](server::Server) facade
//! - **[`middleware`]** - before/after hooks carried by bound routes
//! - **[`config`]** - YAML/env configuration
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - the `objroute` binary
//!
//! ### Binding Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App
//!     participant Binder
//!     participant Table as MethodTable
//!     participant Keys as binding::keys
//!     participant Router
//!
//!     App->>Binder: bind_object("/user", UserService, None)
//!     Binder->>Binder: parse_pattern("/user")
//!     Binder->>Table: MethodTable::for_type()
//!     Binder->>Table: scan_object(filter)
//!     Table-->>Binder: handler methods + rejections
//!     Binder->>Keys: merge_builtin_names(pattern, type, method)
//!     Keys-->>Binder: "/user/show@default", "/user/index@default"
//!     Binder->>Keys: index_alias("/user/index@default")
//!     Binder->>Router: bind_handler_by_map(items)
//!     Router-->>App: BindReport
//! ```
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Server
//!     participant Router
//!     participant Dispatch as DispatchFn
//!     participant Pools as PoolRegistry
//!     participant Entry as PooledEntry
//!
//!     Server->>Router: handle(req)
//!     Router->>Router: lookup(method, path, host)
//!     alt No Route Match
//!         Router-->>Server: None (404)
//!     end
//!     Router->>Router: middleware.before()
//!     Router->>Dispatch: dispatch(req)
//!     Dispatch->>Pools: pool_for::<PooledEntry<T>>()
//!     Pools-->>Dispatch: Pool (created on first use)
//!     Dispatch->>Entry: get()
//!     Dispatch->>Entry: init hook
//!     Dispatch->>Entry: target method
//!     alt Panic
//!         Dispatch->>Dispatch: catch_unwind, 500
//!     end
//!     Dispatch->>Entry: shut hook
//!     Dispatch->>Pools: put(entry)
//!     Router->>Router: middleware.after()
//!     Router-->>Server: HandlerResponse
//! ```
//!
//! ## Example
//!
//! ```rust
//! use objroute::handler::{InitHook, MethodTable, ServiceObject};
//! use objroute::server::{HandlerRequest, Server};
//! use http::Method;
//! use serde_json::json;
//!
//! #[derive(Clone, Default)]
//! struct User {
//!     lookups: u32,
//! }
//!
//! impl User {
//!     fn index(&mut self, req: &mut HandlerRequest) {
//!         req.write_json(200, json!({ "lookups": self.lookups }));
//!     }
//! }
//!
//! impl InitHook for User {
//!     fn init(&mut self, _req: &mut HandlerRequest) {
//!         self.lookups += 1;
//!     }
//! }
//!
//! impl ServiceObject for User {
//!     fn methods(table: &mut MethodTable<Self>) {
//!         table.method("Index", Self::index).init_hook();
//!     }
//! }
//!
//! let server = Server::new();
//! let report = server.bind_object("/user", User::default(), None).unwrap();
//! assert_eq!(report.registered.len(), 2); // /user/index and /user
//!
//! let mut req = HandlerRequest::new(Method::GET, "/user");
//! assert_eq!(server.handle(&mut req).body, json!({ "lookups": 1 }));
//! ```

pub mod binding;
pub mod cli;
pub mod config;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod pool;
pub mod router;
pub mod server;

pub use binding::{BindError, BindReport, Binder, PoolRegistry};
pub use config::{ServerConfig, UriType};
pub use handler::{InitHook, MethodTable, ServiceObject, ShutHook};
pub use server::{HandlerRequest, HandlerResponse, Server};
