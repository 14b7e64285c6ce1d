//! Radix-tree HTTP request router core.
//!
//! Compiles hostname+path patterns (static segments, named parameters,
//! wildcards, optional regex constraints) into a per-method radix tree,
//! matches `(method, host, path)` triples against it with a
//! zero-allocation backtracking lookup, and publishes tree updates to
//! readers through a copy-on-write transaction manager.
//!
//! The crate does no I/O and owns no request lifecycle: it hands back
//! an opaque `Route` (and captured `Params`) on a match, nothing more.

mod clean;
mod error;
mod lookup;
mod options;
mod params;
mod pattern;
mod route;
mod router;
mod tree;
mod txn;

pub use clean::clean_path;
pub use error::RouterError;
pub use options::RouterOptions;
pub use params::Params;
pub use pattern::{ParseLimits, ParsedPattern, Parser};
pub use route::{ClientIpResolver, FixedPath, Handler, Middleware, Route, TrailingSlash};
pub use router::Router;
pub use tree::{DynamicChild, Node, Tree};
pub use txn::{Txn, TxnMgr, View};
