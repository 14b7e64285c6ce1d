use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Trailing-slash handling for a single registered route.
///
/// Mirrors `RouterOptions::trailing_slash` but can be overridden per
/// route at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingSlash {
    /// `/foo` and `/foo/` are distinct routes; no fallback is offered.
    Strict,
    /// The engine proposes the other form via TSR when the registered
    /// one doesn't match directly, and the caller serves it with no
    /// redirect (`tsr=true` is informational only).
    Relaxed,
    /// Same discovery as `Relaxed`, but the caller is expected to issue
    /// a redirect (301 for GET, 308 otherwise) to the other form
    /// instead of serving it directly.
    Redirect,
}

/// Path-normalization policy (global only — unlike `TrailingSlash`
/// this is not overridden per route).
///
/// `RouterOptions::fixed_path` carries the effective value; a retry
/// against [`crate::clean_path`]'s output is the caller's
/// responsibility (see that function's docs) since lookup itself must
/// not allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedPath {
    /// Request path must already be clean; no fallback is offered.
    Strict,
    /// On a lookup miss, a retry against the cleaned path is served
    /// directly with `tsr=false`.
    Relaxed,
    /// Same discovery as `Relaxed`, but the caller redirects (301/308)
    /// to the cleaned path instead of serving it directly.
    Redirect,
}

/// A registered route: the compiled leaf payload stored at a tree node.
///
/// `handler`, `client_ip_resolver` and `annotations` are all left opaque
/// to the core — a fixed type parameter would overconstrain callers, and
/// the core only needs to move these around and hand them back on a
/// match, never interpret them. They're stored as caller-supplied trait
/// objects (or, for annotations, an erased `Any`) behind `Arc`.
pub struct Route {
    pub pattern: String,
    pub host_split: usize,
    pub handler: Arc<dyn Handler>,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub annotations: HashMap<String, Arc<dyn Any + Send + Sync>>,
    pub client_ip_resolver: Option<Arc<dyn ClientIpResolver>>,
    pub trailing_slash: TrailingSlash,
    /// Carried for data-model completeness; the effective policy
    /// consulted by callers is `RouterOptions::fixed_path` (global only).
    pub fixed_path: FixedPath,
}

impl Route {
    pub fn new(pattern: impl Into<String>, host_split: usize, handler: Arc<dyn Handler>) -> Self {
        Route {
            pattern: pattern.into(),
            host_split,
            handler,
            middleware: Vec::new(),
            annotations: HashMap::new(),
            client_ip_resolver: None,
            trailing_slash: TrailingSlash::Strict,
            fixed_path: FixedPath::Strict,
        }
    }

    pub fn has_host(&self) -> bool {
        self.host_split > 0
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("host_split", &self.host_split)
            .field("middleware_count", &self.middleware.len())
            .field("trailing_slash", &self.trailing_slash)
            .field("fixed_path", &self.fixed_path)
            .finish()
    }
}

/// Opaque request handler. The router never calls this itself; it is
/// returned to the caller on a successful lookup; there is no built-in
/// dispatch.
pub trait Handler: Send + Sync {}

impl<F: Send + Sync> Handler for F {}

/// Opaque middleware reference, carried alongside a route but never
/// invoked by the core.
pub trait Middleware: Send + Sync {}

impl<F: Send + Sync> Middleware for F {}

/// Opaque per-route client IP resolution strategy: the core stores it,
/// proxies apply it.
pub trait ClientIpResolver: Send + Sync {}

impl<F: Send + Sync> ClientIpResolver for F {}

#[cfg(test)]
pub(crate) fn test_handler() -> Arc<dyn Handler> {
    Arc::new(())
}
