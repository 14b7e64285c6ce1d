use std::sync::Arc;

use crate::error::RouterError;
use crate::options::RouterOptions;
use crate::params::Params;
use crate::route::Route;
use crate::txn::{Txn, TxnMgr, View};

/// Public façade over the radix-tree router core.
///
/// `Router` owns the transaction manager and the global options used
/// to parse and validate every registered pattern. It performs no I/O
/// and knows nothing about any particular HTTP stack; callers hand it
/// opaque handlers and get back opaque handlers on a match.
pub struct Router {
    mgr: TxnMgr,
    options: RouterOptions,
}

impl Router {
    pub fn new(options: RouterOptions) -> Result<Self, RouterError> {
        options.validate()?;
        Ok(Router {
            mgr: TxnMgr::new(),
            options,
        })
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Registers a new route. Fails with `RouteExist` if `method` +
    /// `route.pattern` already resolve to the same leaf.
    pub fn handle(&self, method: &str, route: Route) -> Result<Arc<Route>, RouterError> {
        let mut txn = self.mgr.txn(false);
        let result = txn.insert(method, route, &self.options);
        match &result {
            Ok(r) => {
                tracing::debug!(method, pattern = %r.pattern, "route registered");
                let _ = txn.commit();
            }
            Err(e) => {
                tracing::warn!(method, error = %e, "route registration failed");
                let _ = txn.abort();
            }
        }
        result
    }

    /// Replaces an existing route. Unlike `handle`, the pre-existing
    /// route at the same leaf is deleted first rather than treated as a
    /// conflict; unlike a bare delete+insert, it fails with
    /// `RouteNotFound` rather than registering the pattern fresh if no
    /// such route exists yet.
    pub fn update(&self, method: &str, route: Route) -> Result<Arc<Route>, RouterError> {
        let mut txn = self.mgr.txn(false);
        let pattern = route.pattern.clone();
        if let Err(e) = txn.delete(method, &pattern, &self.options) {
            tracing::warn!(method, pattern = %pattern, error = %e, "route update failed");
            let _ = txn.abort();
            return Err(e);
        }
        let result = txn.insert(method, route, &self.options);
        match &result {
            Ok(r) => {
                tracing::debug!(method, pattern = %pattern, "route updated");
                let _ = txn.commit();
            }
            Err(e) => {
                tracing::warn!(method, pattern = %pattern, error = %e, "route update failed");
                let _ = txn.abort();
            }
        }
        result
    }

    pub fn delete(&self, method: &str, pattern: &str) -> Result<Arc<Route>, RouterError> {
        let mut txn = self.mgr.txn(false);
        let result = txn.delete(method, pattern, &self.options);
        match &result {
            Ok(_) => {
                tracing::debug!(method, pattern, "route deleted");
                let _ = txn.commit();
            }
            Err(e) => {
                tracing::warn!(method, pattern, error = %e, "route delete failed");
                let _ = txn.abort();
            }
        }
        result
    }

    pub fn has(&self, method: &str, pattern: &str) -> bool {
        self.route(method, pattern).is_some()
    }

    pub fn route(&self, method: &str, pattern: &str) -> Option<Arc<Route>> {
        let limits = self.options.parse_limits();
        self.mgr.view(|v| v.route(method, pattern, &limits))
    }

    /// Matches `host`/`path` the same way `lookup` does, but allocates
    /// its own `Params` rather than requiring the caller to supply one
    /// — convenient for callers (e.g. redirect/has-style checks) who
    /// don't need the captured values, only the route and `tsr` flag.
    pub fn reverse(&self, method: &str, host: &str, path: &str) -> (Option<Arc<Route>>, bool) {
        let mut params = Params::new();
        self.lookup(method, host, path, &mut params)
    }

    pub fn lookup<'p>(
        &self,
        method: &str,
        host: &'p str,
        path: &'p str,
        params: &mut Params<'p>,
    ) -> (Option<Arc<Route>>, bool) {
        self.mgr.view(|v| v.lookup(method, host, path, params))
    }

    pub fn iter(&self) -> Vec<(String, Arc<Route>)> {
        self.mgr.view(|v| v.iter())
    }

    pub fn view<R>(&self, f: impl FnOnce(&View) -> R) -> R {
        self.mgr.view(f)
    }

    pub fn updates<E>(&self, f: impl FnOnce(&mut Txn) -> Result<(), E>) -> Result<(), E> {
        self.mgr.updates(f)
    }

    pub fn txn(&self, read_only: bool) -> Txn<'_> {
        self.mgr.txn(read_only)
    }
}
