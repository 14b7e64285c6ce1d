use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;

use crate::error::RouterError;
use crate::options::RouterOptions;
use crate::params::Params;
use crate::pattern::Parser;
use crate::route::Route;
use crate::tree::Tree;

/// Copy-on-write publisher for a `Router`'s routing tree.
///
/// Readers load the current `Arc<Tree>` via `ArcSwap` and never block;
/// at most one writer proceeds at a time, serialized by `write_lock`,
/// working against a private clone of the tree until it commits.
pub struct TxnMgr {
    current: ArcSwap<Tree>,
    write_lock: Mutex<()>,
}

impl TxnMgr {
    pub fn new() -> Self {
        TxnMgr {
            current: ArcSwap::from_pointee(Tree::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Arc<Tree> {
        self.current.load_full()
    }

    /// Opens an unmanaged transaction. `read_only = true` skips the
    /// write lock entirely and hands back a live snapshot; the
    /// resulting `Txn` rejects any mutation with `ReadOnlyTxn`. The
    /// caller is responsible for calling `commit` or `abort` exactly
    /// once.
    pub fn txn(&self, read_only: bool) -> Txn<'_> {
        if read_only {
            Txn {
                mgr: self,
                mode: TxnMode::ReadOnly(self.load()),
                settled: false,
            }
        } else {
            let guard = self
                .write_lock
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let draft = (*self.load()).clone();
            Txn {
                mgr: self,
                mode: TxnMode::ReadWrite { guard, draft },
                settled: false,
            }
        }
    }

    pub fn view<R>(&self, f: impl FnOnce(&View) -> R) -> R {
        let view = View { tree: self.load() };
        f(&view)
    }

    /// Managed write facade: opens a write transaction, runs `f`
    /// against it, and commits on `Ok` or aborts on `Err`. A panic
    /// inside `f` is caught so the write lock is still released and
    /// the draft discarded, then the panic is resumed.
    pub fn updates<E>(&self, f: impl FnOnce(&mut Txn) -> Result<(), E>) -> Result<(), E> {
        let mut txn = self.txn(false);
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| f(&mut txn)));
        match result {
            Ok(Ok(())) => {
                let _ = txn.commit();
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = txn.abort();
                Err(e)
            }
            Err(payload) => {
                let _ = txn.abort();
                std::panic::resume_unwind(payload);
            }
        }
    }
}

impl Default for TxnMgr {
    fn default() -> Self {
        TxnMgr::new()
    }
}

/// Read-only snapshot handle returned by `TxnMgr::view`.
pub struct View {
    tree: Arc<Tree>,
}

impl View {
    pub fn has(&self, method: &str, pattern: &str, limits: &crate::pattern::ParseLimits) -> bool {
        self.route(method, pattern, limits).is_some()
    }

    pub fn route(
        &self,
        method: &str,
        pattern: &str,
        limits: &crate::pattern::ParseLimits,
    ) -> Option<Arc<Route>> {
        let parsed = Parser::parse(pattern, *limits).ok()?;
        self.tree.get(method, &parsed)
    }

    pub fn lookup<'p>(
        &self,
        method: &str,
        host: &'p str,
        path: &'p str,
        params: &mut Params<'p>,
    ) -> (Option<Arc<Route>>, bool) {
        match self.tree.root(method) {
            Some(root) => crate::lookup::lookup(root, host, path, params),
            None => (None, false),
        }
    }

    pub fn iter(&self) -> Vec<(String, Arc<Route>)> {
        self.tree.iter()
    }
}

enum TxnMode<'a> {
    ReadOnly(Arc<Tree>),
    ReadWrite {
        guard: MutexGuard<'a, ()>,
        draft: Tree,
    },
}

/// Unmanaged transaction handle: `commit` or `abort` must be called
/// exactly once. Dropping it without settling it discards
/// the draft (if any) and releases the write lock, equivalent to an
/// implicit abort.
pub struct Txn<'a> {
    mgr: &'a TxnMgr,
    mode: TxnMode<'a>,
    settled: bool,
}

impl<'a> Txn<'a> {
    pub fn insert(
        &mut self,
        method: &str,
        route: Route,
        options: &RouterOptions,
    ) -> Result<Arc<Route>, RouterError> {
        let limits = options.parse_limits();
        let pattern = route.pattern.clone();
        let draft = self.draft_mut()?;
        let parsed = Parser::parse(&pattern, limits)?;
        draft.insert(method, &parsed, route)
    }

    pub fn delete(
        &mut self,
        method: &str,
        pattern: &str,
        options: &RouterOptions,
    ) -> Result<Arc<Route>, RouterError> {
        let limits = options.parse_limits();
        let draft = self.draft_mut()?;
        let parsed = Parser::parse(pattern, limits)?;
        draft.delete(method, &parsed, pattern)
    }

    pub fn has(&self, method: &str, pattern: &str, limits: &crate::pattern::ParseLimits) -> bool {
        self.route(method, pattern, limits).is_some()
    }

    pub fn route(
        &self,
        method: &str,
        pattern: &str,
        limits: &crate::pattern::ParseLimits,
    ) -> Option<Arc<Route>> {
        let parsed = Parser::parse(pattern, *limits).ok()?;
        self.tree_ref().get(method, &parsed)
    }

    pub fn lookup<'p>(
        &self,
        method: &str,
        host: &'p str,
        path: &'p str,
        params: &mut Params<'p>,
    ) -> (Option<Arc<Route>>, bool) {
        match self.tree_ref().root(method) {
            Some(root) => crate::lookup::lookup(root, host, path, params),
            None => (None, false),
        }
    }

    pub fn iter(&self) -> Vec<(String, Arc<Route>)> {
        self.tree_ref().iter()
    }

    pub fn commit(&mut self) -> Result<(), RouterError> {
        if self.settled {
            return Err(RouterError::SettledTxn);
        }
        self.settled = true;
        if let TxnMode::ReadWrite { draft, .. } = &mut self.mode {
            let published = std::mem::replace(draft, Tree::new());
            self.mgr.current.store(Arc::new(published));
        }
        Ok(())
    }

    pub fn abort(&mut self) -> Result<(), RouterError> {
        if self.settled {
            return Err(RouterError::SettledTxn);
        }
        self.settled = true;
        Ok(())
    }

    fn draft_mut(&mut self) -> Result<&mut Tree, RouterError> {
        match &mut self.mode {
            TxnMode::ReadOnly(_) => Err(RouterError::ReadOnlyTxn),
            TxnMode::ReadWrite { draft, .. } => Ok(draft),
        }
    }

    fn tree_ref(&self) -> &Tree {
        match &self.mode {
            TxnMode::ReadOnly(t) => t,
            TxnMode::ReadWrite { draft, .. } => draft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::test_handler;

    fn opts() -> RouterOptions {
        RouterOptions::default()
    }

    #[test]
    fn commit_publishes_and_view_sees_it() {
        let mgr = TxnMgr::new();
        let mut txn = mgr.txn(false);
        txn.insert("GET", Route::new("/foo", 0, test_handler()), &opts())
            .unwrap();
        txn.commit().unwrap();

        let limits = opts().parse_limits();
        mgr.view(|v| {
            assert!(v.route("GET", "/foo", &limits).is_some());
        });
    }

    #[test]
    fn abort_discards_the_draft() {
        let mgr = TxnMgr::new();
        let mut txn = mgr.txn(false);
        txn.insert("GET", Route::new("/foo", 0, test_handler()), &opts())
            .unwrap();
        txn.abort().unwrap();

        let limits = opts().parse_limits();
        mgr.view(|v| {
            assert!(v.route("GET", "/foo", &limits).is_none());
        });
    }

    #[test]
    fn settling_twice_is_an_error() {
        let mgr = TxnMgr::new();
        let mut txn = mgr.txn(false);
        txn.commit().unwrap();
        assert!(matches!(txn.commit(), Err(RouterError::SettledTxn)));
    }

    #[test]
    fn read_only_txn_rejects_writes() {
        let mgr = TxnMgr::new();
        let mut txn = mgr.txn(true);
        let err = txn
            .insert("GET", Route::new("/foo", 0, test_handler()), &opts())
            .unwrap_err();
        assert!(matches!(err, RouterError::ReadOnlyTxn));
    }

    #[test]
    fn updates_commits_on_ok_and_aborts_on_err() {
        let mgr = TxnMgr::new();
        mgr.updates(|txn| -> Result<(), RouterError> {
            txn.insert("GET", Route::new("/foo", 0, test_handler()), &opts())?;
            Ok(())
        })
        .unwrap();

        let limits = opts().parse_limits();
        mgr.view(|v| assert!(v.route("GET", "/foo", &limits).is_some()));

        let result = mgr.updates(|txn| -> Result<(), RouterError> {
            txn.insert("GET", Route::new("/bar", 0, test_handler()), &opts())?;
            Err(RouterError::InvalidConfig {
                reason: "forced".into(),
            })
        });
        assert!(result.is_err());
        mgr.view(|v| assert!(v.route("GET", "/bar", &limits).is_none()));
    }

    #[test]
    fn updates_releases_lock_and_rethrows_on_panic() {
        let mgr = TxnMgr::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = mgr.updates(|txn| -> Result<(), RouterError> {
                txn.insert("GET", Route::new("/foo", 0, test_handler()), &opts())?;
                panic!("boom");
            });
        }));
        assert!(result.is_err());

        // The write lock must have been released despite the panic.
        let mut txn = mgr.txn(false);
        txn.insert("GET", Route::new("/baz", 0, test_handler()), &opts())
            .unwrap();
        txn.commit().unwrap();
    }
}
