//! Transaction semantics exercised through the public `Router` facade
//! (managed `updates`, unmanaged `txn`, commit/abort/panic).

use std::sync::Arc;

use radixmux::{ParseLimits, Route, Router, RouterError, RouterOptions};

fn handler() -> Arc<dyn radixmux::Handler> {
    Arc::new(())
}

fn router() -> Router {
    Router::new(RouterOptions::default()).unwrap()
}

#[test]
fn managed_updates_commits_on_ok() {
    let r = router();
    r.updates(|txn| -> Result<(), RouterError> {
        txn.insert("GET", Route::new("/foo", 0, handler()), r.options())?;
        txn.insert("GET", Route::new("/bar", 0, handler()), r.options())?;
        Ok(())
    })
    .unwrap();

    assert!(r.has("GET", "/foo"));
    assert!(r.has("GET", "/bar"));
}

#[test]
fn managed_updates_rolls_back_on_error() {
    let r = router();
    let result = r.updates(|txn| -> Result<(), RouterError> {
        txn.insert("GET", Route::new("/foo", 0, handler()), r.options())?;
        Err(RouterError::InvalidConfig {
            reason: "abort this batch".into(),
        })
    });
    assert!(result.is_err());
    assert!(!r.has("GET", "/foo"));
}

#[test]
fn managed_updates_rolls_back_and_rethrows_on_panic() {
    let r = router();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        r.updates(|txn| -> Result<(), RouterError> {
            txn.insert("GET", Route::new("/foo", 0, handler()), r.options())?;
            panic!("simulated failure mid-transaction");
        })
    }));
    assert!(outcome.is_err());
    assert!(!r.has("GET", "/foo"));

    // The write mutex must have been released despite the panic.
    r.handle("GET", Route::new("/baz", 0, handler())).unwrap();
    assert!(r.has("GET", "/baz"));
}

#[test]
fn unmanaged_txn_requires_explicit_commit() {
    let r = router();
    let mut txn = r.txn(false);
    txn.insert("GET", Route::new("/foo", 0, handler()), r.options())
        .unwrap();
    // Not committed yet: readers via the router must not see it.
    assert!(!r.has("GET", "/foo"));
    txn.commit().unwrap();
    assert!(r.has("GET", "/foo"));
}

#[test]
fn unmanaged_txn_abort_discards_the_draft() {
    let r = router();
    let mut txn = r.txn(false);
    txn.insert("GET", Route::new("/foo", 0, handler()), r.options())
        .unwrap();
    txn.abort().unwrap();
    assert!(!r.has("GET", "/foo"));
}

#[test]
fn settling_a_transaction_twice_errors() {
    let r = router();
    let mut txn = r.txn(false);
    txn.commit().unwrap();
    assert!(matches!(txn.commit(), Err(RouterError::SettledTxn)));
    assert!(matches!(txn.abort(), Err(RouterError::SettledTxn)));
}

#[test]
fn read_only_txn_rejects_mutation() {
    let r = router();
    r.handle("GET", Route::new("/foo", 0, handler())).unwrap();

    let mut txn = r.txn(true);
    let err = txn
        .insert("GET", Route::new("/bar", 0, handler()), r.options())
        .unwrap_err();
    assert!(matches!(err, RouterError::ReadOnlyTxn));
    let limits = ParseLimits {
        allow_regexp_param: true,
        max_params: None,
        max_param_key_bytes: None,
    };
    assert!(txn.has("GET", "/foo", &limits));
}
