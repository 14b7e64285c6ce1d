//! Concurrent reader/writer behavior.

use std::sync::{Arc, Barrier};
use std::thread;

use radixmux::{Params, Route, Router, RouterOptions};

fn handler() -> Arc<dyn radixmux::Handler> {
    Arc::new(())
}

#[test]
fn readers_never_observe_a_torn_snapshot_during_concurrent_writes() {
    let r = Arc::new(Router::new(RouterOptions::default()).unwrap());
    r.handle("GET", Route::new("/foo/bar", 0, handler())).unwrap();

    let barrier = Arc::new(Barrier::new(4));

    let mut readers = Vec::new();
    for _ in 0..3 {
        let router = Arc::clone(&r);
        let barrier = Arc::clone(&barrier);
        readers.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..500 {
                let mut params = Params::with_capacity(1);
                let (route, _) = router.lookup("GET", "", "/foo/bar", &mut params);
                assert!(route.is_some(), "registered route must always be visible");
            }
        }));
    }

    let writer_router = Arc::clone(&r);
    let writer_barrier = Arc::clone(&barrier);
    let writer = thread::spawn(move || {
        writer_barrier.wait();
        for i in 0..50 {
            let pattern = format!("/other/{i}");
            writer_router
                .handle("GET", Route::new(pattern, 0, handler()))
                .unwrap();
        }
    });

    for reader in readers {
        reader.join().unwrap();
    }
    writer.join().unwrap();

    assert_eq!(r.iter().len(), 51);
}

#[test]
fn iteration_started_before_a_commit_reflects_pre_commit_state() {
    let r = Router::new(RouterOptions::default()).unwrap();
    r.handle("GET", Route::new("/foo", 0, handler())).unwrap();

    let mut txn = r.txn(false);
    txn.insert("GET", Route::new("/bar", 0, handler()), r.options())
        .unwrap();
    // The draft now has /foo and /bar, but the snapshot readers see
    // (and this iterator, captured before commit) must not.
    let snapshot_before_commit = r.iter();
    txn.commit().unwrap();

    assert_eq!(snapshot_before_commit.len(), 1);
    assert_eq!(r.iter().len(), 2);
}
