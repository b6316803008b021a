use std::env;
use std::fs;

use lndash_util::observability::init_tracing_subscriber;

// Only one test in this binary may install the global subscriber.
#[test]
fn init_tracing_subscriber_test() {
    env::remove_var("RUST_LOG");
    let dir = tempfile::tempdir().unwrap();
    let datadir = dir.path().join("nested").join("datadir");

    let guard = init_tracing_subscriber(&datadir, "lndash", "info").unwrap();
    tracing::info!("poller started");
    log::warn!("refresh channels failed: unavailable");
    tracing::debug!("below the default level");

    // a second subscriber can't be installed
    assert!(init_tracing_subscriber(&datadir, "other", "info").is_err());
    drop(guard);

    let contents = fs::read_to_string(datadir.join("lndash.log")).unwrap();
    assert!(contents.contains("poller started"));
    assert!(contents.contains("refresh channels failed: unavailable"));
    assert!(!contents.contains("below the default level"));
}

#[test]
fn init_rejects_unknown_level_test() {
    let dir = tempfile::tempdir().unwrap();
    assert!(init_tracing_subscriber(dir.path(), "lndash", "loud").is_err());
}
