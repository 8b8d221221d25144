//! Change token lifecycle contract tests
//!
//! Verifies that exactly one token is issued per non-no-op phase and that
//! each token is consumed by exactly one apply_updates call, never reused.

mod common;

use std::collections::HashSet;

use common::{MockGateway, cidrs, test_config};
use wafsync_core::Reconciler;

#[tokio::test]
async fn one_token_per_phase_never_reused() {
    let gateway = MockGateway::new(cidrs(&["9.9.9.0/24", "10.0.0.0/16"]));
    let handle = gateway.handle();
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    let desired = cidrs(&["10.0.0.0/16", "8.8.8.0/24"]);
    let summary = reconciler.run(&desired).await.unwrap();

    // Insert phase and delete phase each issued exactly one token.
    assert_eq!(handle.tokens_issued(), 2);

    let applied = handle.applied();
    assert_eq!(applied.len(), 2);

    // Every submitted batch carried a distinct token.
    let tokens: HashSet<&str> = applied.iter().map(|a| a.token.as_str()).collect();
    assert_eq!(tokens.len(), applied.len(), "token reused across calls");

    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.current, 2);
}

#[tokio::test]
async fn noop_delete_issues_no_second_token() {
    // Current set is fully contained in the desired list, so only the
    // insert phase should touch the token endpoint.
    let gateway = MockGateway::new(cidrs(&["10.0.0.0/16"]));
    let handle = gateway.handle();
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    reconciler.run(&cidrs(&["10.0.0.0/16"])).await.unwrap();

    assert_eq!(handle.tokens_issued(), 1);
    assert_eq!(handle.applied().len(), 1);
}

#[tokio::test]
async fn read_happens_between_insert_and_delete() {
    let gateway = MockGateway::new(cidrs(&["9.9.9.0/24"]));
    let handle = gateway.handle();
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    reconciler.run(&cidrs(&["10.0.0.0/16"])).await.unwrap();

    assert_eq!(handle.read_calls(), 1, "current set read exactly once");

    // The delete batch was computed from what the read returned.
    let applied = handle.applied();
    assert_eq!(applied[1].batch[0].cidr, "9.9.9.0/24");
}
