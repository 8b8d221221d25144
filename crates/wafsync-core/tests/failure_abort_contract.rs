//! Failure propagation contract tests
//!
//! Verifies that every gateway failure aborts the run immediately with no
//! internal retry and no partial-success state: an insert-phase failure
//! means the read and delete phases never run.

mod common;

use common::{FailureMode, MockGateway, cidrs, test_config};
use wafsync_core::error::ProtocolErrorKind;
use wafsync_core::{Error, Reconciler};

#[tokio::test]
async fn limits_exceeded_on_insert_stops_the_run() {
    let gateway = MockGateway::failing(
        cidrs(&["9.9.9.0/24"]),
        FailureMode::ProtocolOnApply(ProtocolErrorKind::LimitsExceeded),
    );
    let handle = gateway.handle();
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    let err = reconciler.run(&cidrs(&["10.0.0.0/16"])).await.unwrap_err();
    assert_eq!(err.protocol_kind(), Some(ProtocolErrorKind::LimitsExceeded));

    // Insert consumed one token, then the run terminated: the current set
    // was never read and the delete phase never ran.
    assert_eq!(handle.tokens_issued(), 1);
    assert_eq!(handle.read_calls(), 0);
    assert!(handle.applied().is_empty());
}

#[tokio::test]
async fn stale_token_is_surfaced_not_retried() {
    let gateway = MockGateway::failing(
        vec![],
        FailureMode::ProtocolOnApply(ProtocolErrorKind::StaleChangeToken),
    );
    let handle = gateway.handle();
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    let err = reconciler
        .insert(&cidrs(&["10.0.0.0/16"]))
        .await
        .unwrap_err();
    assert_eq!(
        err.protocol_kind(),
        Some(ProtocolErrorKind::StaleChangeToken)
    );

    // No re-issue, no second attempt.
    assert_eq!(handle.tokens_issued(), 1);
}

#[tokio::test]
async fn transport_error_is_propagated_verbatim() {
    let gateway = MockGateway::failing(vec![], FailureMode::TransportOnApply);
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    let err = reconciler
        .insert(&cidrs(&["10.0.0.0/16"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(err.protocol_kind(), None);
}

#[tokio::test]
async fn token_issue_failure_prevents_submission() {
    let gateway = MockGateway::failing(vec![], FailureMode::TransportOnToken);
    let handle = gateway.handle();
    let (reconciler, _rx) = Reconciler::new(Box::new(gateway), &test_config()).unwrap();

    let err = reconciler
        .insert(&cidrs(&["10.0.0.0/16"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(handle.applied().is_empty());
}
