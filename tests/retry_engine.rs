//! Property P7 (metadata-stale retry): a `NOT_LEADER_OR_FOLLOWER` response
//! is retriable and flags stale metadata, and the retry engine retries it
//! exactly once before succeeding.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use kafka_native::cluster::RetryConfig;
use kafka_native::error::{Error, ProtocolError, Result};

fn not_leader_or_follower() -> Error {
    Error::Protocol(ProtocolError::from_code(0 /* Produce */, 6))
}

#[tokio::test]
async fn stale_metadata_error_is_retried_exactly_once_then_succeeds() {
    let calls = AtomicU32::new(0);
    let config = RetryConfig { retries: 5, retry_delay: Duration::from_millis(1) };

    let result: Result<&'static str> = kafka_native::cluster::retry::perform_with_retry("produce", &config, |_| false, || async {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            Err(not_leader_or_follower())
        } else {
            Ok("accepted")
        }
    })
    .await;

    assert_eq!(result.unwrap(), "accepted");
    assert_eq!(calls.load(Ordering::SeqCst), 2, "exactly one retry after the stale-metadata error");
}

#[test]
fn not_leader_or_follower_is_classified_as_stale_metadata_and_retriable() {
    let err = not_leader_or_follower();
    assert!(err.is_retriable());
    assert!(err.has_stale_metadata());
    assert!(!err.needs_rejoin());
}

#[test]
fn unknown_member_id_is_not_retriable_but_needs_rejoin() {
    let err = Error::Protocol(ProtocolError::from_code(11 /* JoinGroup */, 25));
    assert!(!err.is_retriable());
    assert!(err.needs_rejoin());
    assert!(err.unknown_member_id());
}

#[test]
fn network_errors_are_always_retriable() {
    assert!(Error::network("connection reset").is_retriable());
    assert!(Error::network_closed().is_retriable());
}

#[tokio::test]
async fn should_skip_retry_hook_can_opt_a_retriable_error_out() {
    let config = RetryConfig { retries: 5, retry_delay: Duration::from_millis(1) };
    let result: Result<()> = kafka_native::cluster::retry::perform_with_retry(
        "cancelled-op",
        &config,
        |_| true, // caller-initiated cancellation always skips retry
        || async { Err(Error::network("would normally retry")) },
    )
    .await;
    assert!(matches!(result, Err(Error::Network { .. })));
}
