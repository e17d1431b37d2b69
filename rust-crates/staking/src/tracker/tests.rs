#![allow(non_snake_case)]

use super::*;
use crate::fake_chain::{
    FakeChain,
    ReceiptPlan,
};
use alloy::{
    primitives::{
        Bytes,
        U256,
    },
    sol_types::{
        Revert,
        SolError,
    },
};
use crate::chain::RevertProbe;
use staking_abi::test_helpers::CONTRACT;

fn tracker(chain: &Arc<FakeChain>) -> TxTracker<FakeChain> {
    TxTracker::new(chain.clone(), TrackerConfig::default())
}

fn claim_call() -> ContractCall {
    ContractCall::new(TxKind::Claim, CONTRACT, Bytes::from_static(&[1, 2, 3, 4]), U256::ZERO)
}

#[tokio::test(start_paused = true)]
async fn submit__receipt_found_by_polling__confirms_and_settles() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::success().visible_after_polls(2));
    let tracker = tracker(&chain);

    // when
    let confirmed = tracker.submit(claim_call()).await.unwrap();

    // then
    assert_eq!(confirmed.kind, TxKind::Claim);
    assert!(confirmed.receipt.success);
    assert_eq!(chain.receipt_lookups(), 3);
    assert!(matches!(
        tracker.state(),
        TrackerState::Settled {
            settlement: Settlement::Confirmed,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn submit__while_another_is_in_flight__second_refused_and_never_submitted() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::success().visible_after_polls(1));
    let tracker = tracker(&chain);

    // when
    let (first, second) = tokio::join!(
        tracker.submit(claim_call()),
        tracker.submit(claim_call())
    );

    // then
    assert!(first.is_ok());
    assert_eq!(second, Err(TxError::AlreadyInProgress));
    assert_eq!(chain.submitted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn submit__right_after_confirmation__refused_until_settle_delay_passes() {
    // given
    let chain = Arc::new(FakeChain::new());
    let tracker = tracker(&chain);
    tracker.submit(claim_call()).await.unwrap();

    // when
    let too_soon = tracker.submit(claim_call()).await;
    tracker.ready().await;
    let after_settle = tracker.submit(claim_call()).await;

    // then
    assert_eq!(too_soon, Err(TxError::AlreadyInProgress));
    assert!(after_settle.is_ok());
    assert_eq!(chain.submitted().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn submit__never_mined__times_out_and_releases_lock() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::never_mined());
    let tracker = tracker(&chain);
    let started = Instant::now();

    // when
    let result = tracker.submit(claim_call()).await;

    // then
    let hash = TxHash::with_last_byte(1);
    assert_eq!(result, Err(TxError::TimedOut { hash }));
    assert!(started.elapsed() >= DEFAULT_CONFIRMATION_TIMEOUT);
    tracker.ready().await;
    assert_eq!(tracker.state(), TrackerState::Idle);
    assert!(tracker.submit(claim_call()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn submit__both_paths_report__single_outcome_and_poller_stops() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(
        ReceiptPlan::success()
            .visible_after_polls(2)
            .pushed_after(Duration::from_secs(1)),
    );
    let tracker = tracker(&chain);

    // when
    let confirmed = tracker.submit(claim_call()).await.unwrap();
    let lookups_at_confirmation = chain.receipt_lookups();
    time::sleep(Duration::from_secs(30)).await;

    // then
    assert_eq!(confirmed.hash(), TxHash::with_last_byte(1));
    assert_eq!(lookups_at_confirmation, 1);
    assert_eq!(chain.receipt_lookups(), lookups_at_confirmation);
}

#[tokio::test(start_paused = true)]
async fn submit__notification_only__confirms_without_polled_receipt() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::success().push_only(Duration::from_secs(5)));
    let tracker = tracker(&chain);

    // when
    let result = tracker.submit(claim_call()).await;

    // then
    assert!(result.is_ok());
    assert!(chain.receipt_lookups() >= 2);
}

#[tokio::test(start_paused = true)]
async fn submit__reverted_receipt__reports_decoded_reason() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::reverted());
    chain.set_revert_probe(RevertProbe {
        data: Some(Bytes::from(
            Revert {
                reason: "Already claimed".to_string(),
            }
            .abi_encode(),
        )),
        message: None,
    });
    let tracker = tracker(&chain);

    // when
    let result = tracker.submit(claim_call()).await;

    // then
    match result {
        Err(TxError::Reverted {
            reason: RevertReason::Decoded(text),
            ..
        }) => assert!(text.contains("Already claimed")),
        other => panic!("expected decoded revert, got {other:?}"),
    }
    assert_eq!(chain.replays(), vec![Some(99)]);
    assert!(matches!(
        tracker.state(),
        TrackerState::Settled {
            settlement: Settlement::Reverted,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn submit__slow_revert_replay__lock_held_until_caller_sees_revert() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::reverted());
    chain.delay_replays(Duration::from_secs(5));
    let tracker = tracker(&chain);

    // when
    let (first, second) = tokio::join!(tracker.submit(claim_call()), async {
        time::sleep(Duration::from_secs(1)).await;
        let state = tracker.state();
        (state, tracker.submit(claim_call()).await)
    });

    // then
    let (state_during_replay, second) = second;
    assert!(matches!(state_during_replay, TrackerState::PendingConfirmation(_)));
    assert_eq!(second, Err(TxError::AlreadyInProgress));
    assert!(matches!(first, Err(TxError::Reverted { .. })));
    assert_eq!(chain.submitted().len(), 1);
    assert!(matches!(
        tracker.state(),
        TrackerState::Settled {
            settlement: Settlement::Reverted,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn submit__reverted_without_reason__unknown_reason() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::reverted());
    let tracker = tracker(&chain);

    // when
    let result = tracker.submit(claim_call()).await;

    // then
    assert_eq!(
        result,
        Err(TxError::Reverted {
            hash: TxHash::with_last_byte(1),
            reason: RevertReason::Unknown,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn submit__signer_rejects__settles_rejected_then_accepts_again() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.fail_next_submit(TxError::UserRejected);
    let tracker = tracker(&chain);

    // when
    let result = tracker.submit(claim_call()).await;

    // then
    assert_eq!(result, Err(TxError::UserRejected));
    assert!(matches!(
        tracker.state(),
        TrackerState::Settled {
            settlement: Settlement::Rejected,
            hash: None,
            ..
        }
    ));
    tracker.ready().await;
    assert!(tracker.submit(claim_call()).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn submit__rpc_failure_before_broadcast__returns_to_idle_immediately() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.fail_next_submit(TxError::RpcUnavailable("connection refused".to_string()));
    let tracker = tracker(&chain);

    // when
    let result = tracker.submit(claim_call()).await;

    // then
    assert!(matches!(result, Err(TxError::RpcUnavailable(_))));
    assert_eq!(tracker.state(), TrackerState::Idle);
    assert!(!tracker.is_busy());
}

#[tokio::test(start_paused = true)]
async fn shutdown__pending_confirmation__returns_cancelled() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::never_mined());
    let tracker = Arc::new(tracker(&chain));
    let mut states = tracker.subscribe();
    let submitting = tokio::spawn({
        let tracker = tracker.clone();
        async move { tracker.submit(claim_call()).await }
    });

    // when
    states
        .wait_for(|state| state.pending_hash().is_some())
        .await
        .unwrap();
    tracker.shutdown();
    let result = submitting.await.unwrap();

    // then
    let hash = TxHash::with_last_byte(1);
    assert_eq!(result, Err(TxError::Cancelled { hash }));
    assert!(matches!(
        tracker.state(),
        TrackerState::Settled {
            settlement: Settlement::Abandoned,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn submit__dropped_mid_confirmation__lock_settles_as_abandoned() {
    // given
    let chain = Arc::new(FakeChain::new());
    chain.plan(ReceiptPlan::never_mined());
    let tracker = tracker(&chain);

    // when
    let outcome = time::timeout(Duration::from_secs(5), tracker.submit(claim_call())).await;

    // then
    assert!(outcome.is_err());
    assert!(matches!(
        tracker.state(),
        TrackerState::Settled {
            settlement: Settlement::Abandoned,
            hash: Some(_),
            ..
        }
    ));
}
