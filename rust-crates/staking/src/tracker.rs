//! Single-flight transaction tracker.
//!
//! At most one state-changing submission is in flight per tracker. The state
//! lives in a `watch` channel so the front-end can render it while a
//! transaction is pending, and acquisition is a single compare-and-set on that
//! channel. Confirmation races a notification path against a polling path;
//! whichever reports first wins and the other is cancelled.

use crate::{
    chain::{
        ChainClient,
        ContractCall,
        TxReceipt,
    },
    error::TxError,
    revert::{
        self,
        RevertReason,
    },
    types::TxKind,
};
use alloy::primitives::TxHash;
use std::{
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};
use tokio::{
    sync::watch,
    time::{
        self,
        Instant,
        MissedTickBehavior,
    },
};
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    info,
    trace,
    warn,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub confirmation_timeout: Duration,
    /// How long a settled outcome keeps new submissions out.
    pub settle_delay: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    Reverted,
    TimedOut,
    Rejected,
    Abandoned,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub kind: TxKind,
    pub submitted_at: Instant,
    pub lock_holder: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Submitting {
        kind: TxKind,
        lock_holder: u64,
    },
    PendingConfirmation(PendingTransaction),
    /// Terminal outcome shown until `release_at`, after which the tracker
    /// accepts new submissions again.
    Settled {
        kind: TxKind,
        settlement: Settlement,
        hash: Option<TxHash>,
        release_at: Instant,
    },
}

impl TrackerState {
    pub fn lock_holder(&self) -> Option<u64> {
        match self {
            TrackerState::Submitting { lock_holder, .. } => Some(*lock_holder),
            TrackerState::PendingConfirmation(pending) => Some(pending.lock_holder),
            TrackerState::Idle | TrackerState::Settled { .. } => None,
        }
    }

    pub fn accepts_submission(&self, now: Instant) -> bool {
        match self {
            TrackerState::Idle => true,
            TrackerState::Settled { release_at, .. } => now >= *release_at,
            TrackerState::Submitting { .. } | TrackerState::PendingConfirmation(_) => false,
        }
    }

    pub fn pending_hash(&self) -> Option<TxHash> {
        match self {
            TrackerState::PendingConfirmation(pending) => Some(pending.hash),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedTx {
    pub kind: TxKind,
    pub receipt: TxReceipt,
}

impl ConfirmedTx {
    pub fn hash(&self) -> TxHash {
        self.receipt.hash
    }
}

pub struct TxTracker<C> {
    chain: Arc<C>,
    config: TrackerConfig,
    state: watch::Sender<TrackerState>,
    next_holder: AtomicU64,
    shutdown: CancellationToken,
}

impl<C: ChainClient> TxTracker<C> {
    pub fn new(chain: Arc<C>, config: TrackerConfig) -> Self {
        let (state, _) = watch::channel(TrackerState::Idle);
        Self {
            chain,
            config,
            state,
            next_holder: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn chain(&self) -> &Arc<C> {
        &self.chain
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    /// Current state, reporting an expired settlement as `Idle`.
    pub fn state(&self) -> TrackerState {
        let state = self.state.borrow().clone();
        match state {
            TrackerState::Settled { release_at, .. } if Instant::now() >= release_at => {
                TrackerState::Idle
            }
            other => other,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        !self.state.borrow().accepts_submission(Instant::now())
    }

    /// Waits out the settle delay of the previous outcome, if any.
    pub async fn ready(&self) {
        let release_at = match &*self.state.borrow() {
            TrackerState::Settled { release_at, .. } => Some(*release_at),
            _ => None,
        };
        if let Some(release_at) = release_at {
            time::sleep_until(release_at).await;
            self.state.send_if_modified(|state| {
                let expired = matches!(
                    state,
                    TrackerState::Settled { release_at, .. } if Instant::now() >= *release_at
                );
                if expired {
                    *state = TrackerState::Idle;
                }
                expired
            });
        }
    }

    /// Stops every confirmation wait; in-flight submissions return `Cancelled`.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn submit(&self, call: ContractCall) -> Result<ConfirmedTx, TxError> {
        let mut lock = self.acquire(call.kind)?;
        info!(kind = %call.kind, to = %call.to, value = %call.value, "submitting transaction");

        let hash = match self.chain.submit(&call).await {
            Ok(hash) => hash,
            Err(TxError::UserRejected) => {
                warn!(kind = %call.kind, "transaction rejected by signer");
                lock.settle(Settlement::Rejected, None);
                return Err(TxError::UserRejected);
            }
            Err(err) => {
                warn!(kind = %call.kind, error = %err, "transaction submission failed");
                lock.release();
                return Err(err);
            }
        };

        lock.pending(hash);
        info!(kind = %call.kind, %hash, "transaction pending confirmation");

        let receipt = match self.await_receipt(hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                let settlement = match err {
                    TxError::Cancelled { .. } => Settlement::Abandoned,
                    _ => Settlement::TimedOut,
                };
                warn!(%hash, error = %err, "stopped waiting for receipt");
                lock.settle(settlement, Some(hash));
                return Err(err);
            }
        };

        if receipt.success {
            info!(
                kind = %call.kind,
                %hash,
                block = ?receipt.block_number,
                gas_used = receipt.gas_used,
                "transaction confirmed"
            );
            lock.settle(Settlement::Confirmed, Some(hash));
            Ok(ConfirmedTx {
                kind: call.kind,
                receipt,
            })
        } else {
            // Still pending while the reason is replayed.
            let reason = self.revert_reason(&call, &receipt).await;
            lock.settle(Settlement::Reverted, Some(hash));
            warn!(kind = %call.kind, %hash, %reason, "transaction reverted");
            Err(TxError::Reverted { hash, reason })
        }
    }

    fn acquire(&self, kind: TxKind) -> Result<SubmissionLock<'_>, TxError> {
        let holder = self.next_holder.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let acquired = self.state.send_if_modified(|state| {
            if state.accepts_submission(now) {
                *state = TrackerState::Submitting {
                    kind,
                    lock_holder: holder,
                };
                true
            } else {
                false
            }
        });
        if !acquired {
            debug!(%kind, "submission refused, another transaction is in flight");
            return Err(TxError::AlreadyInProgress);
        }
        Ok(SubmissionLock {
            state: &self.state,
            holder,
            kind,
            settle_delay: self.config.settle_delay,
            finished: false,
        })
    }

    async fn await_receipt(&self, hash: TxHash) -> Result<TxReceipt, TxError> {
        let observers = self.shutdown.child_token();
        let chain = self.chain.as_ref();
        let outcome = tokio::select! {
            receipt = notified_receipt(chain, hash, &observers) => receipt,
            receipt = polled_receipt(chain, hash, self.config.poll_interval, &observers) => receipt,
            _ = time::sleep(self.config.confirmation_timeout) => Err(TxError::TimedOut { hash }),
        };
        observers.cancel();
        outcome
    }

    async fn revert_reason(&self, call: &ContractCall, receipt: &TxReceipt) -> RevertReason {
        // State before the reverting block.
        let block = receipt.block_number.map(|number| number.saturating_sub(1));
        let replay = self.chain.replay(call, block);
        match time::timeout(self.config.confirmation_timeout, replay).await {
            Ok(Ok(probe)) => revert::decode(&probe),
            Ok(Err(err)) => {
                debug!(hash = %receipt.hash, error = %err, "revert replay failed");
                RevertReason::Unknown
            }
            Err(_) => {
                debug!(hash = %receipt.hash, "revert replay timed out");
                RevertReason::Unknown
            }
        }
    }
}

async fn notified_receipt<C: ChainClient>(
    chain: &C,
    hash: TxHash,
    cancel: &CancellationToken,
) -> Result<TxReceipt, TxError> {
    let notified = async {
        match chain.watch_receipt(hash).await {
            Ok(receipt) => {
                debug!(%hash, "receipt delivered by notification");
                receipt
            }
            Err(err) => {
                debug!(%hash, error = %err, "receipt notifications unavailable, polling only");
                std::future::pending().await
            }
        }
    };
    tokio::select! {
        receipt = notified => Ok(receipt),
        _ = cancel.cancelled() => Err(TxError::Cancelled { hash }),
    }
}

async fn polled_receipt<C: ChainClient>(
    chain: &C,
    hash: TxHash,
    every: Duration,
    cancel: &CancellationToken,
) -> Result<TxReceipt, TxError> {
    let mut ticker = time::interval(every.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.cancelled() => return Err(TxError::Cancelled { hash }),
        }
        attempts += 1;
        match chain.receipt(hash).await {
            Ok(Some(receipt)) => {
                debug!(%hash, attempts, "receipt found by polling");
                return Ok(receipt);
            }
            Ok(None) => trace!(%hash, attempts, "transaction not mined yet"),
            Err(err) => debug!(%hash, attempts, error = %err, "receipt lookup failed, retrying"),
        }
    }
}

/// Ownership of the tracker for one submission. Every transition checks the
/// holder id, and dropping an unfinished lock settles it as abandoned.
struct SubmissionLock<'a> {
    state: &'a watch::Sender<TrackerState>,
    holder: u64,
    kind: TxKind,
    settle_delay: Duration,
    finished: bool,
}

impl SubmissionLock<'_> {
    fn pending(&mut self, hash: TxHash) {
        self.transition(TrackerState::PendingConfirmation(PendingTransaction {
            hash,
            kind: self.kind,
            submitted_at: Instant::now(),
            lock_holder: self.holder,
        }));
    }

    fn settle(&mut self, settlement: Settlement, hash: Option<TxHash>) {
        self.transition(TrackerState::Settled {
            kind: self.kind,
            settlement,
            hash,
            release_at: Instant::now() + self.settle_delay,
        });
        self.finished = true;
    }

    fn release(&mut self) {
        self.transition(TrackerState::Idle);
        self.finished = true;
    }

    fn transition(&self, next: TrackerState) -> bool {
        let holder = self.holder;
        self.state.send_if_modified(move |state| {
            if state.lock_holder() == Some(holder) {
                *state = next;
                true
            } else {
                false
            }
        })
    }
}

impl Drop for SubmissionLock<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let hash = self.state.borrow().pending_hash();
            self.settle(Settlement::Abandoned, hash);
        }
    }
}

#[cfg(test)]
mod tests;
