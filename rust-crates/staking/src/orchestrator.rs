//! Multi-step staking flows built on the tracker.
//!
//! A step only starts after the previous one confirmed and the tracker's
//! settle delay passed. A failed step ends the flow with that step's error,
//! along with any prediction the flow recorded before it.

use crate::{
    chain::ChainClient,
    contract::{
        claim_call,
        record_prediction_call,
        stake_call,
    },
    error::{
        StakeFlowError,
        TxError,
    },
    events::{
        recorded_prediction_id,
        scan_stakes,
    },
    tracker::{
        ConfirmedTx,
        TxTracker,
    },
    types::{
        Direction,
        MIN_STAKE_WEI,
        PredictionId,
        Stake,
        coin_to_wei,
        wei_to_coin,
    },
};
use alloy::primitives::{
    Address,
    U256,
};
use std::sync::Arc;
use tracing::{
    info,
    warn,
};

/// An AI suggestion about to be recorded on chain.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionDraft {
    pub crypto_id: String,
    pub current_price: f64,
    pub direction: Direction,
    /// Percent, e.g. `8.3` for 8.3%. The sign is ignored.
    pub percent_change: f64,
}

impl PredictionDraft {
    pub fn validate(&self) -> Result<(), TxError> {
        if self.crypto_id.trim().is_empty() {
            return Err(TxError::InvalidInput("asset id must not be empty".to_string()));
        }
        if !self.current_price.is_finite() || self.current_price <= 0.0 {
            return Err(TxError::InvalidInput(format!(
                "current price must be positive, got {}",
                self.current_price
            )));
        }
        if !self.percent_change.is_finite() {
            return Err(TxError::InvalidInput(format!(
                "percent change must be a number, got {}",
                self.percent_change
            )));
        }
        Ok(())
    }

    pub fn percent_change_bps(&self) -> u64 {
        (self.percent_change.abs() * 100.0).round() as u64
    }

    pub fn predicted_price(&self) -> f64 {
        let fraction = self.percent_change.abs() / 100.0;
        match self.direction {
            Direction::Up => self.current_price * (1.0 + fraction),
            Direction::Down => self.current_price * (1.0 - fraction),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakeIntent {
    pub amount_wei: U256,
    pub direction: Direction,
}

impl StakeIntent {
    pub fn validate(&self) -> Result<(), TxError> {
        if self.amount_wei < MIN_STAKE_WEI {
            return Err(TxError::InvalidInput(format!(
                "minimum stake is {} (got {})",
                wei_to_coin(MIN_STAKE_WEI),
                wei_to_coin(self.amount_wei)
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeOutcome {
    pub prediction_id: PredictionId,
    /// Set when the flow had to record the prediction first.
    pub recorded: Option<ConfirmedTx>,
    pub stake: ConfirmedTx,
    /// `StakePlaced` events found in the stake receipt.
    pub placed: Vec<Stake>,
}

pub struct StakeOrchestrator<C> {
    tracker: Arc<TxTracker<C>>,
    contract: Address,
}

impl<C> Clone for StakeOrchestrator<C> {
    fn clone(&self) -> Self {
        Self {
            tracker: self.tracker.clone(),
            contract: self.contract,
        }
    }
}

impl<C: ChainClient> StakeOrchestrator<C> {
    pub fn new(tracker: Arc<TxTracker<C>>, contract: Address) -> Self {
        Self { tracker, contract }
    }

    pub fn tracker(&self) -> &Arc<TxTracker<C>> {
        &self.tracker
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Stakes on `existing`, or records `draft` first and stakes on the id
    /// the record receipt reports.
    ///
    /// When the stake fails after a successful record, the error keeps the
    /// recorded id.
    pub async fn stake_on_asset(
        &self,
        existing: Option<PredictionId>,
        draft: &PredictionDraft,
        intent: StakeIntent,
    ) -> Result<StakeOutcome, StakeFlowError> {
        intent.validate()?;
        let (prediction_id, recorded) = match existing {
            Some(id) => (id, None),
            None => {
                let (id, confirmed) = self.record_prediction(draft).await?;
                (id, Some(confirmed))
            }
        };
        let (stake, placed) =
            self.stake(prediction_id, intent)
                .await
                .map_err(|cause| StakeFlowError {
                    recorded: recorded.is_some().then_some(prediction_id),
                    cause,
                })?;
        Ok(StakeOutcome {
            prediction_id,
            recorded,
            stake,
            placed,
        })
    }

    pub async fn record_prediction(
        &self,
        draft: &PredictionDraft,
    ) -> Result<(PredictionId, ConfirmedTx), TxError> {
        draft.validate()?;
        let call = record_prediction_call(
            self.contract,
            draft.crypto_id.trim(),
            coin_to_wei(draft.current_price)?,
            coin_to_wei(draft.predicted_price())?,
            draft.direction,
            draft.percent_change_bps(),
        );
        self.tracker.ready().await;
        let confirmed = self.tracker.submit(call).await?;
        let prediction_id = recorded_prediction_id(&confirmed.receipt, self.contract)?;
        info!(
            %prediction_id,
            crypto_id = %draft.crypto_id,
            hash = %confirmed.hash(),
            "prediction recorded"
        );
        Ok((prediction_id, confirmed))
    }

    pub async fn stake(
        &self,
        prediction_id: PredictionId,
        intent: StakeIntent,
    ) -> Result<(ConfirmedTx, Vec<Stake>), TxError> {
        intent.validate()?;
        let call = stake_call(
            self.contract,
            prediction_id,
            intent.direction,
            intent.amount_wei,
        );
        self.tracker.ready().await;
        let confirmed = self.tracker.submit(call).await?;
        let placed = scan_stakes(&confirmed.receipt.logs, self.contract);
        if placed.is_empty() {
            warn!(%prediction_id, hash = %confirmed.hash(), "stake confirmed without StakePlaced event");
        } else {
            info!(%prediction_id, direction = %intent.direction, amount = %intent.amount_wei, "stake placed");
        }
        Ok((confirmed, placed))
    }

    pub async fn claim_rewards(
        &self,
        prediction_id: PredictionId,
    ) -> Result<ConfirmedTx, TxError> {
        self.tracker.ready().await;
        let confirmed = self
            .tracker
            .submit(claim_call(self.contract, prediction_id))
            .await?;
        info!(%prediction_id, hash = %confirmed.hash(), "rewards claimed");
        Ok(confirmed)
    }
}
