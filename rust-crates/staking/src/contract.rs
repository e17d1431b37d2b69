use crate::{
    chain::{
        ChainClient,
        ContractCall,
    },
    error::TxError,
    types::{
        Direction,
        Prediction,
        PredictionId,
        StakeEntry,
        StakePosition,
        TxKind,
        to_u64,
    },
};
use alloy::{
    primitives::{
        Address,
        U256,
    },
    sol_types::SolCall,
};
use staking_abi::PredictionStaking;
use std::sync::Arc;
use tracing::{
    debug,
    warn,
};

pub fn record_prediction_call(
    contract: Address,
    crypto_id: &str,
    current_price: U256,
    predicted_price: U256,
    direction: Direction,
    percent_change_bps: u64,
) -> ContractCall {
    let call = PredictionStaking::recordPredictionCall {
        cryptoId: crypto_id.to_string(),
        currentPrice: current_price,
        predictedPrice: predicted_price,
        direction: direction.as_str().to_string(),
        percentChange: U256::from(percent_change_bps),
    };
    ContractCall::new(TxKind::Record, contract, call.abi_encode(), U256::ZERO)
}

pub fn stake_call(
    contract: Address,
    prediction_id: PredictionId,
    direction: Direction,
    amount_wei: U256,
) -> ContractCall {
    let call = PredictionStaking::stakeOnPredictionCall {
        predictionId: prediction_id,
        stakeUp: direction.is_up(),
    };
    ContractCall::new(TxKind::Stake, contract, call.abi_encode(), amount_wei)
}

pub fn claim_call(contract: Address, prediction_id: PredictionId) -> ContractCall {
    let call = PredictionStaking::claimRewardsCall {
        predictionId: prediction_id,
    };
    ContractCall::new(TxKind::Claim, contract, call.abi_encode(), U256::ZERO)
}

/// Read-only access to the staking contract.
pub struct StakingReader<C> {
    chain: Arc<C>,
    contract: Address,
}

impl<C> Clone for StakingReader<C> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
            contract: self.contract,
        }
    }
}

impl<C: ChainClient> StakingReader<C> {
    pub fn new(chain: Arc<C>, contract: Address) -> Self {
        Self { chain, contract }
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    async fn call<T: SolCall>(&self, call: T) -> Result<T::Return, TxError> {
        let data = self.chain.read(self.contract, call.abi_encode().into()).await?;
        T::abi_decode_returns(&data)
            .map_err(|e| TxError::DecodeError(format!("{}: {e}", T::SIGNATURE)))
    }

    pub async fn user_staked_predictions(
        &self,
        user: Address,
    ) -> Result<Vec<PredictionId>, TxError> {
        self.call(PredictionStaking::getUserStakedPredictionsCall { user })
            .await
    }

    pub async fn prediction_expiry(&self, id: PredictionId) -> Result<u64, TxError> {
        let expiry = self
            .call(PredictionStaking::getPredictionExpiryCall { predictionId: id })
            .await?;
        to_u64(expiry, "expiresAt")
    }

    pub async fn prediction(&self, id: PredictionId) -> Result<Prediction, TxError> {
        let fields = self
            .call(PredictionStaking::getPredictionCall { predictionId: id })
            .await?;
        let expires_at = self
            .call(PredictionStaking::getPredictionExpiryCall { predictionId: id })
            .await?;
        Prediction::from_chain(id, fields, expires_at)
    }

    pub async fn stakes_by_user(&self, user: Address) -> Result<Vec<StakeEntry>, TxError> {
        self.call(PredictionStaking::getStakesByUserCall { user })
            .await?
            .into_iter()
            .map(StakeEntry::try_from)
            .collect()
    }

    /// Every prediction `user` staked on. Falls back to per-id reads when the
    /// aggregate call is unavailable; those rows carry no position data.
    pub async fn board(&self, user: Address) -> Result<Vec<StakeEntry>, TxError> {
        match self.stakes_by_user(user).await {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(%user, error = %err, "getStakesByUser unavailable, reading predictions one by one");
                let ids = self.user_staked_predictions(user).await?;
                debug!(%user, count = ids.len(), "reading staked predictions");
                let mut entries = Vec::with_capacity(ids.len());
                for id in ids {
                    entries.push(StakeEntry {
                        prediction: self.prediction(id).await?,
                        position: StakePosition::default(),
                    });
                }
                Ok(entries)
            }
        }
    }
}
