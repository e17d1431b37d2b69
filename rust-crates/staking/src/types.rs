use crate::error::TxError;
use alloy::primitives::{
    Address,
    U256,
    utils::{
        format_ether,
        parse_ether,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use staking_abi::PredictionStaking;
use std::{
    fmt,
    str::FromStr,
};

pub type PredictionId = U256;

pub const WEI_PER_MILLI: u64 = 1_000_000_000_000_000;
/// 0.001 native coin.
pub const MIN_STAKE_WEI: U256 = U256::from_limbs([WEI_PER_MILLI, 0, 0, 0]);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn is_up(self) -> bool {
        matches!(self, Direction::Up)
    }

    /// Lenient reading of an on-chain label: anything other than "up" is down.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("up") {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn from_stake_up(stake_up: bool) -> Self {
        if stake_up { Direction::Up } else { Direction::Down }
    }

    pub fn toggled(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = TxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(TxError::InvalidInput(format!(
                "direction must be \"up\" or \"down\", got {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TxKind {
    Record,
    Stake,
    Claim,
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TxKind::Record => "record prediction",
            TxKind::Stake => "stake",
            TxKind::Claim => "claim rewards",
        };
        f.write_str(label)
    }
}

/// A prediction as stored by the contract. Prices are 18-decimal fixed point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prediction {
    pub id: PredictionId,
    pub crypto_id: String,
    pub predictor: Option<Address>,
    pub current_price: U256,
    pub predicted_price: U256,
    pub actual_price: U256,
    pub created_at: u64,
    pub verified: bool,
    pub accuracy: U256,
    pub direction: Direction,
    pub percent_change_bps: u64,
    pub expires_at: u64,
}

impl Prediction {
    pub fn from_chain(
        id: PredictionId,
        fields: PredictionStaking::getPredictionReturn,
        expires_at: U256,
    ) -> Result<Self, TxError> {
        Ok(Self {
            id,
            crypto_id: fields.cryptoId,
            predictor: Some(fields.predictor),
            current_price: fields.currentPrice,
            predicted_price: fields.predictedPrice,
            actual_price: fields.actualPrice,
            created_at: to_u64(fields.timestamp, "timestamp")?,
            verified: fields.verified,
            accuracy: fields.accuracy,
            direction: Direction::from_label(&fields.direction),
            percent_change_bps: to_u64(fields.percentChange, "percentChange")?,
            expires_at: to_u64(expires_at, "expiresAt")?,
        })
    }
}

/// The signer's stake and the pool totals for one prediction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StakePosition {
    pub up_wei: U256,
    pub down_wei: U256,
    pub total_up_wei: U256,
    pub total_down_wei: U256,
}

impl StakePosition {
    pub fn has_stake(&self) -> bool {
        !self.up_wei.is_zero() || !self.down_wei.is_zero()
    }

    pub fn own_total(&self) -> U256 {
        self.up_wei.saturating_add(self.down_wei)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeEntry {
    pub prediction: Prediction,
    pub position: StakePosition,
}

impl TryFrom<PredictionStaking::UserStake> for StakeEntry {
    type Error = TxError;

    fn try_from(stake: PredictionStaking::UserStake) -> Result<Self, Self::Error> {
        let prediction = Prediction {
            id: stake.predictionId,
            crypto_id: stake.cryptoId,
            predictor: None,
            current_price: stake.currentPrice,
            predicted_price: stake.predictedPrice,
            actual_price: stake.actualPrice,
            created_at: to_u64(stake.timestamp, "timestamp")?,
            verified: stake.verified,
            accuracy: stake.accuracy,
            direction: Direction::from_label(&stake.direction),
            percent_change_bps: to_u64(stake.percentChange, "percentChange")?,
            expires_at: to_u64(stake.expiresAt, "expiresAt")?,
        };
        let position = StakePosition {
            up_wei: stake.userStakeUp,
            down_wei: stake.userStakeDown,
            total_up_wei: stake.totalStakedUp,
            total_down_wei: stake.totalStakedDown,
        };
        Ok(Self {
            prediction,
            position,
        })
    }
}

/// A stake observed in a `StakePlaced` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stake {
    pub prediction_id: PredictionId,
    pub staker: Address,
    pub amount_wei: U256,
    pub direction: Direction,
    pub placed_at: u64,
}

impl TryFrom<PredictionStaking::StakePlaced> for Stake {
    type Error = TxError;

    fn try_from(event: PredictionStaking::StakePlaced) -> Result<Self, Self::Error> {
        Ok(Self {
            prediction_id: event.predictionId,
            staker: event.staker,
            amount_wei: event.amount,
            direction: Direction::from_stake_up(event.stakeUp),
            placed_at: to_u64(event.timestamp, "timestamp")?,
        })
    }
}

pub(crate) fn to_u64(value: U256, field: &str) -> Result<u64, TxError> {
    u64::try_from(value)
        .map_err(|_| TxError::DecodeError(format!("{field} does not fit in u64: {value}")))
}

pub fn wei_to_coin(wei: U256) -> f64 {
    format_ether(wei).parse().unwrap_or(f64::MAX)
}

pub fn coin_to_wei(amount: f64) -> Result<U256, TxError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(TxError::InvalidInput(format!(
            "amount must be a finite, non-negative number, got {amount}"
        )));
    }
    parse_ether(&format!("{amount:.18}")).map_err(|e| {
        TxError::InvalidInput(format!("amount {amount} is not representable: {e}"))
    })
}

pub fn milli_to_wei(milli: u64) -> U256 {
    U256::from(milli).saturating_mul(U256::from(WEI_PER_MILLI))
}
