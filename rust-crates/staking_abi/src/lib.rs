use alloy::{
    primitives::{
        Address,
        Log,
    },
    sol_types::SolEvent,
};

pub mod staking_types {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        interface PredictionStaking {
            struct UserStake {
                uint256 predictionId;
                string cryptoId;
                uint256 currentPrice;
                uint256 predictedPrice;
                uint256 actualPrice;
                uint256 timestamp;
                bool verified;
                uint256 accuracy;
                string direction;
                uint256 percentChange;
                uint256 expiresAt;
                uint256 totalStakedUp;
                uint256 totalStakedDown;
                uint256 userStakeUp;
                uint256 userStakeDown;
            }

            event StakePlaced(
                uint256 indexed predictionId,
                address indexed staker,
                uint256 amount,
                bool stakeUp,
                uint256 timestamp
            );
            event PredictionRecorded(
                uint256 indexed predictionId,
                address indexed predictor,
                string cryptoId,
                uint256 currentPrice,
                uint256 predictedPrice,
                uint256 timestamp
            );
            event PredictionVerified(
                uint256 indexed predictionId,
                uint256 actualPrice,
                uint256 accuracy
            );
            event RewardsDistributed(
                uint256 indexed predictionId,
                uint256 totalRewards,
                uint256 stakerCount
            );

            function stakeOnPrediction(uint256 predictionId, bool stakeUp) external payable;
            function claimRewards(uint256 predictionId) external;
            function recordPrediction(
                string memory cryptoId,
                uint256 currentPrice,
                uint256 predictedPrice,
                string memory direction,
                uint256 percentChange
            ) external returns (uint256 predictionId);
            function verifyPrediction(uint256 predictionId, uint256 actualPrice) external;
            function getUserStakedPredictions(address user) external view returns (uint256[] memory);
            function getStakesByUser(address user) external view returns (UserStake[] memory);
            function getPrediction(uint256 predictionId) external view returns (
                address predictor,
                string memory cryptoId,
                uint256 currentPrice,
                uint256 predictedPrice,
                uint256 actualPrice,
                uint256 timestamp,
                bool verified,
                uint256 accuracy,
                string memory direction,
                uint256 percentChange
            );
            function getPredictionExpiry(uint256 predictionId) external view returns (uint256);
        }
    }
}

pub use staking_types::PredictionStaking;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

/// Logs emitted by `contract` whose first topic is the signature of `E`.
pub fn logs_for_event<'a, E: SolEvent>(
    logs: &'a [Log],
    contract: Address,
) -> impl Iterator<Item = &'a Log> + 'a {
    logs.iter().filter(move |log| {
        log.address == contract
            && log.data.topics().first() == Some(&E::SIGNATURE_HASH)
    })
}

pub fn event_name(log: &Log) -> Option<&'static str> {
    use PredictionStaking::{
        PredictionRecorded,
        PredictionVerified,
        RewardsDistributed,
        StakePlaced,
    };

    let topic = log.data.topics().first()?;
    [
        (StakePlaced::SIGNATURE_HASH, StakePlaced::SIGNATURE),
        (PredictionRecorded::SIGNATURE_HASH, PredictionRecorded::SIGNATURE),
        (PredictionVerified::SIGNATURE_HASH, PredictionVerified::SIGNATURE),
        (RewardsDistributed::SIGNATURE_HASH, RewardsDistributed::SIGNATURE),
    ]
    .into_iter()
    .find(|(hash, _)| hash == topic)
    .map(|(_, signature)| signature)
}
