use alloy::{
    primitives::{
        Address,
        B256,
        Bytes,
        Log,
        LogData,
        U256,
    },
    sol_types::SolEvent,
};

use crate::PredictionStaking::{
    PredictionRecorded,
    StakePlaced,
};

pub const CONTRACT: Address = Address::repeat_byte(0xc0);
pub const SIGNER: Address = Address::repeat_byte(0x5e);

pub fn prediction_recorded_log(
    contract: Address,
    prediction_id: u64,
    crypto_id: &str,
) -> Log {
    let event = PredictionRecorded {
        predictionId: U256::from(prediction_id),
        predictor: SIGNER,
        cryptoId: crypto_id.to_string(),
        currentPrice: U256::from(100u64),
        predictedPrice: U256::from(108u64),
        timestamp: U256::from(1_700_000_000u64),
    };
    Log {
        address: contract,
        data: event.encode_log_data(),
    }
}

pub fn stake_placed_log(
    contract: Address,
    prediction_id: u64,
    amount: U256,
    stake_up: bool,
) -> Log {
    let event = StakePlaced {
        predictionId: U256::from(prediction_id),
        staker: SIGNER,
        amount,
        stakeUp: stake_up,
        timestamp: U256::from(1_700_000_100u64),
    };
    Log {
        address: contract,
        data: event.encode_log_data(),
    }
}

/// `PredictionRecorded` topics with a data section that does not decode.
pub fn truncated_prediction_recorded_log(contract: Address, prediction_id: u64) -> Log {
    let topics = vec![
        PredictionRecorded::SIGNATURE_HASH,
        B256::from(U256::from(prediction_id)),
        SIGNER.into_word(),
    ];
    Log {
        address: contract,
        data: LogData::new_unchecked(topics, Bytes::from_static(&[0xde, 0xad])),
    }
}

pub fn unrelated_log(address: Address) -> Log {
    Log {
        address,
        data: LogData::new_unchecked(
            vec![B256::repeat_byte(0x11)],
            Bytes::from_static(&[0u8; 32]),
        ),
    }
}
