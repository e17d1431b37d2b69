use crate::{
    error::TxError,
    chain::TxReceipt,
    types::{
        PredictionId,
        Stake,
    },
};
use alloy::{
    primitives::{
        Address,
        Log,
        U256,
    },
    sol_types::SolEvent,
};
use staking_abi::{
    PredictionStaking::{
        PredictionRecorded,
        StakePlaced,
    },
    logs_for_event,
};
use tracing::debug;

/// How a `PredictionRecorded` log was read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedLog {
    Decoded {
        prediction_id: PredictionId,
        crypto_id: String,
    },
    /// Data section did not decode; the id came from the indexed topic.
    Topic { prediction_id: PredictionId },
    Unknown,
}

impl RecordedLog {
    pub fn prediction_id(&self) -> Option<PredictionId> {
        match self {
            RecordedLog::Decoded { prediction_id, .. }
            | RecordedLog::Topic { prediction_id } => Some(*prediction_id),
            RecordedLog::Unknown => None,
        }
    }
}

type Strategy = fn(&Log) -> Option<RecordedLog>;

const STRATEGIES: [Strategy; 2] = [typed_event, indexed_topic];

/// Scans logs emitted by `contract` for a `PredictionRecorded` event.
pub fn scan_prediction_recorded(logs: &[Log], contract: Address) -> RecordedLog {
    logs_for_event::<PredictionRecorded>(logs, contract)
        .find_map(|log| STRATEGIES.iter().find_map(|strategy| strategy(log)))
        .unwrap_or(RecordedLog::Unknown)
}

/// The new prediction id in a confirmed record receipt.
pub fn recorded_prediction_id(
    receipt: &TxReceipt,
    contract: Address,
) -> Result<PredictionId, TxError> {
    let found = scan_prediction_recorded(&receipt.logs, contract);
    debug!(hash = %receipt.hash, ?found, "scanned record receipt");
    found.prediction_id().ok_or(TxError::EventNotFound {
        hash: receipt.hash,
        event: "PredictionRecorded",
    })
}

fn typed_event(log: &Log) -> Option<RecordedLog> {
    let event = PredictionRecorded::decode_log_data(&log.data).ok()?;
    Some(RecordedLog::Decoded {
        prediction_id: event.predictionId,
        crypto_id: event.cryptoId,
    })
}

fn indexed_topic(log: &Log) -> Option<RecordedLog> {
    let topic = log.data.topics().get(1)?;
    Some(RecordedLog::Topic {
        prediction_id: U256::from_be_bytes(topic.0),
    })
}

pub fn scan_stakes(logs: &[Log], contract: Address) -> Vec<Stake> {
    logs_for_event::<StakePlaced>(logs, contract)
        .filter_map(|log| StakePlaced::decode_log_data(&log.data).ok())
        .filter_map(|event| Stake::try_from(event).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::TxHash;
    use staking_abi::test_helpers::{
        CONTRACT,
        SIGNER,
        prediction_recorded_log,
        stake_placed_log,
        truncated_prediction_recorded_log,
        unrelated_log,
    };

    fn receipt(logs: Vec<Log>) -> TxReceipt {
        TxReceipt {
            hash: TxHash::repeat_byte(0x01),
            success: true,
            block_number: Some(7),
            gas_used: 90_000,
            logs,
        }
    }

    #[test]
    fn scan_prediction_recorded__typed_log_among_others__decoded() {
        // given
        let logs = vec![
            unrelated_log(CONTRACT),
            prediction_recorded_log(CONTRACT, 42, "bitcoin"),
        ];

        // when
        let found = scan_prediction_recorded(&logs, CONTRACT);

        // then
        assert_eq!(
            found,
            RecordedLog::Decoded {
                prediction_id: U256::from(42),
                crypto_id: "bitcoin".to_string(),
            }
        );
    }

    #[test]
    fn scan_prediction_recorded__bad_data_section__falls_back_to_topic() {
        // given
        let logs = vec![truncated_prediction_recorded_log(CONTRACT, 9)];

        // when
        let found = scan_prediction_recorded(&logs, CONTRACT);

        // then
        assert_eq!(
            found,
            RecordedLog::Topic {
                prediction_id: U256::from(9)
            }
        );
    }

    #[test]
    fn scan_prediction_recorded__emitted_by_other_contract__unknown() {
        // given
        let other = Address::repeat_byte(0x0f);
        let logs = vec![prediction_recorded_log(other, 42, "bitcoin")];

        // when
        let found = scan_prediction_recorded(&logs, CONTRACT);

        // then
        assert_eq!(found, RecordedLog::Unknown);
    }

    #[test]
    fn recorded_prediction_id__no_logs__event_not_found() {
        // given
        let receipt = receipt(vec![]);

        // when
        let result = recorded_prediction_id(&receipt, CONTRACT);

        // then
        assert_eq!(
            result,
            Err(TxError::EventNotFound {
                hash: receipt.hash,
                event: "PredictionRecorded",
            })
        );
    }

    #[test]
    fn scan_stakes__stake_placed_log__returns_stake() {
        // given
        let amount = U256::from(5_000_000_000_000_000u64);
        let logs = vec![stake_placed_log(CONTRACT, 3, amount, false)];

        // when
        let stakes = scan_stakes(&logs, CONTRACT);

        // then
        assert_eq!(stakes.len(), 1);
        assert_eq!(stakes[0].prediction_id, U256::from(3));
        assert_eq!(stakes[0].staker, SIGNER);
        assert_eq!(stakes[0].amount_wei, amount);
        assert!(!stakes[0].direction.is_up());
    }
}
