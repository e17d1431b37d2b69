use crate::{
    revert::RevertReason,
    types::PredictionId,
};
use alloy::primitives::TxHash;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TxError {
    #[error("Transaction rejected in wallet")]
    UserRejected,
    #[error("Insufficient funds to cover the transaction value and gas fees")]
    InsufficientFunds,
    #[error("Transaction already in progress. Please wait for it to complete.")]
    AlreadyInProgress,
    #[error("RPC unavailable: {0}")]
    RpcUnavailable(String),
    #[error("Failed to decode contract response: {0}")]
    DecodeError(String),
    #[error("Transaction {hash} reverted: {reason}")]
    Reverted { hash: TxHash, reason: RevertReason },
    #[error(
        "Transaction {hash} was not confirmed in time. Check your wallet or a block explorer before retrying."
    )]
    TimedOut { hash: TxHash },
    #[error("Transaction {hash} confirmed but no {event} event was found")]
    EventNotFound { hash: TxHash, event: &'static str },
    #[error("{0}")]
    InvalidInput(String),
    #[error("PredictionStaking contract address is not configured")]
    NotConfigured,
    #[error("Stopped tracking transaction {hash}; it may still confirm")]
    Cancelled { hash: TxHash },
}

/// Failure of a multi-step stake flow.
///
/// `recorded` carries the prediction this flow already put on chain before a
/// later step failed, so a retry can stake on it instead of recording again.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{cause}")]
pub struct StakeFlowError {
    pub recorded: Option<PredictionId>,
    pub cause: TxError,
}

impl From<TxError> for StakeFlowError {
    fn from(cause: TxError) -> Self {
        Self {
            recorded: None,
            cause,
        }
    }
}

const REJECTION_PHRASES: [&str; 4] = [
    "user rejected",
    "user denied",
    "rejected the request",
    "denied transaction signature",
];
const FUNDS_PHRASES: [&str; 2] = ["insufficient funds", "insufficient balance"];
const NONCE_PHRASES: [&str; 4] = [
    "nonce too low",
    "nonce has already been used",
    "replacement transaction underpriced",
    "already known",
];

impl TxError {
    /// Maps a transport or wallet error message onto the taxonomy.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();

        if contains_any(&lower, &REJECTION_PHRASES) || lower.contains("code 4001") {
            TxError::UserRejected
        } else if contains_any(&lower, &FUNDS_PHRASES) {
            TxError::InsufficientFunds
        } else if contains_any(&lower, &NONCE_PHRASES) || lower.contains("nonce") {
            TxError::AlreadyInProgress
        } else {
            TxError::RpcUnavailable(message)
        }
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            TxError::Reverted { hash, .. }
            | TxError::TimedOut { hash }
            | TxError::EventNotFound { hash, .. }
            | TxError::Cancelled { hash } => Some(*hash),
            _ => None,
        }
    }

    /// The transaction may have been mined even though we stopped watching it.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, TxError::TimedOut { .. } | TxError::Cancelled { .. })
    }
}

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| haystack.contains(phrase))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn classify__wallet_rejection__user_rejected() {
        let err = TxError::classify("MetaMask Tx Signature: User denied transaction signature.");
        assert_eq!(err, TxError::UserRejected);
    }

    #[test]
    fn classify__insufficient_funds__insufficient_funds() {
        let err = TxError::classify(
            "server returned an error response: error code -32000: insufficient funds for gas * price + value",
        );
        assert_eq!(err, TxError::InsufficientFunds);
    }

    #[test]
    fn classify__nonce_conflict__already_in_progress() {
        let err = TxError::classify("error code -32000: nonce too low: next nonce 7, tx nonce 6");
        assert_eq!(err, TxError::AlreadyInProgress);
    }

    #[test]
    fn classify__anything_else__rpc_unavailable_keeps_message() {
        let err = TxError::classify("error sending request for url (http://localhost:8545/)");
        assert_eq!(
            err,
            TxError::RpcUnavailable(
                "error sending request for url (http://localhost:8545/)".to_string()
            )
        );
    }

    #[test]
    fn display__flow_error__shows_failing_step() {
        let err = StakeFlowError {
            recorded: Some(PredictionId::from(42)),
            cause: TxError::UserRejected,
        };
        assert_eq!(err.to_string(), "Transaction rejected in wallet");
    }

    #[test]
    fn display__timed_out__asks_user_to_check_wallet() {
        let err = TxError::TimedOut {
            hash: TxHash::repeat_byte(0xab),
        };
        assert!(err.to_string().contains("Check your wallet"));
        assert!(err.outcome_unknown());
    }
}
