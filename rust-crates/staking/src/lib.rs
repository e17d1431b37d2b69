pub mod alloy_chain;
pub mod chain;
pub mod contract;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod revert;
pub mod tracker;
pub mod types;
pub mod view;

#[cfg(test)]
mod fake_chain;

pub use chain::{
    ChainClient,
    ContractCall,
    TxReceipt,
};
pub use error::{
    StakeFlowError,
    TxError,
};
pub use orchestrator::StakeOrchestrator;
pub use tracker::{
    TrackerConfig,
    TrackerState,
    TxTracker,
};

pub type Result<T, E = TxError> = std::result::Result<T, E>;
