pub use prediction_staking::{
    self as staking,
    alloy_chain::AlloyChainClient,
};

pub mod api_client;
pub mod config;
pub mod wallets;
