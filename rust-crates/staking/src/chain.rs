//! The seam between the pipeline and the network.
//!
//! Everything above this module talks to a [`ChainClient`]; the production
//! implementation lives in [`crate::alloy_chain`], tests script a fake.

use crate::{
    error::TxError,
    types::TxKind,
};
use alloy::{
    primitives::{
        Address,
        Bytes,
        Log,
        TxHash,
        U256,
    },
    rpc::types::TransactionReceipt,
};
use std::future::Future;

/// A state-changing call ready to be signed and broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub kind: TxKind,
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
}

impl ContractCall {
    pub fn new(kind: TxKind, to: Address, input: impl Into<Bytes>, value: U256) -> Self {
        Self {
            kind,
            to,
            input: input.into(),
            value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

impl From<TransactionReceipt> for TxReceipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|log| log.inner.clone())
                .collect(),
        }
    }
}

/// What a replayed call produced when it failed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevertProbe {
    pub data: Option<Bytes>,
    pub message: Option<String>,
}

pub trait ChainClient: Send + Sync + 'static {
    fn signer_address(&self) -> Address;

    /// Signs and broadcasts `call`, returning its hash once the node accepted it.
    fn submit(
        &self,
        call: &ContractCall,
    ) -> impl Future<Output = Result<TxHash, TxError>> + Send;

    /// One receipt lookup. `Ok(None)` while the transaction is not mined.
    fn receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TxReceipt>, TxError>> + Send;

    /// Resolves when the node reports the transaction mined. Implementations
    /// without a notification mechanism return an error immediately.
    fn watch_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<TxReceipt, TxError>> + Send;

    /// Read-only `eth_call` returning raw return data.
    fn read(
        &self,
        to: Address,
        input: Bytes,
    ) -> impl Future<Output = Result<Bytes, TxError>> + Send;

    /// Re-executes `call` as the signer at `block` to recover why it reverted.
    fn replay(
        &self,
        call: &ContractCall,
        block: Option<u64>,
    ) -> impl Future<Output = Result<RevertProbe, TxError>> + Send;
}
