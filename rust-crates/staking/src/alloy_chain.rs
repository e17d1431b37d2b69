use crate::{
    chain::{
        ChainClient,
        ContractCall,
        RevertProbe,
        TxReceipt,
    },
    error::TxError,
};
use alloy::{
    eips::BlockId,
    network::{
        EthereumWallet,
        TransactionBuilder,
    },
    primitives::{
        Address,
        Bytes,
        TxHash,
        U256,
    },
    providers::{
        DynProvider,
        PendingTransactionBuilder,
        Provider,
        ProviderBuilder,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use tracing::debug;
use url::Url;

/// JSON-RPC backed [`ChainClient`]. Build one per process and share it.
#[derive(Clone)]
pub struct AlloyChainClient {
    provider: DynProvider,
    signer: Address,
    rpc_url: Url,
}

impl AlloyChainClient {
    pub fn connect(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self, TxError> {
        let url: Url = rpc_url.parse().map_err(|e| {
            TxError::InvalidInput(format!("invalid RPC URL {rpc_url}: {e}"))
        })?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url.clone())
            .erased();
        debug!(%address, rpc = %url, "chain client connected");
        Ok(Self {
            provider,
            signer: address,
            rpc_url: url,
        })
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    pub async fn chain_id(&self) -> Result<u64, TxError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| TxError::RpcUnavailable(e.to_string()))
    }

    pub async fn balance(&self) -> Result<U256, TxError> {
        self.provider
            .get_balance(self.signer)
            .await
            .map_err(|e| TxError::RpcUnavailable(e.to_string()))
    }

    fn request(&self, call: &ContractCall) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(self.signer)
            .with_to(call.to)
            .with_input(call.input.clone())
            .with_value(call.value)
    }
}

impl ChainClient for AlloyChainClient {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn submit(&self, call: &ContractCall) -> Result<TxHash, TxError> {
        let pending = self
            .provider
            .send_transaction(self.request(call))
            .await
            .map_err(|e| TxError::classify(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, TxError> {
        self.provider
            .get_transaction_receipt(hash)
            .await
            .map(|receipt| receipt.map(TxReceipt::from))
            .map_err(|e| TxError::RpcUnavailable(e.to_string()))
    }

    async fn watch_receipt(&self, hash: TxHash) -> Result<TxReceipt, TxError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), hash)
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|e| TxError::RpcUnavailable(e.to_string()))?;
        Ok(receipt.into())
    }

    async fn read(&self, to: Address, input: Bytes) -> Result<Bytes, TxError> {
        let request = TransactionRequest::default().with_to(to).with_input(input);
        self.provider
            .call(request)
            .await
            .map_err(|e| TxError::RpcUnavailable(e.to_string()))
    }

    async fn replay(
        &self,
        call: &ContractCall,
        block: Option<u64>,
    ) -> Result<RevertProbe, TxError> {
        let mut replay = self.provider.call(self.request(call));
        if let Some(number) = block {
            replay = replay.block(BlockId::number(number));
        }
        match replay.await {
            Ok(_) => Ok(RevertProbe::default()),
            Err(err) => {
                let data = err.as_error_resp().and_then(|payload| payload.as_revert_data());
                Ok(RevertProbe {
                    data,
                    message: Some(err.to_string()),
                })
            }
        }
    }
}
