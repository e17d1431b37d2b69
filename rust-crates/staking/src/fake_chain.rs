use crate::{
    chain::{
        ChainClient,
        ContractCall,
        RevertProbe,
        TxReceipt,
    },
    error::TxError,
};
use alloy::primitives::{
    Address,
    B256,
    Bytes,
    Log,
    TxHash,
};
use staking_abi::test_helpers::SIGNER;
use std::{
    collections::{
        HashMap,
        VecDeque,
    },
    sync::Mutex,
    time::Duration,
};

/// How the fake reports the receipt of the next submitted transaction.
#[derive(Clone, Debug)]
pub struct ReceiptPlan {
    pub success: bool,
    pub logs: Vec<Log>,
    /// Lookups returning `None` before the receipt shows up. `None` never shows.
    pub visible_after_polls: Option<usize>,
    /// Delay after which the notification path delivers the receipt.
    pub pushed_after: Option<Duration>,
}

impl ReceiptPlan {
    pub fn success() -> Self {
        Self {
            success: true,
            logs: Vec::new(),
            visible_after_polls: Some(0),
            pushed_after: None,
        }
    }

    pub fn reverted() -> Self {
        Self {
            success: false,
            ..Self::success()
        }
    }

    pub fn never_mined() -> Self {
        Self {
            visible_after_polls: None,
            ..Self::success()
        }
    }

    pub fn with_logs(mut self, logs: Vec<Log>) -> Self {
        self.logs = logs;
        self
    }

    pub fn visible_after_polls(mut self, polls: usize) -> Self {
        self.visible_after_polls = Some(polls);
        self
    }

    pub fn pushed_after(mut self, delay: Duration) -> Self {
        self.pushed_after = Some(delay);
        self
    }

    pub fn push_only(self, delay: Duration) -> Self {
        Self {
            visible_after_polls: None,
            ..self.pushed_after(delay)
        }
    }

    fn receipt(&self, hash: TxHash) -> TxReceipt {
        TxReceipt {
            hash,
            success: self.success,
            block_number: Some(100),
            gas_used: 21_000,
            logs: self.logs.clone(),
        }
    }
}

#[derive(Default)]
struct FakeChainState {
    submitted: Vec<ContractCall>,
    submit_errors: VecDeque<TxError>,
    plans: VecDeque<ReceiptPlan>,
    pending: HashMap<TxHash, (ReceiptPlan, usize)>,
    receipt_lookups: usize,
    reads: HashMap<[u8; 4], Result<Bytes, TxError>>,
    probe: RevertProbe,
    replay_delay: Option<Duration>,
    replays: Vec<Option<u64>>,
}

pub struct FakeChain {
    state: Mutex<FakeChainState>,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeChainState::default()),
        }
    }

    /// Queues the receipt behavior for the next successful submission.
    pub fn plan(&self, plan: ReceiptPlan) {
        self.state.lock().unwrap().plans.push_back(plan);
    }

    pub fn fail_next_submit(&self, err: TxError) {
        self.state.lock().unwrap().submit_errors.push_back(err);
    }

    pub fn set_revert_probe(&self, probe: RevertProbe) {
        self.state.lock().unwrap().probe = probe;
    }

    pub fn delay_replays(&self, delay: Duration) {
        self.state.lock().unwrap().replay_delay = Some(delay);
    }

    pub fn respond_to(&self, selector: [u8; 4], response: Result<Bytes, TxError>) {
        self.state.lock().unwrap().reads.insert(selector, response);
    }

    pub fn submitted(&self) -> Vec<ContractCall> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn receipt_lookups(&self) -> usize {
        self.state.lock().unwrap().receipt_lookups
    }

    pub fn replays(&self) -> Vec<Option<u64>> {
        self.state.lock().unwrap().replays.clone()
    }
}

impl ChainClient for FakeChain {
    fn signer_address(&self) -> Address {
        SIGNER
    }

    async fn submit(&self, call: &ContractCall) -> Result<TxHash, TxError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.submit_errors.pop_front() {
            return Err(err);
        }
        state.submitted.push(call.clone());
        let hash = B256::with_last_byte(state.submitted.len() as u8);
        let plan = state.plans.pop_front().unwrap_or_else(ReceiptPlan::success);
        state.pending.insert(hash, (plan, 0));
        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> Result<Option<TxReceipt>, TxError> {
        let mut state = self.state.lock().unwrap();
        state.receipt_lookups += 1;
        let Some((plan, misses)) = state.pending.get_mut(&hash) else {
            return Ok(None);
        };
        match plan.visible_after_polls {
            Some(polls) if *misses >= polls => Ok(Some(plan.receipt(hash))),
            Some(_) => {
                *misses += 1;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn watch_receipt(&self, hash: TxHash) -> Result<TxReceipt, TxError> {
        let pushed = {
            let state = self.state.lock().unwrap();
            state.pending.get(&hash).and_then(|(plan, _)| {
                plan.pushed_after.map(|delay| (delay, plan.receipt(hash)))
            })
        };
        match pushed {
            Some((delay, receipt)) => {
                tokio::time::sleep(delay).await;
                Ok(receipt)
            }
            None => Err(TxError::RpcUnavailable(
                "receipt notifications unsupported".to_string(),
            )),
        }
    }

    async fn read(&self, _to: Address, input: Bytes) -> Result<Bytes, TxError> {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&input[..4]);
        let state = self.state.lock().unwrap();
        state.reads.get(&selector).cloned().unwrap_or_else(|| {
            Err(TxError::RpcUnavailable("no scripted response".to_string()))
        })
    }

    async fn replay(
        &self,
        _call: &ContractCall,
        block: Option<u64>,
    ) -> Result<RevertProbe, TxError> {
        let (probe, delay) = {
            let mut state = self.state.lock().unwrap();
            state.replays.push(block);
            (state.probe.clone(), state.replay_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(probe)
    }
}
