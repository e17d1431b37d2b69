use crate::ui;
use alloy::primitives::{
    Address,
    TxHash,
    U256,
};
use chrono::Local;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::DeploymentStore;
use seery_tui::{
    AlloyChainClient,
    api_client::{
        MarketAsset,
        SeeryApi,
        Suggestion,
    },
    config::{
        self,
        AppConfig,
        WalletConfig,
    },
    staking::{
        ChainClient,
        StakeFlowError,
        StakeOrchestrator,
        TrackerState,
        TxError,
        TxTracker,
        contract::StakingReader,
        orchestrator::{
            StakeIntent,
            StakeOutcome,
        },
        tracker::ConfirmedTx,
        types::{
            Direction,
            PredictionId,
            StakeEntry,
            milli_to_wei,
        },
        view::{
            StakeBoard,
            format_coin,
            unix_now,
        },
    },
    wallets,
};
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};

const MAX_ERRORS: usize = 50;
const REDRAW_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub network: String,
    pub rpc_url: String,
    pub wallet: Address,
    pub contract: Address,
    pub balance_wei: Option<U256>,
    pub market: Vec<MarketAsset>,
    pub board: StakeBoard,
    pub tracker: TrackerState,
    pub status: String,
    pub errors: Vec<String>,
    pub last_refresh: Option<String>,
}

pub struct Clients {
    pub chain: Arc<AlloyChainClient>,
    pub reader: StakingReader<AlloyChainClient>,
    pub orchestrator: StakeOrchestrator<AlloyChainClient>,
    pub api: SeeryApi,
}

pub struct AppController {
    pub clients: Clients,
    pub status: String,
    network_label: String,
    refresh_interval: Duration,
    entries: Vec<StakeEntry>,
    board: StakeBoard,
    market: Vec<MarketAsset>,
    balance_wei: Option<U256>,
    last_refresh: Option<String>,
    errors: Vec<String>,
    last_snapshot: Option<AppSnapshot>,
}

/// Outcome of a transaction or backend task spawned off the UI loop.
enum TaskResult {
    Staked {
        label: String,
        /// Market row to remember a newly recorded prediction on.
        crypto_id: Option<String>,
        result: Result<StakeOutcome, StakeFlowError>,
    },
    Claimed {
        prediction_id: PredictionId,
        result: Result<ConfirmedTx, TxError>,
    },
    Suggested {
        crypto_id: String,
        result: Result<Suggestion>,
    },
}

impl AppController {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let AppConfig {
            network,
            wallet,
            contract,
            api_url,
            tracker,
            refresh_interval,
        } = config;

        let signer = match wallet {
            WalletConfig::EnvPrivateKey => {
                let raw = std::env::var("PRIVATE_KEY")
                    .wrap_err("PRIVATE_KEY is not set")?;
                wallets::signer_from_private_key(&raw)?
            }
            WalletConfig::Keystore { name, dir } => {
                let descriptor = wallets::find_wallet(&dir, &name)?;
                wallets::unlock_wallet(&descriptor)?
            }
        };

        info!("Connecting to {} at URL: {}", network.label(), network.url());
        let chain = Arc::new(
            AlloyChainClient::connect(network.url(), signer)
                .wrap_err_with(|| format!("Failed to connect to {}", network.url()))?,
        );
        let chain_id = match chain.chain_id().await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "could not read chain id; deployment record not checked");
                None
            }
        };

        let api = SeeryApi::new(api_url)?;
        match api.health().await {
            Ok(health) => info!(status = %health.status, "backend reachable"),
            Err(err) => warn!(error = %err, url = api.base_url(), "backend health check failed"),
        }

        let store = DeploymentStore::new(network.env()).map_err(|e| eyre!(e))?;
        let (contract, _source) = config::resolve_contract(
            contract.as_deref(),
            std::env::var("PREDICTION_STAKING_ADDRESS").ok(),
            &store,
            chain_id,
            Some(&api),
            network.url(),
        )
        .await?;

        let tracker = Arc::new(TxTracker::new(chain.clone(), tracker));
        let clients = Clients {
            reader: StakingReader::new(chain.clone(), contract),
            orchestrator: StakeOrchestrator::new(tracker, contract),
            chain,
            api,
        };
        Ok(Self::from_clients(
            clients,
            network.label().to_string(),
            refresh_interval,
        ))
    }

    fn from_clients(
        clients: Clients,
        network_label: String,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            clients,
            status: String::from("Ready"),
            network_label,
            refresh_interval,
            entries: Vec::new(),
            board: StakeBoard::default(),
            market: Vec::new(),
            balance_wei: None,
            last_refresh: None,
            errors: Vec::new(),
            last_snapshot: None,
        }
    }

    fn tracker(&self) -> &Arc<TxTracker<AlloyChainClient>> {
        self.clients.orchestrator.tracker()
    }

    fn wallet(&self) -> Address {
        self.clients.chain.signer_address()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
    }

    fn push_errors(&mut self, items: Vec<String>) {
        push_capped(&mut self.errors, items);
    }

    fn ingest(&mut self, bundle: SnapshotBundle) {
        let SnapshotBundle {
            entries,
            balance_wei,
            market,
            errors,
        } = bundle;
        if let Some(entries) = entries {
            self.entries = entries;
        }
        if balance_wei.is_some() {
            self.balance_wei = balance_wei;
        }
        if let Some(fresh) = market {
            self.market = merge_market(std::mem::take(&mut self.market), fresh);
        }
        self.last_refresh = Some(Local::now().format("%H:%M:%S").to_string());
        self.push_errors(errors);
    }

    /// Re-projects the board against the current time so countdowns and
    /// claimability advance between chain reads.
    fn build_snapshot(&mut self) -> AppSnapshot {
        self.board = StakeBoard::project(self.entries.clone(), unix_now());
        let snapshot = AppSnapshot {
            network: self.network_label.clone(),
            rpc_url: self.clients.chain.rpc_url().to_string(),
            wallet: self.wallet(),
            contract: self.clients.reader.contract(),
            balance_wei: self.balance_wei,
            market: self.market.clone(),
            board: self.board.clone(),
            tracker: self.tracker().state(),
            status: self.status.clone(),
            errors: self.errors.clone(),
            last_refresh: self.last_refresh.clone(),
        };
        self.last_snapshot = Some(snapshot.clone());
        snapshot
    }

    fn start_stake(
        &mut self,
        target: ui::StakeTarget,
        amount_milli: u64,
        direction: Direction,
        results: &mpsc::UnboundedSender<TaskResult>,
    ) {
        let intent = StakeIntent {
            amount_wei: milli_to_wei(amount_milli),
            direction,
        };
        if let Err(err) = intent.validate() {
            self.push_errors(vec![format!("Stake not sent: {err}")]);
            return;
        }
        if self.tracker().is_busy() {
            self.push_errors(vec![TxError::AlreadyInProgress.to_string()]);
            return;
        }

        let orchestrator = self.clients.orchestrator.clone();
        let results = results.clone();
        match target {
            ui::StakeTarget::Market(index) => {
                let Some(asset) = self.market.get(index).cloned() else {
                    self.push_errors(vec![String::from("No asset selected")]);
                    return;
                };
                let label = asset.symbol.to_uppercase();
                let crypto_id = Some(asset.id.clone());
                let existing = asset.prediction_id.map(U256::from);
                let draft = asset.draft();
                if existing.is_none() && draft.is_none() {
                    self.push_errors(vec![format!(
                        "{label} has no AI suggestion yet; press a to request one"
                    )]);
                    return;
                }
                self.set_status(format!(
                    "Staking {} BNB {} on {label}...",
                    format_coin(intent.amount_wei),
                    direction.arrow()
                ));
                tokio::spawn(async move {
                    let result = match (existing, draft) {
                        (Some(id), _) => stake_existing(&orchestrator, id, intent).await,
                        (None, Some(draft)) => {
                            orchestrator.stake_on_asset(None, &draft, intent).await
                        }
                        (None, None) => Err(TxError::InvalidInput(format!(
                            "{label} has no prediction to stake on"
                        ))
                        .into()),
                    };
                    let _ = results.send(TaskResult::Staked {
                        label,
                        crypto_id,
                        result,
                    });
                });
            }
            ui::StakeTarget::Prediction(index) => {
                let Some(row) = self.board.get(index) else {
                    self.push_errors(vec![String::from("No prediction selected")]);
                    return;
                };
                let id = row.id();
                let label = format!("prediction #{id}");
                self.set_status(format!(
                    "Staking {} BNB {} on {label}...",
                    format_coin(intent.amount_wei),
                    direction.arrow()
                ));
                tokio::spawn(async move {
                    let result = stake_existing(&orchestrator, id, intent).await;
                    let _ = results.send(TaskResult::Staked {
                        label,
                        crypto_id: None,
                        result,
                    });
                });
            }
        }
    }

    fn start_claim(&mut self, index: usize, results: &mpsc::UnboundedSender<TaskResult>) {
        let Some(row) = self.board.get(index) else {
            return;
        };
        let prediction_id = row.id();
        let view = row.view;
        if !view.is_claimable {
            self.push_errors(vec![format!(
                "Prediction #{prediction_id} has nothing to claim yet ({})",
                view.time_remaining
            )]);
            return;
        }
        if self.tracker().is_busy() {
            self.push_errors(vec![TxError::AlreadyInProgress.to_string()]);
            return;
        }
        self.set_status(format!("Claiming rewards for prediction #{prediction_id}..."));
        let orchestrator = self.clients.orchestrator.clone();
        let results = results.clone();
        tokio::spawn(async move {
            let result = orchestrator.claim_rewards(prediction_id).await;
            let _ = results.send(TaskResult::Claimed {
                prediction_id,
                result,
            });
        });
    }

    fn start_suggest(&mut self, index: usize, results: &mpsc::UnboundedSender<TaskResult>) {
        let Some(asset) = self.market.get(index) else {
            return;
        };
        let crypto_id = asset.id.clone();
        let symbol = asset.symbol.clone();
        self.set_status(format!(
            "Requesting AI suggestion for {}...",
            symbol.to_uppercase()
        ));
        let api = self.clients.api.clone();
        let results = results.clone();
        tokio::spawn(async move {
            let result = api.suggest(&crypto_id, &symbol).await;
            let _ = results.send(TaskResult::Suggested { crypto_id, result });
        });
    }

    fn handle_task_result(&mut self, result: TaskResult) {
        match result {
            TaskResult::Staked {
                label,
                crypto_id,
                result: Ok(outcome),
            } => {
                if let (Some(crypto_id), Some(_)) = (&crypto_id, &outcome.recorded) {
                    remember_prediction(&mut self.market, crypto_id, outcome.prediction_id);
                }
                let recorded = outcome
                    .recorded
                    .as_ref()
                    .map(|tx| format!(" (recorded prediction in {})", hash_preview(&tx.hash())))
                    .unwrap_or_default();
                let placed = outcome
                    .placed
                    .iter()
                    .fold(U256::ZERO, |total, stake| total.saturating_add(stake.amount_wei));
                self.set_status(format!(
                    "Staked {} BNB on {label} prediction #{}{recorded}; tx {}",
                    format_coin(placed),
                    outcome.prediction_id,
                    hash_preview(&outcome.stake.hash())
                ));
            }
            TaskResult::Staked {
                label,
                crypto_id,
                result: Err(err),
            } => {
                error!(error = %err, %label, recorded = ?err.recorded, "stake failed");
                let mut message = describe_failure(&format!("Stake on {label}"), &err.cause);
                if let (Some(crypto_id), Some(id)) = (&crypto_id, err.recorded) {
                    remember_prediction(&mut self.market, crypto_id, id);
                    message.push_str(&format!(
                        " Prediction #{id} was recorded; staking again uses it."
                    ));
                }
                self.push_errors(vec![message]);
            }
            TaskResult::Claimed {
                prediction_id,
                result: Ok(confirmed),
            } => {
                self.set_status(format!(
                    "Claimed rewards for prediction #{prediction_id}; tx {}",
                    hash_preview(&confirmed.hash())
                ));
            }
            TaskResult::Claimed {
                prediction_id,
                result: Err(err),
            } => {
                error!(error = %err, %prediction_id, "claim failed");
                self.push_errors(vec![describe_failure(
                    &format!("Claim for prediction #{prediction_id}"),
                    &err,
                )]);
            }
            TaskResult::Suggested {
                crypto_id,
                result: Ok(suggestion),
            } => {
                let Some(asset) = self.market.iter_mut().find(|a| a.id == crypto_id) else {
                    warn!(%crypto_id, "suggestion for asset no longer listed");
                    return;
                };
                asset.apply(&suggestion);
                let summary = match (asset.suggestion, asset.suggestion_percent) {
                    (Some(direction), Some(percent)) => {
                        format!("{} {:.2}%", direction.arrow(), percent.abs())
                    }
                    _ => String::from("no call"),
                };
                let status = format!(
                    "AI suggestion for {}: {summary}",
                    asset.symbol.to_uppercase()
                );
                self.set_status(status);
            }
            TaskResult::Suggested {
                crypto_id,
                result: Err(err),
            } => {
                self.push_errors(vec![format!(
                    "AI suggestion for {crypto_id} failed: {err:#}"
                )]);
            }
        }
    }
}

async fn stake_existing(
    orchestrator: &StakeOrchestrator<AlloyChainClient>,
    prediction_id: PredictionId,
    intent: StakeIntent,
) -> Result<StakeOutcome, StakeFlowError> {
    let (stake, placed) = orchestrator.stake(prediction_id, intent).await?;
    Ok(StakeOutcome {
        prediction_id,
        recorded: None,
        stake,
        placed,
    })
}

fn push_capped(errors: &mut Vec<String>, mut items: Vec<String>) {
    if items.is_empty() {
        return;
    }
    for item in &items {
        error!("{}", item);
    }
    errors.append(&mut items);
    if errors.len() > MAX_ERRORS {
        let drain = errors.len() - MAX_ERRORS;
        errors.drain(0..drain);
    }
}

/// Keeps suggestions fetched on demand when the market list refreshes
/// without them.
fn merge_market(previous: Vec<MarketAsset>, fresh: Vec<MarketAsset>) -> Vec<MarketAsset> {
    fresh
        .into_iter()
        .map(|mut asset| {
            if let Some(old) = previous.iter().find(|old| old.id == asset.id) {
                if asset.suggestion.is_none() {
                    asset.suggestion = old.suggestion;
                    asset.suggestion_percent = old.suggestion_percent;
                    asset.reasoning = asset.reasoning.or_else(|| old.reasoning.clone());
                }
                if asset.prediction_id.is_none() {
                    asset.prediction_id = old.prediction_id;
                }
            }
            asset
        })
        .collect()
}

/// Points the market row at a prediction this client recorded, so the next
/// stake on it does not record another one.
fn remember_prediction(market: &mut [MarketAsset], crypto_id: &str, id: PredictionId) {
    let Some(asset) = market.iter_mut().find(|asset| asset.id == crypto_id) else {
        warn!(%crypto_id, %id, "recorded prediction for asset no longer listed");
        return;
    };
    match u64::try_from(id) {
        Ok(id) => asset.prediction_id = Some(id),
        Err(_) => warn!(%crypto_id, %id, "prediction id does not fit the market row"),
    }
}

fn describe_failure(action: &str, err: &TxError) -> String {
    match err {
        TxError::UserRejected => format!("{action} cancelled: {err}"),
        TxError::TimedOut { .. } | TxError::Cancelled { .. } => {
            format!("{action} outcome unknown: {err}")
        }
        TxError::EventNotFound { hash, .. } => format!(
            "{action} stopped: {err} Prediction was recorded in {}; refresh before retrying.",
            hash_preview(hash)
        ),
        _ => format!("{action} failed: {err}"),
    }
}

fn hash_preview(hash: &TxHash) -> String {
    let hash = hash.to_string();
    let preview_len = hash.len().min(16);
    let mut preview = hash[..preview_len].to_string();
    if hash.len() > preview_len {
        preview.push_str("...");
    }
    preview
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let controller = AppController::new(config).await?;
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

fn sync_status(controller: &mut AppController, status: impl Into<String>) {
    controller.set_status(status);
    if let Some(cache) = controller.last_snapshot.as_mut() {
        cache.status = controller.status.clone();
        cache.errors = controller.errors.clone();
    }
}

fn sync_error(controller: &mut AppController, error_msg: impl Into<String>) {
    controller.push_errors(vec![error_msg.into()]);
    if let Some(cache) = controller.last_snapshot.as_mut() {
        cache.errors = controller.errors.clone();
        cache.status = controller.status.clone();
    }
}

#[derive(Debug, Default)]
struct SnapshotBundle {
    entries: Option<Vec<StakeEntry>>,
    balance_wei: Option<U256>,
    market: Option<Vec<MarketAsset>>,
    errors: Vec<String>,
}

enum SnapshotWorkerCommand {
    FetchNow,
    Shutdown,
}

enum SnapshotWorkerEvent {
    Snapshot(SnapshotBundle),
}

async fn snapshot_worker(
    poll_interval: Duration,
    reader: StakingReader<AlloyChainClient>,
    chain: Arc<AlloyChainClient>,
    api: SeeryApi,
    mut cmd_rx: mpsc::UnboundedReceiver<SnapshotWorkerCommand>,
    snapshot_tx: mpsc::UnboundedSender<SnapshotWorkerEvent>,
) -> Result<()> {
    async fn fetch_snapshot(
        reader: &StakingReader<AlloyChainClient>,
        chain: &AlloyChainClient,
        api: &SeeryApi,
        snapshot_tx: &mpsc::UnboundedSender<SnapshotWorkerEvent>,
    ) -> Result<()> {
        let user = chain.signer_address();
        let (board, balance, market) =
            tokio::join!(reader.board(user), chain.balance(), api.market());
        let mut bundle = SnapshotBundle::default();
        match board {
            Ok(entries) => bundle.entries = Some(entries),
            Err(err) => bundle.errors.push(format!("Loading predictions failed: {err}")),
        }
        match balance {
            Ok(wei) => bundle.balance_wei = Some(wei),
            Err(err) => warn!(error = %err, "balance lookup failed"),
        }
        match market {
            Ok(assets) => bundle.market = Some(assets),
            Err(err) => bundle.errors.push(format!("Loading market failed: {err:#}")),
        }
        snapshot_tx
            .send(SnapshotWorkerEvent::Snapshot(bundle))
            .map_err(|_| eyre!("snapshot receiver dropped"))?;
        Ok(())
    }

    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                fetch_snapshot(&reader, &chain, &api, &snapshot_tx).await?;
            }
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    SnapshotWorkerCommand::FetchNow => {
                        fetch_snapshot(&reader, &chain, &api, &snapshot_tx).await?;
                    }
                    SnapshotWorkerCommand::Shutdown => break,
                }
            }
        }
    }
    Ok(())
}

async fn run_loop(
    mut controller: AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let (snapshot_cmd_tx, snapshot_cmd_rx) = mpsc::unbounded_channel();
    let (snapshot_event_tx, mut snapshot_event_rx) = mpsc::unbounded_channel();
    let snapshot_handle = tokio::spawn(snapshot_worker(
        controller.refresh_interval,
        controller.clients.reader.clone(),
        controller.clients.chain.clone(),
        controller.clients.api.clone(),
        snapshot_cmd_rx,
        snapshot_event_tx,
    ));
    let (task_tx, mut task_rx) = mpsc::unbounded_channel();
    let mut tracker_rx = controller.tracker().subscribe();
    let mut redraw = time::interval(REDRAW_INTERVAL);
    let mut snapshot_worker_closed = false;

    sync_status(&mut controller, "Loading predictions...");
    let snapshot = controller.build_snapshot();
    ui::draw(ui_state, &snapshot).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = snapshot_event_rx.recv() => {
                match maybe_event {
                    Some(SnapshotWorkerEvent::Snapshot(bundle)) => {
                        let first = controller.last_refresh.is_none();
                        controller.ingest(bundle);
                        if first && controller.errors.is_empty() {
                            sync_status(&mut controller, "Ready");
                        }
                        let snapshot = controller.build_snapshot();
                        ui::draw(ui_state, &snapshot)
                            .wrap_err("draw after snapshot refresh failed")?;
                    }
                    None => {
                        warn!("snapshot worker channel closed");
                        snapshot_worker_closed = true;
                        break;
                    }
                }
            }
            Some(result) = task_rx.recv() => {
                controller.handle_task_result(result);
                let _ = snapshot_cmd_tx.send(SnapshotWorkerCommand::FetchNow);
                let snapshot = controller.build_snapshot();
                ui::draw(ui_state, &snapshot)
                    .wrap_err("draw after transaction result failed")?;
            }
            changed = tracker_rx.changed() => {
                if changed.is_err() {
                    warn!("transaction tracker dropped");
                    break;
                }
                let snapshot = controller.build_snapshot();
                ui::draw(ui_state, &snapshot)
                    .wrap_err("draw after tracker update failed")?;
            }
            _ = redraw.tick() => {
                let snapshot = controller.build_snapshot();
                ui::draw(ui_state, &snapshot).wrap_err("periodic redraw failed")?;
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Refresh => {
                        sync_status(&mut controller, "Refreshing...");
                        let _ = snapshot_cmd_tx.send(SnapshotWorkerCommand::FetchNow);
                    }
                    ui::UserEvent::ConfirmStake {
                        target,
                        amount_milli,
                        direction,
                    } => {
                        controller.start_stake(target, amount_milli, direction, &task_tx);
                    }
                    ui::UserEvent::Claim(index) => {
                        controller.start_claim(index, &task_tx);
                    }
                    ui::UserEvent::Suggest(index) => {
                        controller.start_suggest(index, &task_tx);
                    }
                }
                let snapshot = controller.build_snapshot();
                ui::draw(ui_state, &snapshot).wrap_err("draw after input failed")?;
            }
        }
    }

    if let Some(hash) = controller.tracker().state().pending_hash() {
        sync_error(
            &mut controller,
            format!("Left while {hash} was pending; check your wallet for its outcome"),
        );
    }
    controller.tracker().shutdown();
    let _ = snapshot_cmd_tx.send(SnapshotWorkerCommand::Shutdown);
    match snapshot_handle.await {
        Ok(Ok(())) => {
            if snapshot_worker_closed {
                return Err(eyre!(
                    "Snapshot worker exited unexpectedly; check the RPC and backend connection"
                ));
            }
        }
        Ok(Err(err)) => {
            return Err(err).wrap_err("snapshot worker failed");
        }
        Err(err) => {
            return Err(eyre!(err)).wrap_err("snapshot worker panicked");
        }
    }
    Ok(())
}
