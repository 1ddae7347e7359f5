use crate::ui;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use deployments::{
    DeploymentEnv,
    DeploymentRecord,
    DeploymentStore,
};
use rps_client::{
    fuel::{
        self,
        FuelWalletProvider,
        ProgramTarget,
    },
    reconciler::{
        ActionOutcome,
        Cause,
        ConnectError,
        Connected,
        Identity,
        Move,
        ProgramInterface,
        Reconciler,
        RefreshError,
        RefreshOutcome,
        RoundRecord,
        SessionPhase,
        SubmitError,
        Submitted,
        WalletProvider,
    },
    wallets::Password,
};
use std::{
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::mpsc;
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";
pub const DEFAULT_LOG_DIR: &str = "logs";
const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Testnet { url: String },
    Devnet { url: String },
    LocalNode { url: String },
}

impl NetworkTarget {
    fn env_and_url(&self) -> (DeploymentEnv, &str) {
        match self {
            NetworkTarget::Devnet { url } => (DeploymentEnv::Dev, url),
            NetworkTarget::Testnet { url } => (DeploymentEnv::Test, url),
            NetworkTarget::LocalNode { url } => (DeploymentEnv::Local, url),
        }
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    ForcKeystore { owner: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallets: WalletConfig,
    pub contract_id: Option<String>,
    pub log_dir: PathBuf,
}

/// Everything the UI needs for one frame.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub interface: ProgramInterface,
    pub phase: SessionPhase,
    pub identity: Option<Identity>,
    pub invalidation_reason: Option<Cause>,
    pub selected_move: Move,
    pub action: ActionOutcome,
    pub moves_enabled: bool,
    /// Program order, oldest first.
    pub rounds: Vec<RoundRecord>,
    pub status: String,
    pub errors: Vec<String>,
}

/// Completion of an operation that ran on a spawned task.
#[derive(Debug)]
pub enum ActionEvent {
    Connected(Result<Connected, ConnectError>),
    Submitted(Move, Result<Submitted, SubmitError>),
    Refreshed(Result<RefreshOutcome, RefreshError>),
}

pub struct AppController<W: WalletProvider> {
    reconciler: Arc<Reconciler<W>>,
    selected_move: Move,
    submits_in_flight: usize,
    refresh_requested: bool,
    status: String,
    errors: Vec<String>,
}

impl<W: WalletProvider + 'static> AppController<W> {
    pub fn new(wallet: W, interface: ProgramInterface) -> Self {
        Self {
            reconciler: Arc::new(Reconciler::new(wallet, interface)),
            selected_move: Move::First,
            submits_in_flight: 0,
            refresh_requested: false,
            status: String::from("Ready"),
            errors: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let action = self.reconciler.action_outcome();
        AppSnapshot {
            interface: self.reconciler.interface().clone(),
            phase: self.reconciler.session_phase(),
            identity: self.reconciler.identity(),
            invalidation_reason: self.reconciler.invalidation_reason(),
            selected_move: self.selected_move,
            moves_enabled: self.submits_in_flight == 0 && !action.is_pending(),
            action,
            rounds: self.reconciler.rounds(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    pub fn select_next_move(&mut self) {
        self.selected_move = self.selected_move.next();
    }

    pub fn select_prev_move(&mut self) {
        self.selected_move = self.selected_move.prev();
    }

    pub fn select_move(&mut self, player_move: Move) {
        self.selected_move = player_move;
    }

    pub fn spawn_connect(&mut self, events: &mpsc::UnboundedSender<ActionEvent>) {
        self.set_status("Connecting wallet...");
        let reconciler = Arc::clone(&self.reconciler);
        let events = events.clone();
        tokio::spawn(async move {
            let result = reconciler.connect().await;
            let _ = events.send(ActionEvent::Connected(result));
        });
    }

    /// Ignored while a move is still waiting; the move bar is disabled then.
    pub fn spawn_submit(&mut self, events: &mpsc::UnboundedSender<ActionEvent>) {
        if self.submits_in_flight > 0 || self.reconciler.action_outcome().is_pending() {
            debug!("move bar disabled; ignoring play request");
            return;
        }
        let player_move = self.selected_move;
        let label = self.reconciler.interface().move_label(player_move);
        self.set_status(format!("Playing {label}..."));
        self.submits_in_flight += 1;
        let reconciler = Arc::clone(&self.reconciler);
        let events = events.clone();
        tokio::spawn(async move {
            let result = reconciler.submit(player_move).await;
            let _ = events.send(ActionEvent::Submitted(player_move, result));
        });
    }

    pub fn spawn_refresh(&mut self, events: &mpsc::UnboundedSender<ActionEvent>) {
        self.set_status("Refreshing history...");
        self.refresh_requested = true;
        let reconciler = Arc::clone(&self.reconciler);
        let events = events.clone();
        tokio::spawn(async move {
            let result = reconciler.refresh().await;
            let _ = events.send(ActionEvent::Refreshed(result));
        });
    }

    pub fn apply(&mut self, event: ActionEvent) {
        match event {
            ActionEvent::Connected(Ok(connected)) => {
                self.set_status(format!("Connected as {}", connected.identity.short()));
                self.note_history(connected.history, false);
            }
            ActionEvent::Connected(Err(ConnectError::Superseded)) => {
                debug!("dropping result of a replaced connection attempt");
            }
            ActionEvent::Connected(Err(e)) => {
                self.push_errors(vec![format!("Connection failed: {e}")]);
            }
            ActionEvent::Submitted(player_move, result) => {
                self.submits_in_flight = self.submits_in_flight.saturating_sub(1);
                self.note_submission(player_move, result);
            }
            ActionEvent::Refreshed(result) => {
                let requested = std::mem::take(&mut self.refresh_requested);
                self.note_history(result, requested);
            }
        }
    }

    fn note_submission(&mut self, player_move: Move, result: Result<Submitted, SubmitError>) {
        let interface = self.reconciler.interface();
        let label = interface.move_label(player_move);
        match result {
            Ok(submitted) => {
                let message = match submitted.receipt.outcome {
                    Some(outcome) => {
                        format!("Played {label}: {}", interface.outcome_label(outcome))
                    }
                    None => format!("Played {label}"),
                };
                self.set_status(message);
                self.note_history(submitted.history, false);
            }
            Err(SubmitError::ActionInProgress) => {
                self.status = String::from("Still waiting for the previous move to confirm");
            }
            Err(SubmitError::ActionFailed(cause)) => {
                self.push_errors(vec![format!("Transaction error: {cause}")]);
            }
            Err(e @ SubmitError::NotConnected) => {
                self.push_errors(vec![format!("Cannot play {label}: {e}")]);
            }
        }
    }

    /// `requested` marks results of a refresh the user asked for, which are
    /// the only ones reported in the status line.
    fn note_history(&mut self, result: Result<RefreshOutcome, RefreshError>, requested: bool) {
        match result {
            Ok(RefreshOutcome::Applied { rounds }) => {
                info!(rounds, "history refreshed");
                if requested {
                    self.status = format!("History loaded ({rounds} rounds)");
                }
            }
            Ok(RefreshOutcome::Superseded) => {}
            Err(e) => self.push_errors(vec![format!("Could not load history: {e}")]),
        }
    }

    /// A newer status also cancels the report of a requested refresh.
    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.errors.clear();
        self.refresh_requested = false;
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }
}

/// Resolves where the program lives on the selected network, recording a
/// new deployment first when `--contract-id` was given.
pub fn load_program_target(
    store: &DeploymentStore,
    env: DeploymentEnv,
    url: &str,
    contract_id: Option<&str>,
) -> Result<ProgramTarget> {
    let current_digest = generated_abi::abi_digest();
    let record = match contract_id {
        Some(raw) => {
            fuel::parse_contract_id(raw)?;
            info!(%env, contract_id = raw, "recording deployment");
            store
                .record(raw, &current_digest, url)
                .map_err(|e| eyre!(e))?
        }
        None => store
            .load()
            .map_err(|e| eyre!(e))?
            .ok_or_else(|| eyre!(format_missing_deployment(env, url, store)))?,
    };

    if !record.is_compatible_with_digest(&current_digest) {
        warn!(
            %env,
            recorded = %hash_preview(&record.abi_digest),
            current = %hash_preview(&current_digest),
            "recorded deployment was built against a different ABI"
        );
    }

    let contract_id = fuel::parse_contract_id(&record.contract_id)
        .wrap_err("Deployment record contains an invalid contract id")?;
    Ok(ProgramTarget {
        contract_id,
        abi_digest: record.abi_digest,
    })
}

fn format_missing_deployment(env: DeploymentEnv, url: &str, store: &DeploymentStore) -> String {
    format!(
        "No deployment recorded for {env} at {url}.\n\
         Deployment records file: {}\n\n\
         Run again with --contract-id <id> to record where the program lives.",
        store.path().display()
    )
}

pub fn describe_record(record: &DeploymentRecord) -> String {
    format!(
        "{} @ {} (abi {}) recorded {}",
        record.contract_id,
        record.network_url,
        hash_preview(&record.abi_digest),
        record.recorded_at
    )
}

fn hash_preview(hash: &str) -> String {
    const PREVIEW_CHARS: usize = 16;
    let mut preview: String = hash.chars().take(PREVIEW_CHARS).collect();
    if hash.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push_str("...");
    }
    preview
}

pub async fn run_app(config: AppConfig, password: Password) -> Result<()> {
    let AppConfig {
        network,
        wallets,
        contract_id,
        log_dir: _,
    } = config;
    let (env, url) = network.env_and_url();
    info!("Using {env} at URL: {url}");

    let store = DeploymentStore::new(env).map_err(|e| eyre!(e))?;
    let target = load_program_target(&store, env, url, contract_id.as_deref())?;
    if let Some(record) = store.load().map_err(|e| eyre!(e))? {
        info!("Deployment: {}", describe_record(&record));
    }

    let WalletConfig::ForcKeystore { owner, dir } = wallets;
    let provider = FuelWalletProvider::new(url, dir, owner, password, target);
    let controller = AppController::new(provider, fuel::rps_interface());

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();
    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn run_loop<W: WalletProvider + 'static>(
    mut controller: AppController<W>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let (action_tx, mut action_rx) = mpsc::unbounded_channel();
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            Some(event) = action_rx.recv() => {
                controller.apply(event);
            }
            _ = tokio::signal::ctrl_c() => break,
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Connect => controller.spawn_connect(&action_tx),
                    ui::UserEvent::NextMove => controller.select_next_move(),
                    ui::UserEvent::PrevMove => controller.select_prev_move(),
                    ui::UserEvent::Play => controller.spawn_submit(&action_tx),
                    ui::UserEvent::PlayMove(player_move) => {
                        controller.select_move(player_move);
                        controller.spawn_submit(&action_tx);
                    }
                    ui::UserEvent::Refresh => controller.spawn_refresh(&action_tx),
                    ui::UserEvent::Redraw => {}
                }
            }
        }
        ui::draw(ui_state, &controller.snapshot()).wrap_err("draw failed")?;
    }
    Ok(())
}
