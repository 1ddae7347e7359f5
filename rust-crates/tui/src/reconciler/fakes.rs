//! Scriptable wallet provider and game program for tests.
//!
//! Every call pops the next scripted response. A response is either ready
//! immediately or gated behind a oneshot the test resolves, which lets tests
//! decide exactly when a suspended call completes.

use crate::reconciler::{
    lock,
    ports::{
        GameProgram,
        WalletProvider,
    },
    types::{
        Cause,
        Identity,
        Move,
        Outcome,
        ProgramInterface,
        Receipt,
        RoundRecord,
    },
};
use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicUsize,
            Ordering,
        },
    },
};
use tokio::sync::oneshot;

pub const FAKE_DIGEST: &str = "feedface";

pub type Gate<T> = oneshot::Sender<Result<T, Cause>>;

pub fn test_interface() -> ProgramInterface {
    ProgramInterface::new(
        "rock-paper-scissors",
        ["Rock", "Paper", "Scissors"],
        ["Win", "Lose", "Draw"],
        FAKE_DIGEST,
    )
}

pub fn round(player: &str, player_move: Move, program_move: Move, outcome: Outcome) -> RoundRecord {
    RoundRecord {
        player: Identity::new(player),
        player_move,
        program_move,
        outcome,
    }
}

pub fn receipt(tx_id: &str, outcome: Outcome) -> Receipt {
    Receipt {
        tx_id: Some(tx_id.to_string()),
        outcome: Some(outcome),
    }
}

enum Scripted<T> {
    Ready(Result<T, Cause>),
    Gated(oneshot::Receiver<Result<T, Cause>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T, Cause> {
        match self {
            Scripted::Ready(result) => result,
            Scripted::Gated(rx) => rx
                .await
                .unwrap_or_else(|_| Err(Cause::new("gate dropped"))),
        }
    }
}

fn gated<T>(queue: &Mutex<VecDeque<Scripted<T>>>) -> Gate<T> {
    let (tx, rx) = oneshot::channel();
    lock(queue).push_back(Scripted::Gated(rx));
    tx
}

#[derive(Default)]
struct ProgramInner {
    digest: Mutex<Option<String>>,
    submits: Mutex<VecDeque<Scripted<Receipt>>>,
    histories: Mutex<VecDeque<Scripted<Vec<RoundRecord>>>>,
    submitted: Mutex<Vec<Move>>,
    history_reads: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeProgram {
    inner: Arc<ProgramInner>,
}

impl FakeProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_digest(&self, digest: &str) {
        *lock(&self.inner.digest) = Some(digest.to_string());
    }

    pub fn push_receipt(&self, receipt: Receipt) {
        lock(&self.inner.submits).push_back(Scripted::Ready(Ok(receipt)));
    }

    pub fn push_rejection(&self, reason: &str) {
        lock(&self.inner.submits).push_back(Scripted::Ready(Err(Cause::new(reason))));
    }

    pub fn gate_submit(&self) -> Gate<Receipt> {
        gated(&self.inner.submits)
    }

    pub fn push_history(&self, rounds: Vec<RoundRecord>) {
        lock(&self.inner.histories).push_back(Scripted::Ready(Ok(rounds)));
    }

    pub fn push_history_failure(&self, reason: &str) {
        lock(&self.inner.histories).push_back(Scripted::Ready(Err(Cause::new(reason))));
    }

    pub fn gate_history(&self) -> Gate<Vec<RoundRecord>> {
        gated(&self.inner.histories)
    }

    pub fn submitted_moves(&self) -> Vec<Move> {
        lock(&self.inner.submitted).clone()
    }

    pub fn history_reads(&self) -> usize {
        self.inner.history_reads.load(Ordering::SeqCst)
    }
}

impl GameProgram for FakeProgram {
    async fn interface_digest(&self) -> Result<String, Cause> {
        let digest = lock(&self.inner.digest).clone();
        Ok(digest.unwrap_or_else(|| FAKE_DIGEST.to_string()))
    }

    async fn submit_move(&self, player_move: Move) -> Result<Receipt, Cause> {
        lock(&self.inner.submitted).push(player_move);
        let next = lock(&self.inner.submits).pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(Receipt {
                tx_id: None,
                outcome: None,
            }),
        }
    }

    async fn read_history(&self) -> Result<Vec<RoundRecord>, Cause> {
        self.inner.history_reads.fetch_add(1, Ordering::SeqCst);
        let next = lock(&self.inner.histories).pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Ok(Vec::new()),
        }
    }
}

struct WalletInner {
    program: FakeProgram,
    identities: Mutex<VecDeque<Scripted<Identity>>>,
    identity_requests: AtomicUsize,
}

/// Wallet provider whose every session handle is a clone of one
/// [`FakeProgram`].
#[derive(Clone)]
pub struct FakeWallet {
    inner: Arc<WalletInner>,
}

impl FakeWallet {
    pub fn new(program: FakeProgram) -> Self {
        Self {
            inner: Arc::new(WalletInner {
                program,
                identities: Mutex::new(VecDeque::new()),
                identity_requests: AtomicUsize::new(0),
            }),
        }
    }

    pub fn push_identity(&self, identity: &str) {
        lock(&self.inner.identities).push_back(Scripted::Ready(Ok(Identity::new(identity))));
    }

    pub fn push_unavailable(&self, reason: &str) {
        lock(&self.inner.identities).push_back(Scripted::Ready(Err(Cause::new(reason))));
    }

    pub fn gate_identity(&self) -> Gate<Identity> {
        gated(&self.inner.identities)
    }

    pub fn identity_requests(&self) -> usize {
        self.inner.identity_requests.load(Ordering::SeqCst)
    }
}

impl WalletProvider for FakeWallet {
    type Handle = FakeProgram;

    async fn request_identity(&self) -> Result<Identity, Cause> {
        self.inner.identity_requests.fetch_add(1, Ordering::SeqCst);
        let next = lock(&self.inner.identities).pop_front();
        match next {
            Some(scripted) => scripted.resolve().await,
            None => Err(Cause::new("no wallet provider reachable")),
        }
    }

    async fn session_handle(&self, _identity: &Identity) -> Result<FakeProgram, Cause> {
        Ok(self.inner.program.clone())
    }
}
