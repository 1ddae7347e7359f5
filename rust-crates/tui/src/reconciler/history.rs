use crate::reconciler::{
    error::RefreshError,
    lock,
    ports::GameProgram,
    types::RoundRecord,
};
use std::sync::{
    Mutex,
    atomic::{
        AtomicU64,
        Ordering,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { rounds: usize },
    /// A refresh started later already replaced the history; this result was
    /// dropped.
    Superseded,
}

#[derive(Default)]
struct Snapshot {
    rounds: Vec<RoundRecord>,
    /// Ticket of the fetch (or reset) that produced `rounds`.
    ticket: u64,
}

/// Local copy of the program's round history. The copy is only ever replaced
/// as a whole, and only by a fetch started after the one that produced the
/// current copy.
#[derive(Default)]
pub struct HistoryReconciler {
    snapshot: Mutex<Snapshot>,
    tickets: AtomicU64,
}

impl HistoryReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rounds(&self) -> Vec<RoundRecord> {
        lock(&self.snapshot).rounds.clone()
    }

    fn issue_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Empties the history and discards every fetch started before now.
    pub fn reset(&self) {
        let ticket = self.issue_ticket();
        let mut snapshot = lock(&self.snapshot);
        snapshot.rounds.clear();
        snapshot.ticket = ticket;
        debug!(ticket, "history reset");
    }

    /// Keeps the current rounds but discards every fetch started before now.
    pub fn discard_in_flight(&self) {
        let ticket = self.issue_ticket();
        lock(&self.snapshot).ticket = ticket;
        debug!(ticket, "in-flight history fetches discarded");
    }

    pub async fn refresh<P: GameProgram>(
        &self,
        program: &P,
    ) -> Result<RefreshOutcome, RefreshError> {
        let ticket = self.issue_ticket();
        debug!(ticket, "fetching round history");

        let rounds = match program.read_history().await {
            Ok(rounds) => rounds,
            Err(cause) => {
                warn!(ticket, %cause, "history fetch failed; keeping previous rounds");
                return Err(RefreshError::HistoryUnavailable(cause));
            }
        };

        let mut snapshot = lock(&self.snapshot);
        if ticket < snapshot.ticket {
            debug!(
                ticket,
                current = snapshot.ticket,
                "history fetch superseded by a newer one"
            );
            return Ok(RefreshOutcome::Superseded);
        }
        let count = rounds.len();
        snapshot.rounds = rounds;
        snapshot.ticket = ticket;
        info!(ticket, rounds = count, "history replaced");
        Ok(RefreshOutcome::Applied { rounds: count })
    }
}
