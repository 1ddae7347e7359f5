//! Session & action reconciler.
//!
//! Ties the three pieces together: a [`SessionManager`] that holds the
//! connected identity, an [`ActionSubmitter`] that sends one move at a time,
//! and a [`HistoryReconciler`] that keeps a wholesale copy of past rounds.
//! A successful connect or a confirmed move refreshes the history exactly
//! once, as part of the same call.

use std::sync::{
    Mutex,
    MutexGuard,
    PoisonError,
};
use tracing::debug;

pub mod error;
pub mod history;
pub mod ports;
pub mod session;
pub mod submitter;
pub mod types;

#[cfg(test)]
pub(crate) mod fakes;
#[cfg(test)]
mod proptests;

pub use error::{
    ConnectError,
    RefreshError,
    SubmitError,
};
pub use history::{
    HistoryReconciler,
    RefreshOutcome,
};
pub use ports::{
    GameProgram,
    WalletProvider,
};
pub use session::{
    SessionManager,
    SessionPhase,
};
pub use submitter::ActionSubmitter;
pub use types::{
    ActionOutcome,
    Cause,
    Identity,
    Move,
    Outcome,
    ProgramInterface,
    Receipt,
    RoundRecord,
};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connected {
    pub identity: Identity,
    /// Result of the history refresh run right after connecting.
    pub history: Result<RefreshOutcome, RefreshError>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submitted {
    pub receipt: Receipt,
    /// Result of the history refresh run after confirmation. A failure here
    /// does not undo the move.
    pub history: Result<RefreshOutcome, RefreshError>,
}

pub struct Reconciler<W: WalletProvider> {
    session: SessionManager<W>,
    submitter: ActionSubmitter,
    history: HistoryReconciler,
}

impl<W: WalletProvider> Reconciler<W> {
    pub fn new(wallet: W, interface: ProgramInterface) -> Self {
        Self {
            session: SessionManager::new(wallet, interface),
            submitter: ActionSubmitter::new(),
            history: HistoryReconciler::new(),
        }
    }

    pub fn interface(&self) -> &ProgramInterface {
        self.session.interface()
    }

    pub fn session_phase(&self) -> SessionPhase {
        self.session.phase()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.session.identity()
    }

    pub fn invalidation_reason(&self) -> Option<Cause> {
        self.session.invalidation_reason()
    }

    pub fn action_outcome(&self) -> ActionOutcome {
        self.submitter.outcome()
    }

    pub fn rounds(&self) -> Vec<RoundRecord> {
        self.history.rounds()
    }

    /// Connects (or reconnects) the wallet, then loads the history for the
    /// new session. The previous session's history is dropped only once the
    /// new session is installed; a failed attempt keeps it on screen but
    /// discards any fetch still in flight for it.
    pub async fn connect(&self) -> Result<Connected, ConnectError> {
        let (identity, handle) = match self.session.connect().await {
            Ok(installed) => installed,
            Err(ConnectError::Superseded) => return Err(ConnectError::Superseded),
            Err(err) => {
                self.history.discard_in_flight();
                return Err(err);
            }
        };
        self.history.reset();
        let history = self.history.refresh(handle.as_ref()).await;
        Ok(Connected { identity, history })
    }

    /// Submits `player_move` through the current session and, once the
    /// program confirms it, refreshes the history with the same handle as
    /// long as that session is still the current one.
    pub async fn submit(&self, player_move: Move) -> Result<Submitted, SubmitError> {
        let Some(handle) = self.session.handle() else {
            return Err(SubmitError::NotConnected);
        };
        let receipt = self.submitter.submit(handle.as_ref(), player_move).await?;
        if !self.session.is_current(&handle) {
            debug!(?player_move, "session changed while the move was pending; skipping refresh");
            return Ok(Submitted {
                receipt,
                history: Ok(RefreshOutcome::Superseded),
            });
        }
        let history = self.history.refresh(handle.as_ref()).await;
        Ok(Submitted { receipt, history })
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let Some(handle) = self.session.handle() else {
            return Err(RefreshError::NotConnected);
        };
        self.history.refresh(handle.as_ref()).await
    }
}
