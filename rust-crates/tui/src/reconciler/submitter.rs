use crate::reconciler::{
    error::SubmitError,
    lock,
    ports::GameProgram,
    types::{
        ActionOutcome,
        Cause,
        Move,
        Receipt,
    },
};
use std::sync::Mutex;
use tracing::{
    error,
    info,
};

/// Sends moves to the program, one at a time.
#[derive(Default)]
pub struct ActionSubmitter {
    outcome: Mutex<ActionOutcome>,
}

/// Marks the submitter busy for as long as it lives. Dropping it without
/// [`PendingAction::finish`] means the caller gave up waiting, which is
/// recorded as a failure since the move may or may not have landed.
struct PendingAction<'a> {
    outcome: &'a Mutex<ActionOutcome>,
    finished: bool,
}

impl PendingAction<'_> {
    fn finish(mut self, next: ActionOutcome) {
        *lock(self.outcome) = next;
        self.finished = true;
    }
}

impl Drop for PendingAction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *lock(self.outcome) = ActionOutcome::Failed(Cause::new(
                "submission abandoned before confirmation",
            ));
        }
    }
}

impl ActionSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcome(&self) -> ActionOutcome {
        lock(&self.outcome).clone()
    }

    fn begin(&self, player_move: Move) -> Result<PendingAction<'_>, SubmitError> {
        let mut outcome = lock(&self.outcome);
        if outcome.is_pending() {
            return Err(SubmitError::ActionInProgress);
        }
        *outcome = ActionOutcome::PendingConfirmation(player_move);
        Ok(PendingAction {
            outcome: &self.outcome,
            finished: false,
        })
    }

    /// Sends `player_move` and waits for the program to commit it. Never
    /// retries: a failure is reported and the user decides whether to go
    /// again.
    pub async fn submit<P: GameProgram>(
        &self,
        program: &P,
        player_move: Move,
    ) -> Result<Receipt, SubmitError> {
        let pending = self.begin(player_move)?;
        info!(?player_move, "submitting move");

        match program.submit_move(player_move).await {
            Ok(receipt) => {
                info!(?player_move, tx_id = ?receipt.tx_id, "move confirmed");
                pending.finish(ActionOutcome::Idle);
                Ok(receipt)
            }
            Err(cause) => {
                error!(?player_move, %cause, "move submission failed");
                pending.finish(ActionOutcome::Failed(cause.clone()));
                Err(SubmitError::ActionFailed(cause))
            }
        }
    }
}
