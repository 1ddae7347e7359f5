//! Collaborators the reconciler drives. Implementations live in
//! [`crate::fuel`]; tests use the fakes in `reconciler::fakes`.

use crate::reconciler::types::{
    Cause,
    Identity,
    Move,
    Receipt,
    RoundRecord,
};

/// Custody of the user's keys. Resolves who is playing and hands out the
/// authenticated handle used to reach the program.
pub trait WalletProvider: Send + Sync {
    type Handle: GameProgram + 'static;

    fn request_identity(&self) -> impl Future<Output = Result<Identity, Cause>> + Send;

    fn session_handle(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Self::Handle, Cause>> + Send;
}

/// The ledger-resident game program, reached through a session handle.
pub trait GameProgram: Send + Sync {
    /// Digest of the interface the deployed program was built against, as
    /// far as the handle knows it. Fuel handles report the recorded digest.
    fn interface_digest(&self) -> impl Future<Output = Result<String, Cause>> + Send;

    /// Submits one move and resolves once the ledger has committed or
    /// definitively rejected it.
    fn submit_move(
        &self,
        player_move: Move,
    ) -> impl Future<Output = Result<Receipt, Cause>> + Send;

    /// Every round the program has recorded, in program order.
    fn read_history(&self) -> impl Future<Output = Result<Vec<RoundRecord>, Cause>> + Send;
}
