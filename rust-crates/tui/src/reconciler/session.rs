use crate::reconciler::{
    error::ConnectError,
    lock,
    ports::{
        GameProgram,
        WalletProvider,
    },
    types::{
        Cause,
        Identity,
        ProgramInterface,
    },
};
use std::sync::{
    Arc,
    Mutex,
    atomic::{
        AtomicU64,
        Ordering,
    },
};
use tracing::{
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Created,
    Active,
    Invalidated,
}

enum SessionState<H> {
    Created,
    Active { identity: Identity, handle: Arc<H> },
    Invalidated { reason: Cause },
}

/// Owns the connected identity and its session handle. A successful
/// `connect` replaces both wholesale; a failed one invalidates whatever was
/// there before.
pub struct SessionManager<W: WalletProvider> {
    wallet: W,
    interface: ProgramInterface,
    state: Mutex<SessionState<W::Handle>>,
    attempts: AtomicU64,
}

impl<W: WalletProvider> SessionManager<W> {
    pub fn new(wallet: W, interface: ProgramInterface) -> Self {
        Self {
            wallet,
            interface,
            state: Mutex::new(SessionState::Created),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn interface(&self) -> &ProgramInterface {
        &self.interface
    }

    pub fn phase(&self) -> SessionPhase {
        match &*lock(&self.state) {
            SessionState::Created => SessionPhase::Created,
            SessionState::Active { .. } => SessionPhase::Active,
            SessionState::Invalidated { .. } => SessionPhase::Invalidated,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        match &*lock(&self.state) {
            SessionState::Active { identity, .. } => Some(identity.clone()),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<Arc<W::Handle>> {
        match &*lock(&self.state) {
            SessionState::Active { handle, .. } => Some(handle.clone()),
            _ => None,
        }
    }

    /// Whether `handle` belongs to the session installed right now.
    pub fn is_current(&self, handle: &Arc<W::Handle>) -> bool {
        match &*lock(&self.state) {
            SessionState::Active { handle: current, .. } => Arc::ptr_eq(current, handle),
            _ => false,
        }
    }

    pub fn invalidation_reason(&self) -> Option<Cause> {
        match &*lock(&self.state) {
            SessionState::Invalidated { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    /// Resolves a fresh identity and session handle. Only the most recently
    /// started attempt may install its result; earlier ones report
    /// [`ConnectError::Superseded`] and leave the session alone.
    pub async fn connect(&self) -> Result<(Identity, Arc<W::Handle>), ConnectError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        info!(attempt, program = self.interface.name, "connecting wallet");

        let established = self.establish().await;

        let mut state = lock(&self.state);
        if self.attempts.load(Ordering::SeqCst) != attempt {
            warn!(attempt, "connection attempt superseded by a newer one");
            return Err(ConnectError::Superseded);
        }
        match established {
            Ok((identity, handle)) => {
                info!(attempt, %identity, "wallet connected");
                *state = SessionState::Active {
                    identity: identity.clone(),
                    handle: handle.clone(),
                };
                Ok((identity, handle))
            }
            Err(err) => {
                warn!(attempt, error = %err, "wallet connection failed");
                *state = SessionState::Invalidated {
                    reason: Cause::new(err.to_string()),
                };
                Err(err)
            }
        }
    }

    async fn establish(&self) -> Result<(Identity, Arc<W::Handle>), ConnectError> {
        let identity = self
            .wallet
            .request_identity()
            .await
            .map_err(ConnectError::ProviderUnavailable)?;
        let handle = self
            .wallet
            .session_handle(&identity)
            .await
            .map_err(ConnectError::ProviderUnavailable)?;
        let found = handle
            .interface_digest()
            .await
            .map_err(ConnectError::ProviderUnavailable)?;
        if !self.interface.matches_digest(&found) {
            return Err(ConnectError::InterfaceMismatch {
                expected: self.interface.digest.clone(),
                found,
            });
        }
        Ok((identity, Arc::new(handle)))
    }
}
