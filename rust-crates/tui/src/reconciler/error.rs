use crate::reconciler::types::Cause;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(Cause),
    #[error("program interface mismatch: expected ABI {expected}, program reports {found}")]
    InterfaceMismatch { expected: String, found: String },
    #[error("a newer connection attempt replaced this one")]
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("no wallet connected")]
    NotConnected,
    #[error("another move is still waiting for confirmation")]
    ActionInProgress,
    #[error("transaction error: {0}")]
    ActionFailed(Cause),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no wallet connected")]
    NotConnected,
    #[error("history unavailable: {0}")]
    HistoryUnavailable(Cause),
}
