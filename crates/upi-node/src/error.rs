use std::fmt;
use std::time::Duration;

use upi_ledger::LedgerError;
use upi_store::StoreError;

/// Observable lifecycle state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
    Disconnected,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Outcome of a failed initialization, shared by every caller that awaited it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("backend bootstrap failed: {0}")]
    Backend(String),

    #[error("initialization timed out after {0:?}")]
    Timeout(Duration),

    #[error("initialization was abandoned before completing")]
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("initialization failed: {0}")]
    Initialization(#[from] InitError),

    #[error("cannot {operation} while node is {state}")]
    Precondition {
        operation: &'static str,
        state: NodeState,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type NodeResult<T> = Result<T, NodeError>;
