use crate::operation::{OperationKind, Receipt};
use crate::status::Status;
use thiserror::Error;

/// Represents all possible errors surfaced to callers of TACT operations
#[derive(Error, Debug)]
pub enum TactError {
    /// Malformed or missing local values, raised before any network
    /// interaction and never retried
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Node-level synchronous rejection before consensus; not retried by
    /// this layer
    #[error("transaction failed precheck, status: {0}")]
    Precheck(Status),

    /// The network failed to reach timely consensus; the caller may retry
    /// the whole operation
    #[error("failed to reach consensus, status: {0}")]
    Consensus(Status),

    /// Consensus was reached but the operation was semantically rejected;
    /// carries the receipt for inspection
    #[error("Unable to {verb} {noun}, status: {status}")]
    Transaction {
        verb: &'static str,
        noun: &'static str,
        status: Status,
        receipt: Receipt,
    },

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl TactError {
    /// Build the templated transaction error for a rejected operation
    pub fn transaction(kind: OperationKind, status: Status, receipt: Receipt) -> Self {
        TactError::Transaction {
            verb: kind.verb(),
            noun: kind.noun(),
            status,
            receipt,
        }
    }

    /// The ledger status attached to this error, if any
    pub fn status(&self) -> Option<Status> {
        match self {
            TactError::Precheck(status)
            | TactError::Consensus(status)
            | TactError::Transaction { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<bincode::Error> for TactError {
    fn from(err: bincode::Error) -> Self {
        TactError::Argument(format!("serialization failed: {}", err))
    }
}
