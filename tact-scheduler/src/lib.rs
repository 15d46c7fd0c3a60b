//! Deferred multi-party execution.
//!
//! An operation whose endorsements cannot all be satisfied up front is
//! parked as a pending transaction. Co-signers add signatures over the
//! same operation bytes until every required endorsement is satisfied,
//! the pending transaction expires, or it is executed. The coordinator
//! only collects and gates; executing the underlying operation against a
//! ledger is the caller's job.

pub mod coordinator;

pub use coordinator::{
    CreatePendingRequest, PendingCoordinator, PendingState, PendingTransaction,
};
