//! Submission client.
//!
//! Ties the other layers together: a `TokenClient` encodes an operation,
//! resolves a `Signatory` against its bytes, and either submits the
//! signed operation to a network for compliance checking and execution,
//! or parks it as a pending transaction when the signatory carries a
//! scheduling intent. Every response funnels through one pure outcome
//! classifier, so retry and error mapping behave identically for every
//! operation.

pub mod classifier;
pub mod client;
pub mod config;
pub mod network;

pub use classifier::{classify, ExecutionOutcome, RawResponse};
pub use client::{Submission, TokenClient};
pub use config::{CallConfig, ClientDefaults, ResolvedConfig};
pub use network::{LedgerView, MockNetwork, Submitter};
