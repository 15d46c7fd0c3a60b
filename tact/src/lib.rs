//! Threshold Authorization and Compliance for Tokens (TACT)
//!
//! This crate re-exports all the components of the TACT system.

pub use tact_client::*;
pub use tact_compliance::*;
pub use tact_core::*;
pub use tact_scheduler::*;
pub use tact_signatory::*;
