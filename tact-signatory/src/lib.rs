pub mod signatory;
pub mod signer;

// Re-export the main types for convenience
pub use signatory::{
    PendingRequest, ResolveOutcome, SchedulingIntent, Signatory, SigningSource,
};
pub use signer::{ExternalSigner, InProcessSigner};
