pub mod clock;
pub mod endorsement;
pub mod error;
pub mod id;
pub mod key;
pub mod operation;
pub mod status;

// Re-export the main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use endorsement::Endorsement;
pub use error::TactError;
pub use id::{AccountId, EntityId, NftId, PendingId, SerialNumber, TokenId};
pub use key::{PrivateKey, PublicKey, Signature, SignatureSet};
pub use operation::{
    Operation, OperationKind, Receipt, TokenCreateBody, TokenKind, TokenUpdateBody, TransactionId,
};
pub use status::Status;
