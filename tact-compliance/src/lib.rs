pub mod authorize;
pub mod ledger;
pub mod relationship;
pub mod token_state;

// Re-export the main types for convenience
pub use authorize::AuthResult;
pub use ledger::{AccountRecord, TokenLedger};
pub use relationship::{AccountTokenRelationship, AssetInstance, FreezeState, Holding, KycState};
pub use token_state::{PauseState, TokenState};
