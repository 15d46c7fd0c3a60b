use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger status codes shared by precheck rejections, receipts, and
/// locally detected compliance denials.
///
/// Compliance failures detected before submission carry the same codes a
/// network rejection would, so callers handle one vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The operation succeeded
    Ok,

    /// A required endorsement was not satisfied by the supplied signatures
    InvalidSignature,

    /// Catch-all semantic rejection
    FailInvalid,

    /// The node is overloaded; the submission was not taken up
    Busy,

    /// Consensus was not reached before the transaction's window closed
    TransactionExpired,

    // -- argument-shaped rejections surfaced at the gateway --
    /// Token name was empty on create
    MissingTokenName,
    /// Token symbol was empty on create
    MissingTokenSymbol,
    /// Expiration is in the past
    InvalidExpirationTime,
    /// Referenced NFT serial does not exist
    InvalidNftId,
    /// Referenced token does not exist
    InvalidTokenId,
    /// Referenced account does not exist
    InvalidAccountId,

    // -- supply --
    /// Mint would push circulation past the configured ceiling
    TokenMaxSupplyReached,
    /// Burn or transfer amount exceeds the payer's balance, or a burned
    /// serial is not held by the treasury
    InsufficientTokenBalance,
    /// Token defines no supply endorsement
    TokenHasNoSupplyKey,

    // -- compliance gates --
    /// Token defines no KYC endorsement
    TokenHasNoKycKey,
    /// Token defines no freeze endorsement
    TokenHasNoFreezeKey,
    /// Token defines no pause endorsement
    TokenHasNoPauseKey,
    /// Token defines no confiscate endorsement
    TokenHasNoWipeKey,
    /// An account party to the transfer has KYC revoked for this token
    AccountKycNotGrantedForToken,
    /// An account party to the transfer is frozen for this token
    AccountFrozenForToken,
    /// The whole token is paused
    TokenIsPaused,

    // -- confiscation --
    /// Confiscation may not target the treasury
    CannotWipeTokenTreasuryAccount,
    /// Confiscation target does not own the named serial
    AccountDoesNotOwnWipedNft,

    // -- lifecycle --
    /// Token has been deleted
    TokenWasDeleted,
    /// Token has no administrator and cannot be updated or deleted
    TokenIsImmutable,

    // -- associations --
    /// Account has no relationship with the token
    TokenNotAssociatedToAccount,
    /// Account is already associated with the token
    TokenAlreadyAssociatedToAccount,
    /// Dissociation requires a zero balance
    TransactionRequiresZeroTokenBalances,

    // -- scheduling --
    /// The operation kind is not eligible for scheduling
    ScheduledTransactionNotInWhitelist,
    /// The pending transaction was already executed
    ScheduleAlreadyExecuted,
    /// The pending transaction expired before collecting enough signatures
    ScheduleAlreadyExpired,
    /// No pending transaction with the given id
    InvalidScheduleId,
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Whether a caller-level retry of the whole operation is appropriate
    pub fn is_transient(&self) -> bool {
        matches!(self, Status::Busy | Status::TransactionExpired)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
