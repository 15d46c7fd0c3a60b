use crate::endorsement::Endorsement;
use crate::error::TactError;
use crate::id::{AccountId, PendingId, SerialNumber, TokenId};
use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Maximum metadata size of one non-fungible asset instance, in bytes
pub const MAX_NFT_METADATA_BYTES: usize = 100;

/// Whether a token's supply is divisible balances or serial-numbered assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Fungible,
    NonFungible,
}

/// Body of a token Create operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCreateBody {
    pub name: String,
    pub symbol: String,
    pub kind: TokenKind,
    pub treasury: AccountId,

    /// Administrator endorsement; absent means the token is immutable
    pub administrator: Option<Endorsement>,
    pub supply_endorsement: Option<Endorsement>,
    pub kyc_endorsement: Option<Endorsement>,
    pub freeze_endorsement: Option<Endorsement>,
    pub pause_endorsement: Option<Endorsement>,
    pub confiscate_endorsement: Option<Endorsement>,
    pub royalty_endorsement: Option<Endorsement>,

    /// Initial fungible supply credited to the treasury; zero for NFTs
    pub initial_supply: u64,
    pub ceiling: Option<u64>,

    /// New relationships start frozen when true (and a freeze endorsement
    /// is defined)
    pub freeze_default: bool,

    pub expiration: DateTime<Utc>,
    pub renew_account: Option<AccountId>,
    pub memo: String,
}

/// Body of a token Update operation; `None` fields are left unchanged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUpdateBody {
    pub token: TokenId,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub treasury: Option<AccountId>,
    pub administrator: Option<Endorsement>,
    pub memo: Option<String>,
}

/// One ledger mutation request.
///
/// The body is what gets canonically encoded and signed; which
/// endorsement(s) must sign it is decided by the compliance state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Create(TokenCreateBody),
    Mint {
        token: TokenId,
        /// Fungible amount; zero for NFT mints
        amount: u64,
        /// One entry per NFT to mint; empty for fungible mints
        metadata: Vec<Vec<u8>>,
    },
    Burn {
        token: TokenId,
        amount: u64,
        serials: Vec<SerialNumber>,
    },
    Associate {
        account: AccountId,
        token: TokenId,
    },
    Dissociate {
        account: AccountId,
        token: TokenId,
    },
    GrantKyc {
        account: AccountId,
        token: TokenId,
    },
    RevokeKyc {
        account: AccountId,
        token: TokenId,
    },
    Freeze {
        account: AccountId,
        token: TokenId,
    },
    Unfreeze {
        account: AccountId,
        token: TokenId,
    },
    Pause {
        token: TokenId,
    },
    Unpause {
        token: TokenId,
    },
    Wipe {
        account: AccountId,
        token: TokenId,
        amount: u64,
        serials: Vec<SerialNumber>,
    },
    Transfer {
        token: TokenId,
        sender: AccountId,
        receiver: AccountId,
        amount: u64,
        serials: Vec<SerialNumber>,
    },
    Update(TokenUpdateBody),
    Delete {
        token: TokenId,
    },
}

/// Discriminant of an Operation, used for scheduling eligibility and
/// error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Create,
    Mint,
    Burn,
    Associate,
    Dissociate,
    GrantKyc,
    RevokeKyc,
    Freeze,
    Unfreeze,
    Pause,
    Unpause,
    Wipe,
    Transfer,
    Update,
    Delete,
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create(_) => OperationKind::Create,
            Operation::Mint { .. } => OperationKind::Mint,
            Operation::Burn { .. } => OperationKind::Burn,
            Operation::Associate { .. } => OperationKind::Associate,
            Operation::Dissociate { .. } => OperationKind::Dissociate,
            Operation::GrantKyc { .. } => OperationKind::GrantKyc,
            Operation::RevokeKyc { .. } => OperationKind::RevokeKyc,
            Operation::Freeze { .. } => OperationKind::Freeze,
            Operation::Unfreeze { .. } => OperationKind::Unfreeze,
            Operation::Pause { .. } => OperationKind::Pause,
            Operation::Unpause { .. } => OperationKind::Unpause,
            Operation::Wipe { .. } => OperationKind::Wipe,
            Operation::Transfer { .. } => OperationKind::Transfer,
            Operation::Update(_) => OperationKind::Update,
            Operation::Delete { .. } => OperationKind::Delete,
        }
    }

    /// The token this operation targets
    pub fn token(&self) -> Option<TokenId> {
        match self {
            Operation::Create(_) => None,
            Operation::Mint { token, .. }
            | Operation::Burn { token, .. }
            | Operation::Associate { token, .. }
            | Operation::Dissociate { token, .. }
            | Operation::GrantKyc { token, .. }
            | Operation::RevokeKyc { token, .. }
            | Operation::Freeze { token, .. }
            | Operation::Unfreeze { token, .. }
            | Operation::Pause { token }
            | Operation::Unpause { token }
            | Operation::Wipe { token, .. }
            | Operation::Transfer { token, .. }
            | Operation::Delete { token } => Some(*token),
            Operation::Update(body) => Some(body.token),
        }
    }

    /// Canonical byte encoding of the body; these are the bytes signers
    /// sign
    pub fn signable_bytes(&self) -> Result<Vec<u8>, TactError> {
        Ok(bincode::serialize(self)?)
    }

    /// Derive the transaction id for this body submitted by `payer`
    pub fn transaction_id(&self, payer: AccountId) -> Result<TransactionId, TactError> {
        let body = self.signable_bytes()?;
        let mut hasher = Sha256::new();
        hasher.update(b"TACT_Txn");
        hasher.update(payer.entity_id().bytes());
        hasher.update(&body);
        Ok(TransactionId(hasher.finalize().into()))
    }
}

impl OperationKind {
    /// Verb for the "Unable to <Verb> <Noun>" error template
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::Create => "Create",
            OperationKind::Mint => "Mint",
            OperationKind::Burn => "Burn",
            OperationKind::Associate => "Associate",
            OperationKind::Dissociate => "Dissociate",
            OperationKind::GrantKyc => "GrantKyc",
            OperationKind::RevokeKyc => "RevokeKyc",
            OperationKind::Freeze => "Freeze",
            OperationKind::Unfreeze => "Unfreeze",
            OperationKind::Pause => "Pause",
            OperationKind::Unpause => "Unpause",
            OperationKind::Wipe => "Wipe",
            OperationKind::Transfer => "Transfer",
            OperationKind::Update => "Update",
            OperationKind::Delete => "Delete",
        }
    }

    /// Noun for the "Unable to <Verb> <Noun>" error template
    pub fn noun(&self) -> &'static str {
        match self {
            OperationKind::Associate
            | OperationKind::Dissociate
            | OperationKind::GrantKyc
            | OperationKind::RevokeKyc
            | OperationKind::Freeze
            | OperationKind::Unfreeze
            | OperationKind::Wipe => "Account",
            _ => "Token",
        }
    }
}

/// Identifies one submitted transaction, for receipt lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub [u8; 32]);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", hex::encode(&self.0[0..6]))
    }
}

/// The outcome of a transaction that reached consensus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub status: Status,

    /// Set on a successful Create
    pub token_id: Option<TokenId>,
    /// Serials assigned by a successful NFT Mint
    pub serials: Vec<SerialNumber>,
    /// Circulation after a successful Mint, Burn, or Wipe
    pub new_total_supply: Option<u64>,
    /// Set when the submission produced a pending transaction instead
    pub pending_id: Option<PendingId>,

    pub consensus_at: DateTime<Utc>,
}

impl Receipt {
    pub fn new(transaction_id: TransactionId, status: Status, consensus_at: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            status,
            token_id: None,
            serials: Vec::new(),
            new_total_supply: None,
            pending_id: None,
            consensus_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;

    fn token() -> TokenId {
        TokenId::from_seed(b"gold")
    }

    fn account(seed: &[u8]) -> AccountId {
        AccountId::from_seed(seed)
    }

    #[test]
    fn test_signable_bytes_are_deterministic() {
        let op = Operation::Mint {
            token: token(),
            amount: 0,
            metadata: vec![vec![1, 2, 3]],
        };
        assert_eq!(op.signable_bytes().unwrap(), op.signable_bytes().unwrap());

        let other = Operation::Mint {
            token: token(),
            amount: 0,
            metadata: vec![vec![1, 2, 4]],
        };
        assert_ne!(op.signable_bytes().unwrap(), other.signable_bytes().unwrap());
    }

    #[test]
    fn test_transaction_id_depends_on_payer() {
        let op = Operation::Pause { token: token() };
        let a = op.transaction_id(account(b"a")).unwrap();
        let b = op.transaction_id(account(b"b")).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, op.transaction_id(account(b"a")).unwrap());
    }

    #[test]
    fn test_kind_and_template_parts() {
        let op = Operation::Wipe {
            account: account(b"t"),
            token: token(),
            amount: 1,
            serials: vec![],
        };
        assert_eq!(op.kind(), OperationKind::Wipe);
        assert_eq!(op.kind().verb(), "Wipe");
        assert_eq!(op.kind().noun(), "Account");
        assert_eq!(op.token(), Some(token()));
    }

    #[test]
    fn test_receipt_roundtrip() {
        let id = TransactionId([7; 32]);
        let mut receipt = Receipt::new(id, Status::Ok, Utc::now());
        receipt.token_id = Some(TokenId::new(EntityId::new([9; 32])));
        receipt.serials = vec![1, 2, 3];

        let bytes = bincode::serialize(&receipt).unwrap();
        let back: Receipt = bincode::deserialize(&bytes).unwrap();
        assert_eq!(receipt, back);
        assert!(back.is_success());
    }
}
