use crate::token_state::TokenState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tact_core::id::{AccountId, SerialNumber, TokenId};
use tact_core::operation::TokenKind;

/// Per-relationship "know your customer" gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KycState {
    Granted,
    Revoked,
    /// Token defines no KYC endorsement; the gate never applies
    NotApplicable,
}

/// Per-relationship freeze gate, independent of the whole-token pause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreezeState {
    Tradable,
    Suspended,
    /// Token defines no freeze endorsement; the gate never applies
    NotApplicable,
}

/// What one account holds of one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Holding {
    /// Divisible balance
    Fungible(u64),
    /// Owned serial numbers
    NonFungible(BTreeSet<SerialNumber>),
}

impl Holding {
    pub fn empty_for(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Fungible => Holding::Fungible(0),
            TokenKind::NonFungible => Holding::NonFungible(BTreeSet::new()),
        }
    }

    /// Balance as a count: units for fungible, owned serials for NFT
    pub fn amount(&self) -> u64 {
        match self {
            Holding::Fungible(amount) => *amount,
            Holding::NonFungible(serials) => serials.len() as u64,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount() == 0
    }

    pub fn owns_serial(&self, serial: SerialNumber) -> bool {
        match self {
            Holding::Fungible(_) => false,
            Holding::NonFungible(serials) => serials.contains(&serial),
        }
    }
}

/// The relationship between one account and one token.
///
/// Created on association (explicit, or auto-association on first
/// transfer); destroyed on dissociation, which requires a zero balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountTokenRelationship {
    pub account: AccountId,
    pub token: TokenId,
    pub holding: Holding,
    pub kyc_state: KycState,
    pub freeze_state: FreezeState,
    pub auto_associated: bool,
}

impl AccountTokenRelationship {
    /// Initial relationship state per the token's configured defaults
    pub fn new(account: AccountId, token: &TokenState, auto_associated: bool) -> Self {
        let kyc_state = if token.kyc_endorsement.is_some() {
            KycState::Revoked
        } else {
            KycState::NotApplicable
        };

        let freeze_state = match &token.freeze_endorsement {
            Some(_) if token.freeze_default => FreezeState::Suspended,
            Some(_) => FreezeState::Tradable,
            None => FreezeState::NotApplicable,
        };

        Self {
            account,
            token: token.id,
            holding: Holding::empty_for(token.kind),
            kyc_state,
            freeze_state,
            auto_associated,
        }
    }

    /// Whether the KYC gate blocks this account from trading the token
    pub fn kyc_blocked(&self) -> bool {
        self.kyc_state == KycState::Revoked
    }

    /// Whether the freeze gate blocks this account from trading the token
    pub fn frozen(&self) -> bool {
        self.freeze_state == FreezeState::Suspended
    }
}

/// One non-fungible asset instance.
///
/// Created by Mint with the treasury as owner; mutated by Transfer;
/// removed from circulation by Burn or Wipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetInstance {
    pub token: TokenId,
    pub serial: SerialNumber,
    pub owner: AccountId,
    pub created_at: DateTime<Utc>,
    pub metadata: Vec<u8>,
    pub delegated_spender: Option<AccountId>,
}
