use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tact_core::endorsement::Endorsement;
use tact_core::id::{AccountId, SerialNumber, TokenId};
use tact_core::operation::{TokenCreateBody, TokenKind};

/// Whole-token trading state. Pause applies to every holder at once,
/// unlike per-account freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PauseState {
    /// Trading allowed
    Tradable,
    /// Trading suspended for every holder
    Suspended,
    /// Token defines no pause endorsement; it can never be paused
    NotApplicable,
}

/// Per-token ledger state.
///
/// Created only by a Create operation; mutated only through operations
/// whose required endorsement is satisfied; never physically destroyed,
/// only flagged deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenState {
    pub id: TokenId,
    pub name: String,
    pub symbol: String,
    pub kind: TokenKind,

    /// Absent administrator means the token is immutable
    pub administrator: Option<Endorsement>,
    pub supply_endorsement: Option<Endorsement>,
    pub kyc_endorsement: Option<Endorsement>,
    pub freeze_endorsement: Option<Endorsement>,
    pub pause_endorsement: Option<Endorsement>,
    pub confiscate_endorsement: Option<Endorsement>,
    pub royalty_endorsement: Option<Endorsement>,

    /// Initial holder of minted supply and accounting anchor for
    /// circulation
    pub treasury: AccountId,

    /// Count of live asset instances (NFT) or sum of all relationship
    /// balances (fungible); maintained by the ledger at every mutation
    pub circulation: u64,
    pub ceiling: Option<u64>,

    pub deleted: bool,
    pub pause_state: PauseState,
    pub freeze_default: bool,

    pub expiration: DateTime<Utc>,
    pub renew_account: Option<AccountId>,
    pub memo: String,

    /// Next serial to assign on an NFT mint; serials start at 1
    pub next_serial: SerialNumber,
}

impl TokenState {
    /// Build the initial state for a Create body
    pub fn from_create(id: TokenId, body: &TokenCreateBody) -> Self {
        let pause_state = if body.pause_endorsement.is_some() {
            PauseState::Tradable
        } else {
            PauseState::NotApplicable
        };

        Self {
            id,
            name: body.name.clone(),
            symbol: body.symbol.clone(),
            kind: body.kind,
            administrator: body.administrator.clone(),
            supply_endorsement: body.supply_endorsement.clone(),
            kyc_endorsement: body.kyc_endorsement.clone(),
            freeze_endorsement: body.freeze_endorsement.clone(),
            pause_endorsement: body.pause_endorsement.clone(),
            confiscate_endorsement: body.confiscate_endorsement.clone(),
            royalty_endorsement: body.royalty_endorsement.clone(),
            treasury: body.treasury,
            circulation: body.initial_supply,
            ceiling: body.ceiling,
            deleted: false,
            pause_state,
            freeze_default: body.freeze_default,
            expiration: body.expiration,
            renew_account: body.renew_account,
            memo: body.memo.clone(),
            next_serial: 1,
        }
    }

    /// A token without an administrator cannot be updated or deleted
    pub fn is_immutable(&self) -> bool {
        self.administrator.is_none()
    }

    pub fn is_paused(&self) -> bool {
        self.pause_state == PauseState::Suspended
    }

    /// How many more units/instances may be minted under the ceiling
    pub fn remaining_capacity(&self) -> u64 {
        match self.ceiling {
            Some(ceiling) => ceiling.saturating_sub(self.circulation),
            None => u64::MAX - self.circulation,
        }
    }
}
