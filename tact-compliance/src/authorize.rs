use crate::ledger::TokenLedger;
use crate::relationship::AccountTokenRelationship;
use crate::token_state::TokenState;
use tact_core::endorsement::Endorsement;
use tact_core::id::{AccountId, NftId, SerialNumber, TokenId};
use tact_core::key::SignatureSet;
use tact_core::operation::{
    Operation, TokenCreateBody, TokenKind, TokenUpdateBody, MAX_NFT_METADATA_BYTES,
};
use std::collections::BTreeSet;
use tact_core::status::Status;

/// Outcome of evaluating one operation against the ledger's compliance
/// rules and the supplied signatures
#[derive(Debug, Clone, PartialEq)]
pub enum AuthResult {
    /// Every precondition holds and every required endorsement is satisfied
    Authorized,
    /// Preconditions hold but this endorsement is not satisfied
    MissingEndorsement(Endorsement),
    /// A precondition fails; signatures were never consulted
    Forbidden(Status),
}

impl TokenLedger {
    /// Evaluate an operation without executing it.
    ///
    /// Preconditions (existence, lifecycle, gates, balances) are checked
    /// first; only when they all hold are the required endorsements
    /// evaluated against the signature set. A forbidden operation stays
    /// forbidden no matter who signed it.
    pub fn authorize(&self, op: &Operation, signatures: &SignatureSet) -> AuthResult {
        match self.required_for(op) {
            Err(status) => AuthResult::Forbidden(status),
            Ok(required) => {
                for endorsement in required {
                    if !endorsement.is_satisfied(signatures) {
                        return AuthResult::MissingEndorsement(endorsement);
                    }
                }
                AuthResult::Authorized
            }
        }
    }

    /// The endorsements an operation would need, with preconditions
    /// checked first. This is what a pending transaction is created
    /// against.
    pub fn required_endorsements(&self, op: &Operation) -> Result<Vec<Endorsement>, Status> {
        self.required_for(op)
    }

    /// Denial precedence for trading operations is fixed: deleted, then
    /// paused, then per-account freeze, then per-account KYC, then
    /// balance or ownership.
    fn required_for(&self, op: &Operation) -> Result<Vec<Endorsement>, Status> {
        match op {
            Operation::Create(body) => self.require_create(body),
            Operation::Mint {
                token,
                amount,
                metadata,
            } => self.require_mint(token, *amount, metadata),
            Operation::Burn {
                token,
                amount,
                serials,
            } => self.require_burn(token, *amount, serials),
            Operation::Associate { account, token } => self.require_associate(account, token),
            Operation::Dissociate { account, token } => self.require_dissociate(account, token),
            Operation::GrantKyc { account, token } | Operation::RevokeKyc { account, token } => {
                self.require_kyc_admin(account, token)
            }
            Operation::Freeze { account, token } | Operation::Unfreeze { account, token } => {
                self.require_freeze_admin(account, token)
            }
            Operation::Pause { token } | Operation::Unpause { token } => self.require_pause(token),
            Operation::Wipe {
                account,
                token,
                amount,
                serials,
            } => self.require_wipe(account, token, *amount, serials),
            Operation::Transfer {
                token,
                sender,
                receiver,
                amount,
                serials,
            } => self.require_transfer(token, sender, receiver, *amount, serials),
            Operation::Update(body) => self.require_update(body),
            Operation::Delete { token } => self.require_delete(token),
        }
    }

    /// The token, provided it exists and is not deleted
    fn token_or(&self, id: &TokenId) -> Result<&TokenState, Status> {
        let state = self.tokens.get(id).ok_or(Status::InvalidTokenId)?;
        if state.deleted {
            return Err(Status::TokenWasDeleted);
        }
        Ok(state)
    }

    /// The token, provided it exists, is not deleted, and is not paused
    fn tradable_token(&self, id: &TokenId) -> Result<&TokenState, Status> {
        let state = self.token_or(id)?;
        if state.is_paused() {
            return Err(Status::TokenIsPaused);
        }
        Ok(state)
    }

    /// Serial lists must name each instance once; the executed debit is
    /// one unit per listed serial
    fn distinct_serials(serials: &[SerialNumber]) -> Result<(), Status> {
        let mut seen = BTreeSet::new();
        if serials.iter().all(|serial| seen.insert(*serial)) {
            Ok(())
        } else {
            Err(Status::FailInvalid)
        }
    }

    fn account_key(&self, id: &AccountId) -> Result<Endorsement, Status> {
        self.accounts
            .get(id)
            .map(|record| record.key.clone())
            .ok_or(Status::InvalidAccountId)
    }

    fn require_create(&self, body: &TokenCreateBody) -> Result<Vec<Endorsement>, Status> {
        if body.name.is_empty() {
            return Err(Status::MissingTokenName);
        }
        if body.symbol.is_empty() {
            return Err(Status::MissingTokenSymbol);
        }
        if body.expiration <= self.now() {
            return Err(Status::InvalidExpirationTime);
        }
        if body.kind == TokenKind::NonFungible && body.initial_supply != 0 {
            return Err(Status::FailInvalid);
        }
        if let Some(ceiling) = body.ceiling {
            if body.initial_supply > ceiling {
                return Err(Status::TokenMaxSupplyReached);
            }
        }

        let mut required = vec![self.account_key(&body.treasury)?];
        if let Some(administrator) = &body.administrator {
            required.push(administrator.clone());
        }
        if let Some(renew_account) = &body.renew_account {
            required.push(self.account_key(renew_account)?);
        }
        Ok(required)
    }

    fn require_mint(
        &self,
        token: &TokenId,
        amount: u64,
        metadata: &[Vec<u8>],
    ) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(token)?;
        let supply = state
            .supply_endorsement
            .clone()
            .ok_or(Status::TokenHasNoSupplyKey)?;

        let units = match state.kind {
            TokenKind::Fungible => {
                if amount == 0 || !metadata.is_empty() {
                    return Err(Status::FailInvalid);
                }
                amount
            }
            TokenKind::NonFungible => {
                if metadata.is_empty() || amount != 0 {
                    return Err(Status::FailInvalid);
                }
                if metadata.iter().any(|m| m.len() > MAX_NFT_METADATA_BYTES) {
                    return Err(Status::FailInvalid);
                }
                metadata.len() as u64
            }
        };

        if units > state.remaining_capacity() {
            return Err(Status::TokenMaxSupplyReached);
        }
        Ok(vec![supply])
    }

    fn require_burn(
        &self,
        token: &TokenId,
        amount: u64,
        serials: &[SerialNumber],
    ) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(token)?;
        let supply = state
            .supply_endorsement
            .clone()
            .ok_or(Status::TokenHasNoSupplyKey)?;
        let treasury_rel = self
            .relationship(&state.treasury, token)
            .ok_or(Status::FailInvalid)?;

        match state.kind {
            TokenKind::Fungible => {
                if amount == 0 || !serials.is_empty() {
                    return Err(Status::FailInvalid);
                }
                if amount > treasury_rel.holding.amount() {
                    return Err(Status::InsufficientTokenBalance);
                }
            }
            TokenKind::NonFungible => {
                if serials.is_empty() || amount != 0 {
                    return Err(Status::FailInvalid);
                }
                Self::distinct_serials(serials)?;
                for serial in serials {
                    if self.assets.get(&NftId::new(*token, *serial)).is_none() {
                        return Err(Status::InvalidNftId);
                    }
                    // Burn only reaches instances held by the treasury
                    if !treasury_rel.holding.owns_serial(*serial) {
                        return Err(Status::InsufficientTokenBalance);
                    }
                }
            }
        }
        Ok(vec![supply])
    }

    fn require_associate(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Result<Vec<Endorsement>, Status> {
        let key = self.account_key(account)?;
        self.tradable_token(token)?;
        if self.relationship(account, token).is_some() {
            return Err(Status::TokenAlreadyAssociatedToAccount);
        }
        Ok(vec![key])
    }

    /// Dissociation of a deleted token is allowed regardless of balance,
    /// so holders of dead tokens can clean up.
    fn require_dissociate(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Result<Vec<Endorsement>, Status> {
        let key = self.account_key(account)?;
        let state = self.tokens.get(token).ok_or(Status::InvalidTokenId)?;
        let rel = self
            .relationship(account, token)
            .ok_or(Status::TokenNotAssociatedToAccount)?;
        if *account == state.treasury {
            return Err(Status::FailInvalid);
        }
        if !state.deleted && !rel.holding.is_zero() {
            return Err(Status::TransactionRequiresZeroTokenBalances);
        }
        Ok(vec![key])
    }

    fn require_kyc_admin(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(token)?;
        let endorsement = state
            .kyc_endorsement
            .clone()
            .ok_or(Status::TokenHasNoKycKey)?;
        if self.relationship(account, token).is_none() {
            return Err(Status::TokenNotAssociatedToAccount);
        }
        Ok(vec![endorsement])
    }

    fn require_freeze_admin(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(token)?;
        let endorsement = state
            .freeze_endorsement
            .clone()
            .ok_or(Status::TokenHasNoFreezeKey)?;
        if self.relationship(account, token).is_none() {
            return Err(Status::TokenNotAssociatedToAccount);
        }
        Ok(vec![endorsement])
    }

    fn require_pause(&self, token: &TokenId) -> Result<Vec<Endorsement>, Status> {
        let state = self.token_or(token)?;
        let endorsement = state
            .pause_endorsement
            .clone()
            .ok_or(Status::TokenHasNoPauseKey)?;
        Ok(vec![endorsement])
    }

    fn require_wipe(
        &self,
        account: &AccountId,
        token: &TokenId,
        amount: u64,
        serials: &[SerialNumber],
    ) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(token)?;
        let endorsement = state
            .confiscate_endorsement
            .clone()
            .ok_or(Status::TokenHasNoWipeKey)?;
        if *account == state.treasury {
            return Err(Status::CannotWipeTokenTreasuryAccount);
        }
        let rel = self
            .relationship(account, token)
            .ok_or(Status::TokenNotAssociatedToAccount)?;

        match state.kind {
            TokenKind::Fungible => {
                if amount == 0 || !serials.is_empty() {
                    return Err(Status::FailInvalid);
                }
                if amount > rel.holding.amount() {
                    return Err(Status::InsufficientTokenBalance);
                }
            }
            TokenKind::NonFungible => {
                if serials.is_empty() || amount != 0 {
                    return Err(Status::FailInvalid);
                }
                Self::distinct_serials(serials)?;
                for serial in serials {
                    if self.assets.get(&NftId::new(*token, *serial)).is_none() {
                        return Err(Status::InvalidNftId);
                    }
                    if !rel.holding.owns_serial(*serial) {
                        return Err(Status::AccountDoesNotOwnWipedNft);
                    }
                }
            }
        }
        Ok(vec![endorsement])
    }

    fn require_transfer(
        &self,
        token: &TokenId,
        sender: &AccountId,
        receiver: &AccountId,
        amount: u64,
        serials: &[SerialNumber],
    ) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(token)?;
        let sender_key = self.account_key(sender)?;
        let sender_rel = self
            .relationship(sender, token)
            .ok_or(Status::TokenNotAssociatedToAccount)?;
        if sender_rel.frozen() {
            return Err(Status::AccountFrozenForToken);
        }

        let receiver_record = self
            .accounts
            .get(receiver)
            .ok_or(Status::InvalidAccountId)?;
        // A missing receiver relationship is admitted only when an
        // auto-association slot is free; the gates are then evaluated on
        // the relationship the transfer would create
        let receiver_rel = match self.relationship(receiver, token) {
            Some(rel) => rel.clone(),
            None => {
                if !receiver_record.auto_association_available() {
                    return Err(Status::TokenNotAssociatedToAccount);
                }
                AccountTokenRelationship::new(*receiver, state, true)
            }
        };
        if receiver_rel.frozen() {
            return Err(Status::AccountFrozenForToken);
        }
        if sender_rel.kyc_blocked() || receiver_rel.kyc_blocked() {
            return Err(Status::AccountKycNotGrantedForToken);
        }

        match state.kind {
            TokenKind::Fungible => {
                if amount == 0 || !serials.is_empty() {
                    return Err(Status::FailInvalid);
                }
                if amount > sender_rel.holding.amount() {
                    return Err(Status::InsufficientTokenBalance);
                }
            }
            TokenKind::NonFungible => {
                if serials.is_empty() || amount != 0 {
                    return Err(Status::FailInvalid);
                }
                Self::distinct_serials(serials)?;
                for serial in serials {
                    if self.assets.get(&NftId::new(*token, *serial)).is_none() {
                        return Err(Status::InvalidNftId);
                    }
                    if !sender_rel.holding.owns_serial(*serial) {
                        return Err(Status::InsufficientTokenBalance);
                    }
                }
            }
        }

        let mut required = vec![sender_key];
        if receiver_record.receiver_sig_required {
            required.push(receiver_record.key.clone());
        }
        Ok(required)
    }

    fn require_update(&self, body: &TokenUpdateBody) -> Result<Vec<Endorsement>, Status> {
        let state = self.tradable_token(&body.token)?;
        let administrator = state
            .administrator
            .clone()
            .ok_or(Status::TokenIsImmutable)?;

        if matches!(&body.name, Some(name) if name.is_empty()) {
            return Err(Status::MissingTokenName);
        }
        if matches!(&body.symbol, Some(symbol) if symbol.is_empty()) {
            return Err(Status::MissingTokenSymbol);
        }

        let mut required = vec![administrator];
        if let Some(treasury) = &body.treasury {
            required.push(self.account_key(treasury)?);
        }
        Ok(required)
    }

    fn require_delete(&self, token: &TokenId) -> Result<Vec<Endorsement>, Status> {
        let state = self.token_or(token)?;
        let administrator = state
            .administrator
            .clone()
            .ok_or(Status::TokenIsImmutable)?;
        Ok(vec![administrator])
    }
}
