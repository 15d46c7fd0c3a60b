use crate::relationship::{AccountTokenRelationship, AssetInstance, FreezeState, Holding, KycState};
use crate::token_state::{PauseState, TokenState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tact_core::clock::{Clock, SystemClock};
use tact_core::endorsement::Endorsement;
use tact_core::error::TactError;
use tact_core::id::{AccountId, EntityId, NftId, TokenId};
use tact_core::key::SignatureSet;
use tact_core::operation::{Operation, Receipt, TokenKind, TransactionId};
use tact_core::status::Status;

use crate::authorize::AuthResult;

/// Ledger-side record of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    /// The endorsement that authorizes actions by this account
    pub key: Endorsement,
    /// Transfers to this account also require its signature
    pub receiver_sig_required: bool,
    /// Token relationships this account accepts without an explicit
    /// Associate
    pub max_auto_associations: u32,
    pub used_auto_associations: u32,
}

impl AccountRecord {
    pub fn new(id: AccountId, key: Endorsement) -> Self {
        Self {
            id,
            key,
            receiver_sig_required: false,
            max_auto_associations: 0,
            used_auto_associations: 0,
        }
    }

    pub fn with_receiver_sig_required(mut self, required: bool) -> Self {
        self.receiver_sig_required = required;
        self
    }

    pub fn with_max_auto_associations(mut self, max: u32) -> Self {
        self.max_auto_associations = max;
        self
    }

    pub fn auto_association_available(&self) -> bool {
        self.used_auto_associations < self.max_auto_associations
    }
}

/// The compliance state machine's store: per-token state, per-(account,
/// token) relationships, and live asset instances.
///
/// `authorize` (see `authorize.rs`) validates an operation against this
/// state; `apply` runs authorize and then executes the mutation. Every
/// violating operation is rejected before any mutation, so the
/// circulation invariant holds unconditionally between calls.
pub struct TokenLedger {
    clock: Arc<dyn Clock>,
    pub(crate) accounts: HashMap<AccountId, AccountRecord>,
    pub(crate) tokens: HashMap<TokenId, TokenState>,
    pub(crate) relationships: HashMap<(AccountId, TokenId), AccountTokenRelationship>,
    pub(crate) assets: BTreeMap<NftId, AssetInstance>,
}

impl TokenLedger {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            accounts: HashMap::new(),
            tokens: HashMap::new(),
            relationships: HashMap::new(),
            assets: BTreeMap::new(),
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register an account so operations can reference it
    pub fn register_account(&mut self, record: AccountRecord) {
        self.accounts.insert(record.id, record);
    }

    pub fn account(&self, id: &AccountId) -> Option<&AccountRecord> {
        self.accounts.get(id)
    }

    pub fn token_state(&self, id: &TokenId) -> Option<&TokenState> {
        self.tokens.get(id)
    }

    pub fn relationship(
        &self,
        account: &AccountId,
        token: &TokenId,
    ) -> Option<&AccountTokenRelationship> {
        self.relationships.get(&(*account, *token))
    }

    pub fn asset(&self, id: &NftId) -> Option<&AssetInstance> {
        self.assets.get(id)
    }

    /// Balance of one account in one token: units for fungible, owned
    /// serial count for NFT
    pub fn balance_of(&self, account: &AccountId, token: &TokenId) -> u64 {
        self.relationship(account, token)
            .map(|rel| rel.holding.amount())
            .unwrap_or(0)
    }

    /// Count of live asset instances of one token type
    pub fn live_assets_of(&self, token: &TokenId) -> u64 {
        self.assets.values().filter(|a| a.token == *token).count() as u64
    }

    /// Authorize and, if legal, execute one operation.
    ///
    /// Every signature in the set must verify against the operation's
    /// canonical bytes before endorsements are even consulted; a key
    /// paired with bytes it never signed satisfies nothing. Always
    /// produces a receipt; compliance denials carry the same status codes
    /// a network rejection would.
    pub fn apply(
        &mut self,
        op: &Operation,
        payer: AccountId,
        signatures: &SignatureSet,
    ) -> Result<Receipt, TactError> {
        let tx_id = op.transaction_id(payer)?;
        let now = self.clock.now();

        let message = op.signable_bytes()?;
        if !signatures.verify_all(&message) {
            log::debug!("{}: {:?} rejected, signature set does not verify", tx_id, op.kind());
            return Ok(Receipt::new(tx_id, Status::InvalidSignature, now));
        }

        match self.authorize(op, signatures) {
            AuthResult::Authorized => Ok(self.execute(op, tx_id, now)),
            AuthResult::MissingEndorsement(endorsement) => {
                log::debug!(
                    "{}: {:?} rejected, endorsement not satisfied: {:?}",
                    tx_id,
                    op.kind(),
                    endorsement
                );
                Ok(Receipt::new(tx_id, Status::InvalidSignature, now))
            }
            AuthResult::Forbidden(status) => {
                log::debug!("{}: {:?} forbidden, status {}", tx_id, op.kind(), status);
                Ok(Receipt::new(tx_id, status, now))
            }
        }
    }

    /// Derive the id of a token created by the given transaction
    fn token_id_for(tx_id: &TransactionId) -> TokenId {
        let (id, _) = EntityId::find_eid(&[b"token-create", &tx_id.0]);
        TokenId::new(id)
    }

    /// Execute an operation `authorize` has fully validated. All
    /// preconditions (existence, balances, ownership, capacity) were
    /// checked, so the mutations here cannot fail.
    fn execute(&mut self, op: &Operation, tx_id: TransactionId, now: DateTime<Utc>) -> Receipt {
        let mut receipt = Receipt::new(tx_id, Status::Ok, now);

        match op {
            Operation::Create(body) => {
                let token_id = Self::token_id_for(&tx_id);
                let state = TokenState::from_create(token_id, body);

                // The treasury relationship is created with both gates
                // open: it must be able to receive minted supply
                let mut rel = AccountTokenRelationship::new(body.treasury, &state, false);
                if rel.kyc_state == KycState::Revoked {
                    rel.kyc_state = KycState::Granted;
                }
                if rel.freeze_state == FreezeState::Suspended {
                    rel.freeze_state = FreezeState::Tradable;
                }
                if let Holding::Fungible(balance) = &mut rel.holding {
                    *balance = body.initial_supply;
                }

                receipt.token_id = Some(token_id);
                receipt.new_total_supply = Some(state.circulation);
                self.relationships.insert((body.treasury, token_id), rel);
                self.tokens.insert(token_id, state);
                log::info!("{}: created token {}", tx_id, token_id);
            }

            Operation::Mint {
                token,
                amount,
                metadata,
            } => {
                let state = self.tokens.get_mut(token).expect("checked by authorize");
                let treasury = state.treasury;

                match state.kind {
                    TokenKind::Fungible => {
                        state.circulation += amount;
                    }
                    TokenKind::NonFungible => {
                        for item in metadata {
                            let serial = state.next_serial;
                            state.next_serial += 1;
                            state.circulation += 1;
                            receipt.serials.push(serial);
                            self.assets.insert(
                                NftId::new(*token, serial),
                                AssetInstance {
                                    token: *token,
                                    serial,
                                    owner: treasury,
                                    created_at: now,
                                    metadata: item.clone(),
                                    delegated_spender: None,
                                },
                            );
                        }
                    }
                }
                receipt.new_total_supply = Some(self.tokens[token].circulation);

                let rel = self
                    .relationships
                    .get_mut(&(treasury, *token))
                    .expect("treasury relationship exists from create");
                match &mut rel.holding {
                    Holding::Fungible(balance) => *balance += amount,
                    Holding::NonFungible(serials) => serials.extend(receipt.serials.iter()),
                }
            }

            Operation::Burn {
                token,
                amount,
                serials,
            } => {
                let treasury = self.tokens[token].treasury;
                let rel = self
                    .relationships
                    .get_mut(&(treasury, *token))
                    .expect("treasury relationship exists from create");
                match &mut rel.holding {
                    Holding::Fungible(balance) => *balance -= amount,
                    Holding::NonFungible(owned) => {
                        for serial in serials {
                            owned.remove(serial);
                            self.assets.remove(&NftId::new(*token, *serial));
                        }
                    }
                }

                let state = self.tokens.get_mut(token).expect("checked by authorize");
                state.circulation -= match state.kind {
                    TokenKind::Fungible => *amount,
                    TokenKind::NonFungible => serials.len() as u64,
                };
                receipt.new_total_supply = Some(state.circulation);
            }

            Operation::Associate { account, token } => {
                let state = &self.tokens[token];
                self.relationships.insert(
                    (*account, *token),
                    AccountTokenRelationship::new(*account, state, false),
                );
            }

            Operation::Dissociate { account, token } => {
                if let Some(rel) = self.relationships.remove(&(*account, *token)) {
                    // An auto-associated relationship gives its slot back
                    if rel.auto_associated {
                        if let Some(record) = self.accounts.get_mut(account) {
                            record.used_auto_associations =
                                record.used_auto_associations.saturating_sub(1);
                        }
                    }
                }
            }

            Operation::GrantKyc { account, token } => {
                self.relationships
                    .get_mut(&(*account, *token))
                    .expect("checked by authorize")
                    .kyc_state = KycState::Granted;
            }

            Operation::RevokeKyc { account, token } => {
                self.relationships
                    .get_mut(&(*account, *token))
                    .expect("checked by authorize")
                    .kyc_state = KycState::Revoked;
            }

            Operation::Freeze { account, token } => {
                self.relationships
                    .get_mut(&(*account, *token))
                    .expect("checked by authorize")
                    .freeze_state = FreezeState::Suspended;
            }

            Operation::Unfreeze { account, token } => {
                self.relationships
                    .get_mut(&(*account, *token))
                    .expect("checked by authorize")
                    .freeze_state = FreezeState::Tradable;
            }

            Operation::Pause { token } => {
                self.tokens.get_mut(token).expect("checked by authorize").pause_state =
                    PauseState::Suspended;
                log::info!("{}: paused token {}", tx_id, token);
            }

            Operation::Unpause { token } => {
                self.tokens.get_mut(token).expect("checked by authorize").pause_state =
                    PauseState::Tradable;
            }

            Operation::Wipe {
                account,
                token,
                amount,
                serials,
            } => {
                let rel = self
                    .relationships
                    .get_mut(&(*account, *token))
                    .expect("checked by authorize");
                match &mut rel.holding {
                    Holding::Fungible(balance) => *balance -= amount,
                    Holding::NonFungible(owned) => {
                        for serial in serials {
                            owned.remove(serial);
                            self.assets.remove(&NftId::new(*token, *serial));
                        }
                    }
                }

                let state = self.tokens.get_mut(token).expect("checked by authorize");
                state.circulation -= match state.kind {
                    TokenKind::Fungible => *amount,
                    TokenKind::NonFungible => serials.len() as u64,
                };
                receipt.new_total_supply = Some(state.circulation);
            }

            Operation::Transfer {
                token,
                sender,
                receiver,
                amount,
                serials,
            } => {
                // Auto-associate the receiver on first transfer when it
                // has spare auto-association slots
                if !self.relationships.contains_key(&(*receiver, *token)) {
                    // authorize only admits this path when the relationship's
                    // initial gate states would not block the incoming transfer
                    let state = &self.tokens[token];
                    let rel = AccountTokenRelationship::new(*receiver, state, true);
                    self.relationships.insert((*receiver, *token), rel);
                    if let Some(record) = self.accounts.get_mut(receiver) {
                        record.used_auto_associations += 1;
                    }
                }

                let sender_rel = self
                    .relationships
                    .get_mut(&(*sender, *token))
                    .expect("checked by authorize");
                match &mut sender_rel.holding {
                    Holding::Fungible(balance) => *balance -= amount,
                    Holding::NonFungible(owned) => {
                        for serial in serials {
                            owned.remove(serial);
                        }
                    }
                }

                let receiver_rel = self
                    .relationships
                    .get_mut(&(*receiver, *token))
                    .expect("created above if missing");
                match &mut receiver_rel.holding {
                    Holding::Fungible(balance) => *balance += amount,
                    Holding::NonFungible(owned) => {
                        owned.extend(serials.iter());
                    }
                }

                for serial in serials {
                    let asset = self
                        .assets
                        .get_mut(&NftId::new(*token, *serial))
                        .expect("checked by authorize");
                    asset.owner = *receiver;
                    asset.delegated_spender = None;
                }
            }

            Operation::Update(body) => {
                let state = self.tokens.get_mut(&body.token).expect("checked by authorize");
                if let Some(name) = &body.name {
                    state.name = name.clone();
                }
                if let Some(symbol) = &body.symbol {
                    state.symbol = symbol.clone();
                }
                if let Some(administrator) = &body.administrator {
                    state.administrator = Some(administrator.clone());
                }
                if let Some(memo) = &body.memo {
                    state.memo = memo.clone();
                }
                if let Some(treasury) = body.treasury {
                    state.treasury = treasury;
                    let state = self.tokens[&body.token].clone();
                    self.relationships
                        .entry((treasury, body.token))
                        .or_insert_with(|| {
                            let mut rel =
                                AccountTokenRelationship::new(treasury, &state, false);
                            if rel.kyc_state == KycState::Revoked {
                                rel.kyc_state = KycState::Granted;
                            }
                            if rel.freeze_state == FreezeState::Suspended {
                                rel.freeze_state = FreezeState::Tradable;
                            }
                            rel
                        });
                }
            }

            Operation::Delete { token } => {
                self.tokens.get_mut(token).expect("checked by authorize").deleted = true;
                log::info!("{}: deleted token {}", tx_id, token);
            }
        }

        receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorize::tests::{create_simple_token, fixture, grant_kyc, mint_nft, signed};
    use crate::authorize::AuthResult;
    use tact_core::key::Signature;
    use tact_core::operation::Operation;

    #[test]
    fn test_circulation_tracks_live_assets() {
        let mut fx = fixture();
        mint_nft(&mut fx, 3);

        let state = fx.ledger.token_state(&fx.token).unwrap();
        assert_eq!(state.circulation, 3);
        assert_eq!(fx.ledger.live_assets_of(&fx.token), 3);
        assert_eq!(fx.ledger.balance_of(&fx.treasury, &fx.token), 3);
    }

    #[test]
    fn test_burn_debits_treasury_and_circulation() {
        let mut fx = fixture();
        mint_nft(&mut fx, 3);

        let op = Operation::Burn {
            token: fx.token,
            amount: 0,
            serials: vec![1, 3],
        };
        let sigs = signed(&[&fx.supply_key], &op);
        let receipt = fx.ledger.apply(&op, fx.treasury, &sigs).unwrap();

        assert_eq!(receipt.status, Status::Ok);
        assert_eq!(receipt.new_total_supply, Some(1));
        assert_eq!(fx.ledger.live_assets_of(&fx.token), 1);
        assert_eq!(fx.ledger.balance_of(&fx.treasury, &fx.token), 1);
        assert!(fx.ledger.asset(&NftId::new(fx.token, 2)).is_some());
        assert!(fx.ledger.asset(&NftId::new(fx.token, 1)).is_none());
    }

    #[test]
    fn test_forged_signature_is_rejected() {
        let mut fx = fixture();

        // The right key paired with bytes it never signed
        let op = Operation::Mint {
            token: fx.token,
            amount: 0,
            metadata: vec![vec![1]],
        };
        let mut sigs = SignatureSet::new();
        sigs.insert(fx.supply_key.public_key(), Signature::from_bytes([0xAB; 32]));

        let receipt = fx.ledger.apply(&op, fx.treasury, &sigs).unwrap();
        assert_eq!(receipt.status, Status::InvalidSignature);
        assert_eq!(fx.ledger.token_state(&fx.token).unwrap().circulation, 0);
    }

    #[test]
    fn test_signature_over_other_bytes_is_rejected() {
        let mut fx = fixture();

        let burn = Operation::Burn {
            token: fx.token,
            amount: 0,
            serials: vec![1],
        };
        let mint = Operation::Mint {
            token: fx.token,
            amount: 0,
            metadata: vec![vec![1]],
        };
        // A valid burn signature must not authorize a mint
        let sigs = signed(&[&fx.supply_key], &burn);
        let receipt = fx.ledger.apply(&mint, fx.treasury, &sigs).unwrap();
        assert_eq!(receipt.status, Status::InvalidSignature);
        assert_eq!(fx.ledger.token_state(&fx.token).unwrap().circulation, 0);
    }

    #[test]
    fn test_duplicate_serials_are_rejected_whole() {
        let mut fx = fixture();
        mint_nft(&mut fx, 2);

        let op = Operation::Burn {
            token: fx.token,
            amount: 0,
            serials: vec![1, 1],
        };
        let sigs = signed(&[&fx.supply_key], &op);
        let receipt = fx.ledger.apply(&op, fx.treasury, &sigs).unwrap();
        assert_eq!(receipt.status, Status::FailInvalid);
        assert_eq!(fx.ledger.token_state(&fx.token).unwrap().circulation, 2);
        assert_eq!(fx.ledger.live_assets_of(&fx.token), 2);
        assert_eq!(fx.ledger.balance_of(&fx.treasury, &fx.token), 2);

        let op = Operation::Wipe {
            account: fx.alice,
            token: fx.token,
            amount: 0,
            serials: vec![2, 2],
        };
        let sigs = signed(&[&fx.wipe_key], &op);
        let receipt = fx.ledger.apply(&op, fx.treasury, &sigs).unwrap();
        assert_eq!(receipt.status, Status::FailInvalid);

        // With both KYC gates open the duplicate itself is the denial
        let treasury = fx.treasury;
        let alice = fx.alice;
        grant_kyc(&mut fx, treasury);
        grant_kyc(&mut fx, alice);
        let op = Operation::Transfer {
            token: fx.token,
            sender: fx.treasury,
            receiver: fx.alice,
            amount: 0,
            serials: vec![1, 1],
        };
        let sigs = signed(&[&fx.treasury_key], &op);
        assert_eq!(
            fx.ledger.authorize(&op, &sigs),
            AuthResult::Forbidden(Status::FailInvalid)
        );
    }

    #[test]
    fn test_dissociate_reclaims_auto_association_slot() {
        let mut fx = fixture();
        let treasury = fx.treasury;
        let treasury_key = fx.treasury_key;
        let alice = fx.alice;
        let alice_key = fx.alice_key;
        let first = create_simple_token(&mut fx, "Silver", 100);
        let second = create_simple_token(&mut fx, "Copper", 100);

        let op = Operation::Transfer {
            token: first,
            sender: treasury,
            receiver: alice,
            amount: 10,
            serials: vec![],
        };
        let sigs = signed(&[&treasury_key], &op);
        assert_eq!(fx.ledger.apply(&op, treasury, &sigs).unwrap().status, Status::Ok);
        assert_eq!(fx.ledger.account(&alice).unwrap().used_auto_associations, 1);

        // Empty the holding, then give the relationship up
        let op = Operation::Transfer {
            token: first,
            sender: alice,
            receiver: treasury,
            amount: 10,
            serials: vec![],
        };
        let sigs = signed(&[&alice_key], &op);
        assert_eq!(fx.ledger.apply(&op, alice, &sigs).unwrap().status, Status::Ok);
        let op = Operation::Dissociate {
            account: alice,
            token: first,
        };
        let sigs = signed(&[&alice_key], &op);
        assert_eq!(fx.ledger.apply(&op, alice, &sigs).unwrap().status, Status::Ok);
        assert_eq!(fx.ledger.account(&alice).unwrap().used_auto_associations, 0);

        // The freed slot accepts a different token
        let op = Operation::Transfer {
            token: second,
            sender: treasury,
            receiver: alice,
            amount: 10,
            serials: vec![],
        };
        let sigs = signed(&[&treasury_key], &op);
        assert_eq!(fx.ledger.apply(&op, treasury, &sigs).unwrap().status, Status::Ok);
        assert_eq!(fx.ledger.balance_of(&alice, &second), 10);
    }

    #[test]
    fn test_failed_burn_leaves_circulation_unchanged() {
        let mut fx = fixture();
        mint_nft(&mut fx, 2);

        // Serial 9 does not exist; nothing may change
        let op = Operation::Burn {
            token: fx.token,
            amount: 0,
            serials: vec![1, 9],
        };
        let sigs = signed(&[&fx.supply_key], &op);
        let receipt = fx.ledger.apply(&op, fx.treasury, &sigs).unwrap();

        assert_eq!(receipt.status, Status::InvalidNftId);
        assert_eq!(fx.ledger.token_state(&fx.token).unwrap().circulation, 2);
        assert_eq!(fx.ledger.balance_of(&fx.treasury, &fx.token), 2);
    }
}
