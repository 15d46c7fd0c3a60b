use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tact_core::clock::Clock;
use tact_core::endorsement::Endorsement;
use tact_core::error::TactError;
use tact_core::id::{AccountId, EntityId, PendingId};
use tact_core::key::SignatureSet;
use tact_core::operation::{Operation, OperationKind, TransactionId};
use tact_core::status::Status;

/// Lifecycle of a pending transaction.
///
/// Collecting moves to Ready when every required endorsement is
/// satisfied, or to Expired when the deadline passes first. Ready moves
/// to Executed exactly once. Executed and Expired are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingState {
    Collecting,
    Ready,
    Executed,
    Expired,
}

/// A parked operation waiting for co-signers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: PendingId,
    pub payer: AccountId,
    pub operation: Operation,
    /// Endorsements that must all be satisfied before execution
    pub required: Vec<Endorsement>,
    pub collected: SignatureSet,
    pub expiration: DateTime<Utc>,
    pub memo: String,
    pub state: PendingState,
    pub transaction_id: TransactionId,
}

impl PendingTransaction {
    fn all_satisfied(&self) -> bool {
        self.required
            .iter()
            .all(|endorsement| endorsement.is_satisfied(&self.collected))
    }
}

/// Everything needed to park an operation
#[derive(Debug, Clone)]
pub struct CreatePendingRequest {
    pub payer: AccountId,
    pub operation: Operation,
    pub required: Vec<Endorsement>,
    /// Signatures gathered before deferral; counted immediately
    pub initial_signatures: SignatureSet,
    pub expiration: DateTime<Utc>,
    pub memo: String,
}

/// Registry of pending transactions.
///
/// Each entry sits behind its own lock, so signature submissions for
/// different pending transactions never contend, while submissions for
/// the same one serialize into a single writer at a time.
pub struct PendingCoordinator {
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<PendingId, Arc<Mutex<PendingTransaction>>>>,
}

impl PendingCoordinator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Only value-moving operations may be deferred
    pub fn is_schedulable(kind: OperationKind) -> bool {
        matches!(
            kind,
            OperationKind::Transfer | OperationKind::Mint | OperationKind::Burn
        )
    }

    /// Park an operation for co-signing.
    ///
    /// The eligibility check runs before anything is recorded: a rejected
    /// request leaves no trace in the registry.
    pub fn create(&self, request: CreatePendingRequest) -> Result<PendingId, TactError> {
        if !Self::is_schedulable(request.operation.kind()) {
            return Err(TactError::Precheck(
                Status::ScheduledTransactionNotInWhitelist,
            ));
        }
        if request.expiration <= self.clock.now() {
            return Err(TactError::Precheck(Status::InvalidExpirationTime));
        }
        let message = request.operation.signable_bytes()?;
        if !request.initial_signatures.verify_all(&message) {
            return Err(TactError::Precheck(Status::InvalidSignature));
        }

        let transaction_id = request.operation.transaction_id(request.payer)?;
        let (eid, _) = EntityId::find_eid(&[b"pending", &transaction_id.0]);
        let id = PendingId::new(eid);

        let mut pending = PendingTransaction {
            id,
            payer: request.payer,
            operation: request.operation,
            required: request.required,
            collected: request.initial_signatures,
            expiration: request.expiration,
            memo: request.memo,
            state: PendingState::Collecting,
            transaction_id,
        };
        if pending.all_satisfied() {
            pending.state = PendingState::Ready;
        }

        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&id) {
            // Same payer, same operation bytes: an identical pending
            // transaction already exists
            return Err(TactError::Precheck(Status::FailInvalid));
        }
        log::info!("parked {} as {}", transaction_id, id);
        entries.insert(id, Arc::new(Mutex::new(pending)));
        Ok(id)
    }

    fn entry(&self, id: &PendingId) -> Result<Arc<Mutex<PendingTransaction>>, TactError> {
        self.entries
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(TactError::Precheck(Status::InvalidScheduleId))
    }

    /// Expiration is decided lazily, whenever an entry is next touched
    fn expire_if_due(pending: &mut PendingTransaction, now: DateTime<Utc>) {
        if pending.state == PendingState::Collecting && now >= pending.expiration {
            pending.state = PendingState::Expired;
            log::info!("{} expired before collecting enough signatures", pending.id);
        }
    }

    /// Add signatures to a pending transaction and report its state.
    ///
    /// Co-signatures that do not verify against the parked operation's
    /// canonical bytes are refused whole; nothing enters `collected`
    /// unverified.
    pub fn submit_signatures(
        &self,
        id: &PendingId,
        signatures: &SignatureSet,
    ) -> Result<PendingState, TactError> {
        let entry = self.entry(id)?;
        let mut pending = entry.lock().unwrap();
        Self::expire_if_due(&mut pending, self.clock.now());

        match pending.state {
            PendingState::Executed => {
                Err(TactError::Precheck(Status::ScheduleAlreadyExecuted))
            }
            PendingState::Expired => Err(TactError::Precheck(Status::ScheduleAlreadyExpired)),
            PendingState::Collecting | PendingState::Ready => {
                let message = pending.operation.signable_bytes()?;
                if !signatures.verify_all(&message) {
                    return Err(TactError::Precheck(Status::InvalidSignature));
                }
                pending.collected.merge(signatures.clone());
                if pending.state == PendingState::Collecting && pending.all_satisfied() {
                    pending.state = PendingState::Ready;
                }
                Ok(pending.state)
            }
        }
    }

    pub fn is_ready(&self, id: &PendingId) -> Result<bool, TactError> {
        let entry = self.entry(id)?;
        let mut pending = entry.lock().unwrap();
        Self::expire_if_due(&mut pending, self.clock.now());
        Ok(pending.state == PendingState::Ready)
    }

    /// Claim a Ready pending transaction for execution.
    ///
    /// Returns a snapshot of the entry and marks it Executed; exactly one
    /// caller can win the claim. Returns `None` while still collecting and
    /// after execution, so a duplicate claim is a no-op rather than an
    /// error.
    pub fn take_ready(&self, id: &PendingId) -> Result<Option<PendingTransaction>, TactError> {
        let entry = self.entry(id)?;
        let mut pending = entry.lock().unwrap();
        Self::expire_if_due(&mut pending, self.clock.now());

        match pending.state {
            PendingState::Collecting | PendingState::Executed => Ok(None),
            PendingState::Ready => {
                pending.state = PendingState::Executed;
                Ok(Some(pending.clone()))
            }
            PendingState::Expired => Err(TactError::Precheck(Status::ScheduleAlreadyExpired)),
        }
    }

    /// Snapshot of one pending transaction
    pub fn get(&self, id: &PendingId) -> Option<PendingTransaction> {
        let entry = self.entries.lock().unwrap().get(id).cloned()?;
        let snapshot = entry.lock().unwrap().clone();
        Some(snapshot)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tact_core::clock::ManualClock;
    use tact_core::id::TokenId;
    use tact_core::key::PrivateKey;

    fn transfer_op(note: u8) -> Operation {
        Operation::Transfer {
            token: TokenId::from_seed(&[note]),
            sender: AccountId::from_seed(b"sender"),
            receiver: AccountId::from_seed(b"receiver"),
            amount: 10,
            serials: vec![],
        }
    }

    fn sign(key: &PrivateKey, op: &Operation) -> SignatureSet {
        let message = op.signable_bytes().unwrap();
        let mut set = SignatureSet::new();
        set.insert(key.public_key(), key.sign(&message));
        set
    }

    struct Setup {
        clock: Arc<ManualClock>,
        coordinator: PendingCoordinator,
        keys: Vec<PrivateKey>,
        op: Operation,
        id: PendingId,
    }

    /// A 2-of-3 transfer parked with no signatures collected yet
    fn setup() -> Setup {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let coordinator = PendingCoordinator::new(clock.clone());
        let keys: Vec<PrivateKey> = (0..3)
            .map(|i| PrivateKey::from_seed(&[i as u8]))
            .collect();
        let required = Endorsement::threshold(
            2,
            keys.iter()
                .map(|k| Endorsement::leaf(k.public_key()))
                .collect(),
        )
        .unwrap();

        let op = transfer_op(1);
        let id = coordinator
            .create(CreatePendingRequest {
                payer: AccountId::from_seed(b"payer"),
                operation: op.clone(),
                required: vec![required],
                initial_signatures: SignatureSet::new(),
                expiration: clock.now() + Duration::minutes(30),
                memo: String::new(),
            })
            .unwrap();

        Setup {
            clock,
            coordinator,
            keys,
            op,
            id,
        }
    }

    #[test]
    fn test_collects_until_threshold_then_ready() {
        let s = setup();
        assert!(!s.coordinator.is_ready(&s.id).unwrap());

        let state = s
            .coordinator
            .submit_signatures(&s.id, &sign(&s.keys[0], &s.op))
            .unwrap();
        assert_eq!(state, PendingState::Collecting);
        assert!(s.coordinator.take_ready(&s.id).unwrap().is_none());

        let state = s
            .coordinator
            .submit_signatures(&s.id, &sign(&s.keys[1], &s.op))
            .unwrap();
        assert_eq!(state, PendingState::Ready);

        let claimed = s.coordinator.take_ready(&s.id).unwrap().unwrap();
        assert_eq!(claimed.state, PendingState::Executed);
        assert_eq!(claimed.collected.len(), 2);
    }

    #[test]
    fn test_duplicate_signature_does_not_advance() {
        let s = setup();
        let sig = sign(&s.keys[0], &s.op);
        s.coordinator.submit_signatures(&s.id, &sig).unwrap();
        let state = s.coordinator.submit_signatures(&s.id, &sig).unwrap();
        assert_eq!(state, PendingState::Collecting);
    }

    #[test]
    fn test_whitelist_rejection_creates_nothing() {
        let s = setup();
        let result = s.coordinator.create(CreatePendingRequest {
            payer: AccountId::from_seed(b"payer"),
            operation: Operation::Pause {
                token: TokenId::from_seed(b"gold"),
            },
            required: vec![],
            initial_signatures: SignatureSet::new(),
            expiration: s.clock.now() + Duration::minutes(30),
            memo: String::new(),
        });

        assert_eq!(
            result.unwrap_err().status(),
            Some(Status::ScheduledTransactionNotInWhitelist)
        );
        // Only the entry from setup exists
        assert_eq!(s.coordinator.pending_count(), 1);
    }

    #[test]
    fn test_identical_pending_transaction_rejected() {
        let s = setup();
        let result = s.coordinator.create(CreatePendingRequest {
            payer: AccountId::from_seed(b"payer"),
            operation: s.op.clone(),
            required: vec![],
            initial_signatures: SignatureSet::new(),
            expiration: s.clock.now() + Duration::minutes(5),
            memo: String::new(),
        });
        assert_eq!(result.unwrap_err().status(), Some(Status::FailInvalid));
    }

    #[test]
    fn test_expiration_is_lazy_and_terminal() {
        let s = setup();
        s.coordinator
            .submit_signatures(&s.id, &sign(&s.keys[0], &s.op))
            .unwrap();

        s.clock.advance(Duration::minutes(31));

        let err = s
            .coordinator
            .submit_signatures(&s.id, &sign(&s.keys[1], &s.op))
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::ScheduleAlreadyExpired));
        assert_eq!(s.coordinator.get(&s.id).unwrap().state, PendingState::Expired);

        let err = s.coordinator.take_ready(&s.id).unwrap_err();
        assert_eq!(err.status(), Some(Status::ScheduleAlreadyExpired));
    }

    #[test]
    fn test_ready_entry_does_not_expire() {
        let s = setup();
        s.coordinator
            .submit_signatures(&s.id, &sign(&s.keys[0], &s.op))
            .unwrap();
        s.coordinator
            .submit_signatures(&s.id, &sign(&s.keys[1], &s.op))
            .unwrap();

        // Ready before the deadline stays claimable after it
        s.clock.advance(Duration::minutes(31));
        assert!(s.coordinator.is_ready(&s.id).unwrap());
        assert!(s.coordinator.take_ready(&s.id).unwrap().is_some());
    }

    #[test]
    fn test_execute_exactly_once() {
        let s = setup();
        s.coordinator
            .submit_signatures(&s.id, &sign(&s.keys[0], &s.op))
            .unwrap();
        s.coordinator
            .submit_signatures(&s.id, &sign(&s.keys[1], &s.op))
            .unwrap();

        assert!(s.coordinator.take_ready(&s.id).unwrap().is_some());
        // Losing a duplicate claim is a no-op
        assert!(s.coordinator.take_ready(&s.id).unwrap().is_none());

        let err = s
            .coordinator
            .submit_signatures(&s.id, &sign(&s.keys[2], &s.op))
            .unwrap_err();
        assert_eq!(err.status(), Some(Status::ScheduleAlreadyExecuted));
    }

    #[test]
    fn test_unverifiable_co_signature_is_refused() {
        let s = setup();
        // Right key, wrong bytes: signed over a different operation
        let mut sigs = SignatureSet::new();
        sigs.insert(s.keys[0].public_key(), s.keys[0].sign(b"something else"));

        let err = s.coordinator.submit_signatures(&s.id, &sigs).unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidSignature));
        assert!(s.coordinator.get(&s.id).unwrap().collected.is_empty());

        let result = s.coordinator.create(CreatePendingRequest {
            payer: AccountId::from_seed(b"other-payer"),
            operation: s.op.clone(),
            required: vec![],
            initial_signatures: sigs,
            expiration: s.clock.now() + Duration::minutes(5),
            memo: String::new(),
        });
        assert_eq!(result.unwrap_err().status(), Some(Status::InvalidSignature));
    }

    #[test]
    fn test_unknown_id() {
        let s = setup();
        let bogus = PendingId::new(EntityId::new([9; 32]));
        let err = s.coordinator.is_ready(&bogus).unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidScheduleId));
    }

    #[test]
    fn test_initial_signatures_can_satisfy_immediately() {
        let s = setup();
        let op = transfer_op(2);
        let solo = PrivateKey::from_seed(b"solo");
        let id = s
            .coordinator
            .create(CreatePendingRequest {
                payer: AccountId::from_seed(b"payer"),
                operation: op.clone(),
                required: vec![Endorsement::leaf(solo.public_key())],
                initial_signatures: sign(&solo, &op),
                expiration: s.clock.now() + Duration::minutes(5),
                memo: String::new(),
            })
            .unwrap();
        assert!(s.coordinator.is_ready(&id).unwrap());
    }

    #[test]
    fn test_concurrent_co_signers() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let coordinator = Arc::new(PendingCoordinator::new(clock.clone()));
        let keys: Vec<PrivateKey> = (0..8)
            .map(|i| PrivateKey::from_seed(&[100 + i as u8]))
            .collect();
        let required = Endorsement::all_of(
            keys.iter()
                .map(|k| Endorsement::leaf(k.public_key()))
                .collect(),
        )
        .unwrap();

        let op = transfer_op(3);
        let id = coordinator
            .create(CreatePendingRequest {
                payer: AccountId::from_seed(b"payer"),
                operation: op.clone(),
                required: vec![required],
                initial_signatures: SignatureSet::new(),
                expiration: clock.now() + Duration::minutes(30),
                memo: String::new(),
            })
            .unwrap();

        let handles: Vec<_> = keys
            .iter()
            .map(|key| {
                let coordinator = coordinator.clone();
                let sigs = sign(key, &op);
                std::thread::spawn(move || {
                    coordinator.submit_signatures(&id, &sigs).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(coordinator.is_ready(&id).unwrap());
        assert_eq!(coordinator.get(&id).unwrap().collected.len(), 8);
    }
}
