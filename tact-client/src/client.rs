use crate::classifier::{classify, ExecutionOutcome};
use crate::config::{CallConfig, ClientDefaults, ResolvedConfig};
use crate::network::{LedgerView, Submitter};
use std::sync::Arc;
use tact_core::error::TactError;
use tact_core::id::{AccountId, PendingId, SerialNumber, TokenId};
use tact_core::key::SignatureSet;
use tact_core::operation::{Operation, Receipt, TokenCreateBody, TokenUpdateBody};
use tact_core::status::Status;
use tact_scheduler::{CreatePendingRequest, PendingCoordinator, PendingState};
use tact_signatory::{ResolveOutcome, Signatory};

/// What a submission produced: an executed receipt, or a pending
/// transaction id when the signatory deferred
#[derive(Debug, Clone)]
pub enum Submission {
    Executed(Receipt),
    Pending(PendingId),
}

impl Submission {
    /// The receipt, when execution actually happened
    pub fn receipt(self) -> Option<Receipt> {
        match self {
            Submission::Executed(receipt) => Some(receipt),
            Submission::Pending(_) => None,
        }
    }

    pub fn pending_id(&self) -> Option<PendingId> {
        match self {
            Submission::Executed(_) => None,
            Submission::Pending(id) => Some(*id),
        }
    }
}

/// High-level entry point for ledger operations.
///
/// Every operation follows the same path: encode, resolve the signatory
/// against the canonical bytes, then either submit with retry or park a
/// pending transaction. Rejected receipts surface as the templated
/// `TactError::Transaction`.
pub struct TokenClient<N: Submitter + LedgerView> {
    network: Arc<N>,
    coordinator: Arc<PendingCoordinator>,
    defaults: ClientDefaults,
}

impl<N: Submitter + LedgerView> TokenClient<N> {
    pub fn new(network: Arc<N>, coordinator: Arc<PendingCoordinator>, defaults: ClientDefaults) -> Self {
        Self {
            network,
            coordinator,
            defaults,
        }
    }

    pub async fn create_token(
        &self,
        body: TokenCreateBody,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Create(body), signatory, config).await
    }

    pub async fn mint(
        &self,
        token: TokenId,
        amount: u64,
        metadata: Vec<Vec<u8>>,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(
            Operation::Mint {
                token,
                amount,
                metadata,
            },
            signatory,
            config,
        )
        .await
    }

    pub async fn burn(
        &self,
        token: TokenId,
        amount: u64,
        serials: Vec<SerialNumber>,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(
            Operation::Burn {
                token,
                amount,
                serials,
            },
            signatory,
            config,
        )
        .await
    }

    pub async fn associate(
        &self,
        account: AccountId,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Associate { account, token }, signatory, config)
            .await
    }

    pub async fn dissociate(
        &self,
        account: AccountId,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Dissociate { account, token }, signatory, config)
            .await
    }

    pub async fn grant_kyc(
        &self,
        account: AccountId,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::GrantKyc { account, token }, signatory, config)
            .await
    }

    pub async fn revoke_kyc(
        &self,
        account: AccountId,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::RevokeKyc { account, token }, signatory, config)
            .await
    }

    pub async fn freeze(
        &self,
        account: AccountId,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Freeze { account, token }, signatory, config)
            .await
    }

    pub async fn unfreeze(
        &self,
        account: AccountId,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Unfreeze { account, token }, signatory, config)
            .await
    }

    pub async fn pause(
        &self,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Pause { token }, signatory, config).await
    }

    pub async fn unpause(
        &self,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Unpause { token }, signatory, config).await
    }

    pub async fn wipe(
        &self,
        account: AccountId,
        token: TokenId,
        amount: u64,
        serials: Vec<SerialNumber>,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(
            Operation::Wipe {
                account,
                token,
                amount,
                serials,
            },
            signatory,
            config,
        )
        .await
    }

    pub async fn transfer(
        &self,
        token: TokenId,
        sender: AccountId,
        receiver: AccountId,
        amount: u64,
        serials: Vec<SerialNumber>,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(
            Operation::Transfer {
                token,
                sender,
                receiver,
                amount,
                serials,
            },
            signatory,
            config,
        )
        .await
    }

    pub async fn update_token(
        &self,
        body: TokenUpdateBody,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Update(body), signatory, config).await
    }

    pub async fn delete_token(
        &self,
        token: TokenId,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        self.run(Operation::Delete { token }, signatory, config).await
    }

    /// Add a signatory's signatures to a parked transaction
    pub async fn sign_pending(
        &self,
        id: &PendingId,
        signatory: &Signatory,
    ) -> Result<PendingState, TactError> {
        let pending = self
            .coordinator
            .get(id)
            .ok_or(TactError::Precheck(Status::InvalidScheduleId))?;
        let message = pending.operation.signable_bytes()?;

        let collected = match signatory.resolve(&message).await? {
            ResolveOutcome::Complete(signatures) => signatures,
            // A co-signer's own scheduling intent is irrelevant here; only
            // its signatures matter
            ResolveOutcome::Deferred(request) => request.collected,
        };
        self.coordinator.submit_signatures(id, &collected)
    }

    /// Execute a pending transaction if it has turned Ready.
    ///
    /// Returns `None` while signatures are still being collected. At most
    /// one caller ever gets to execute a given pending transaction.
    pub async fn execute_pending(&self, id: &PendingId) -> Result<Option<Receipt>, TactError> {
        let Some(pending) = self.coordinator.take_ready(id)? else {
            return Ok(None);
        };

        let resolved = CallConfig::default().merged(&self.defaults);
        let receipt = self
            .submit_with_retry(&pending.operation, pending.payer, &pending.collected, &resolved)
            .await?;
        Ok(Some(receipt))
    }

    async fn run(
        &self,
        op: Operation,
        signatory: &Signatory,
        config: CallConfig,
    ) -> Result<Submission, TactError> {
        let resolved = config.merged(&self.defaults);
        let message = op.signable_bytes()?;

        match signatory.resolve(&message).await? {
            ResolveOutcome::Complete(signatures) => {
                let receipt = self
                    .submit_with_retry(&op, resolved.payer, &signatures, &resolved)
                    .await?;
                Ok(Submission::Executed(receipt))
            }
            ResolveOutcome::Deferred(request) => {
                let required = self
                    .network
                    .required_endorsements(&op)
                    .map_err(TactError::Precheck)?;
                let id = self.coordinator.create(CreatePendingRequest {
                    payer: request.payer,
                    operation: op,
                    required,
                    initial_signatures: request.collected,
                    expiration: request.expiration,
                    memo: request.memo,
                })?;
                Ok(Submission::Pending(id))
            }
        }
    }

    async fn submit_with_retry(
        &self,
        op: &Operation,
        payer: AccountId,
        signatures: &SignatureSet,
        resolved: &ResolvedConfig,
    ) -> Result<Receipt, TactError> {
        let mut last = Status::TransactionExpired;

        for attempt in 0..resolved.max_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(resolved.retry_delay).await;
            }

            let response = self.network.submit(op, payer, signatures).await?;
            match classify(response) {
                ExecutionOutcome::Applied(receipt) => return Ok(receipt),
                ExecutionOutcome::Rejected(receipt) => {
                    return Err(TactError::transaction(op.kind(), receipt.status, receipt));
                }
                ExecutionOutcome::PrecheckFailed(status) => {
                    return Err(TactError::Precheck(status));
                }
                ExecutionOutcome::Retry(status) => {
                    log::warn!(
                        "attempt {}/{} for {:?} hit {}, retrying",
                        attempt + 1,
                        resolved.max_attempts,
                        op.kind(),
                        status
                    );
                    last = status;
                }
            }
        }
        Err(TactError::Consensus(last))
    }
}
