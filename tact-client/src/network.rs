use crate::classifier::RawResponse;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tact_compliance::TokenLedger;
use tact_core::endorsement::Endorsement;
use tact_core::error::TactError;
use tact_core::id::AccountId;
use tact_core::key::SignatureSet;
use tact_core::operation::{Operation, Receipt, TransactionId};
use tact_core::status::Status;

/// Where signed operations go
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        op: &Operation,
        payer: AccountId,
        signatures: &SignatureSet,
    ) -> Result<RawResponse, TactError>;
}

/// Read access to the ledger's compliance rules, used when parking a
/// pending transaction to record what it will eventually need
pub trait LedgerView: Send + Sync {
    fn required_endorsements(&self, op: &Operation) -> Result<Vec<Endorsement>, Status>;
}

/// In-process network: one node, one ledger, receipts answered
/// synchronously at submission time
pub struct MockNetwork {
    ledger: Mutex<TokenLedger>,
    receipts: Mutex<HashMap<TransactionId, Receipt>>,
    /// Remaining submissions to refuse with Busy, for retry tests
    busy_rejections: Mutex<u32>,
}

impl MockNetwork {
    pub fn new(ledger: TokenLedger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            receipts: Mutex::new(HashMap::new()),
            busy_rejections: Mutex::new(0),
        }
    }

    /// Refuse the next `count` submissions with a Busy precheck
    pub fn inject_busy(&self, count: u32) {
        *self.busy_rejections.lock().unwrap() = count;
    }

    /// Run a closure against the ledger, for state inspection
    pub fn with_ledger<R>(&self, f: impl FnOnce(&TokenLedger) -> R) -> R {
        f(&self.ledger.lock().unwrap())
    }

    /// The stored receipt for an already submitted transaction
    pub fn receipt_of(&self, id: &TransactionId) -> Option<Receipt> {
        self.receipts.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl Submitter for MockNetwork {
    async fn submit(
        &self,
        op: &Operation,
        payer: AccountId,
        signatures: &SignatureSet,
    ) -> Result<RawResponse, TactError> {
        {
            let mut busy = self.busy_rejections.lock().unwrap();
            if *busy > 0 {
                *busy -= 1;
                return Ok(RawResponse {
                    precheck: Status::Busy,
                    receipt: None,
                });
            }
        }

        let receipt = self.ledger.lock().unwrap().apply(op, payer, signatures)?;
        self.receipts
            .lock()
            .unwrap()
            .insert(receipt.transaction_id, receipt.clone());
        Ok(RawResponse {
            precheck: Status::Ok,
            receipt: Some(receipt),
        })
    }
}

impl LedgerView for MockNetwork {
    fn required_endorsements(&self, op: &Operation) -> Result<Vec<Endorsement>, Status> {
        self.ledger.lock().unwrap().required_endorsements(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tact_compliance::AccountRecord;
    use tact_core::key::PrivateKey;

    #[tokio::test]
    async fn test_busy_injection_then_recovery() {
        let key = PrivateKey::from_seed(b"payer");
        let payer = AccountId::from_seed(b"payer");
        let mut ledger = TokenLedger::with_system_clock();
        ledger.register_account(AccountRecord::new(
            payer,
            Endorsement::leaf(key.public_key()),
        ));
        let network = MockNetwork::new(ledger);
        network.inject_busy(1);

        let op = Operation::Associate {
            account: payer,
            token: tact_core::id::TokenId::from_seed(b"none"),
        };
        let first = network.submit(&op, payer, &SignatureSet::new()).await.unwrap();
        assert_eq!(first.precheck, Status::Busy);
        assert!(first.receipt.is_none());

        let second = network.submit(&op, payer, &SignatureSet::new()).await.unwrap();
        assert_eq!(second.precheck, Status::Ok);
        // The token does not exist; the compliance verdict rides the receipt
        let receipt = second.receipt.unwrap();
        assert_eq!(receipt.status, Status::InvalidTokenId);
        assert_eq!(network.receipt_of(&receipt.transaction_id), Some(receipt));
    }
}
