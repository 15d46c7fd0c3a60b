use tact_core::operation::Receipt;
use tact_core::status::Status;

/// What came back from one submission attempt: the node's synchronous
/// precheck verdict, and the consensus receipt when one was produced
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub precheck: Status,
    pub receipt: Option<Receipt>,
}

/// Classification of one submission attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Consensus reached and the operation was applied
    Applied(Receipt),
    /// Consensus reached but the operation was semantically rejected;
    /// retrying the same bytes cannot succeed
    Rejected(Receipt),
    /// The node refused the submission before consensus
    PrecheckFailed(Status),
    /// Transient failure; the whole operation may be resubmitted
    Retry(Status),
}

/// Map a raw response onto the retry/rejection taxonomy.
///
/// Pure: same response, same outcome. The precheck verdict is consulted
/// first; a receipt is only meaningful when the submission was taken up.
pub fn classify(response: RawResponse) -> ExecutionOutcome {
    if response.precheck.is_transient() {
        return ExecutionOutcome::Retry(response.precheck);
    }
    if !response.precheck.is_success() {
        return ExecutionOutcome::PrecheckFailed(response.precheck);
    }

    match response.receipt {
        // Taken up but no receipt: consensus never happened
        None => ExecutionOutcome::Retry(Status::TransactionExpired),
        Some(receipt) if receipt.status.is_transient() => ExecutionOutcome::Retry(receipt.status),
        Some(receipt) if receipt.is_success() => ExecutionOutcome::Applied(receipt),
        Some(receipt) => ExecutionOutcome::Rejected(receipt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tact_core::operation::TransactionId;

    fn receipt(status: Status) -> Receipt {
        Receipt::new(TransactionId([3; 32]), status, Utc::now())
    }

    #[test]
    fn test_busy_precheck_retries() {
        let outcome = classify(RawResponse {
            precheck: Status::Busy,
            receipt: None,
        });
        assert_eq!(outcome, ExecutionOutcome::Retry(Status::Busy));
    }

    #[test]
    fn test_precheck_rejection_is_terminal() {
        let outcome = classify(RawResponse {
            precheck: Status::InvalidSignature,
            receipt: None,
        });
        assert_eq!(
            outcome,
            ExecutionOutcome::PrecheckFailed(Status::InvalidSignature)
        );
    }

    #[test]
    fn test_missing_receipt_retries_as_expired() {
        let outcome = classify(RawResponse {
            precheck: Status::Ok,
            receipt: None,
        });
        assert_eq!(outcome, ExecutionOutcome::Retry(Status::TransactionExpired));
    }

    #[test]
    fn test_receipt_splits_applied_from_rejected() {
        let ok = classify(RawResponse {
            precheck: Status::Ok,
            receipt: Some(receipt(Status::Ok)),
        });
        assert!(matches!(ok, ExecutionOutcome::Applied(_)));

        let rejected = classify(RawResponse {
            precheck: Status::Ok,
            receipt: Some(receipt(Status::TokenMaxSupplyReached)),
        });
        match rejected {
            ExecutionOutcome::Rejected(r) => assert_eq!(r.status, Status::TokenMaxSupplyReached),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_transient_receipt_status_retries() {
        let outcome = classify(RawResponse {
            precheck: Status::Ok,
            receipt: Some(receipt(Status::TransactionExpired)),
        });
        assert_eq!(outcome, ExecutionOutcome::Retry(Status::TransactionExpired));
    }

    #[test]
    fn test_classification_is_pure() {
        let response = RawResponse {
            precheck: Status::Ok,
            receipt: Some(receipt(Status::Ok)),
        };
        assert_eq!(classify(response.clone()), classify(response));
    }
}
