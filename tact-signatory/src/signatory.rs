use crate::signer::ExternalSigner;
use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;
use tact_core::error::TactError;
use tact_core::id::AccountId;
use tact_core::key::{PrivateKey, SignatureSet};

/// One contributor of signatures inside a Signatory
#[derive(Clone)]
pub enum SigningSource {
    /// A private key held in this process
    Key(PrivateKey),
    /// An asynchronous external co-signer
    External(Arc<dyn ExternalSigner>),
    /// A nested signatory whose contribution is the union of its own
    /// sources
    Nested(Signatory),
}

impl fmt::Debug for SigningSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningSource::Key(_) => write!(f, "SigningSource::Key(..)"),
            SigningSource::External(signer) => {
                write!(f, "SigningSource::External({})", signer.public_key())
            }
            SigningSource::Nested(inner) => write!(f, "SigningSource::Nested({:?})", inner),
        }
    }
}

/// Intent to defer execution: rather than satisfying the required
/// endorsements now, create a pending transaction for later co-signing
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulingIntent {
    /// Account that pays for the pending transaction
    pub payer: AccountId,
    /// When the pending transaction stops accepting signatures
    pub expiration: DateTime<Utc>,
    pub memo: String,
}

/// The outcome of resolving a signatory
#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    /// Every source contributed; the union set is ready for submission
    Complete(SignatureSet),
    /// A scheduling intent was present; execution is deferred
    Deferred(PendingRequest),
}

/// What the scheduling layer needs to create a pending transaction
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub payer: AccountId,
    pub expiration: DateTime<Utc>,
    pub memo: String,
    /// Signatures already gathered from this signatory's sources; they
    /// seed the pending transaction's collected set
    pub collected: SignatureSet,
}

/// A composable resolver of concrete signatures for one operation.
///
/// A signatory is an ordered list of signing sources plus an optional
/// scheduling intent. Sources are independent; their contributions are
/// merged by set union, so they are resolved concurrently.
#[derive(Debug, Clone, Default)]
pub struct Signatory {
    sources: Vec<SigningSource>,
    scheduling: Option<SchedulingIntent>,
}

impl Signatory {
    /// A signatory with no sources. Legal: it resolves to the empty set,
    /// for operations that need no signer beyond the implicit payer.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_key(key: PrivateKey) -> Self {
        Self {
            sources: vec![SigningSource::Key(key)],
            scheduling: None,
        }
    }

    pub fn from_external(signer: Arc<dyn ExternalSigner>) -> Self {
        Self {
            sources: vec![SigningSource::External(signer)],
            scheduling: None,
        }
    }

    pub fn and_key(mut self, key: PrivateKey) -> Self {
        self.sources.push(SigningSource::Key(key));
        self
    }

    pub fn and_external(mut self, signer: Arc<dyn ExternalSigner>) -> Self {
        self.sources.push(SigningSource::External(signer));
        self
    }

    pub fn and_nested(mut self, inner: Signatory) -> Self {
        self.sources.push(SigningSource::Nested(inner));
        self
    }

    /// Attach a scheduling intent; resolution will always defer
    pub fn with_scheduling(mut self, intent: SchedulingIntent) -> Self {
        self.scheduling = Some(intent);
        self
    }

    pub fn scheduling(&self) -> Option<&SchedulingIntent> {
        self.scheduling.as_ref()
    }

    pub fn sources(&self) -> &[SigningSource] {
        &self.sources
    }

    /// Resolve this signatory against the canonical bytes of an operation.
    ///
    /// All sources run concurrently and their signature sets are merged by
    /// union, so the result is independent of source order and of
    /// sequential-versus-concurrent execution. With a scheduling intent
    /// present the outcome is always `Deferred`, carrying whatever
    /// signatures the non-scheduled sources produced.
    pub async fn resolve(&self, message: &[u8]) -> Result<ResolveOutcome, TactError> {
        let collected = self.gather(message).await?;

        match &self.scheduling {
            Some(intent) => Ok(ResolveOutcome::Deferred(PendingRequest {
                payer: intent.payer,
                expiration: intent.expiration,
                memo: intent.memo.clone(),
                collected,
            })),
            None => Ok(ResolveOutcome::Complete(collected)),
        }
    }

    /// Union of every source's contribution. Nested signatories contribute
    /// their sources' signatures only; a nested scheduling intent does not
    /// defer the outer resolution.
    fn gather<'a>(&'a self, message: &'a [u8]) -> BoxFuture<'a, Result<SignatureSet, TactError>> {
        async move {
            let futures: Vec<BoxFuture<'a, Result<SignatureSet, TactError>>> = self
                .sources
                .iter()
                .map(|source| match source {
                    SigningSource::Key(key) => {
                        let mut set = SignatureSet::new();
                        set.insert(key.public_key(), key.sign(message));
                        future::ready(Ok(set)).boxed()
                    }
                    SigningSource::External(signer) => {
                        let signer = Arc::clone(signer);
                        async move {
                            let signature = signer.sign(message).await?;
                            let mut set = SignatureSet::new();
                            set.insert(signer.public_key(), signature);
                            Ok(set)
                        }
                        .boxed()
                    }
                    SigningSource::Nested(inner) => inner.gather(message),
                })
                .collect();

            let sets = future::try_join_all(futures).await?;

            let mut merged = SignatureSet::new();
            for set in sets {
                merged.merge(set);
            }
            Ok(merged)
        }
        .boxed()
    }
}
