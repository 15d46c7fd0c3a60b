use async_trait::async_trait;
use tact_core::error::TactError;
use tact_core::key::{PrivateKey, PublicKey, Signature};

/// An asynchronous co-signer outside this process: a hardware key, a
/// remote signing service, or a human approval step.
///
/// Implementations may suspend for as long as they need; the signatory
/// layer joins all sources concurrently and completes only when every one
/// has answered.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    /// The public key this signer signs with
    fn public_key(&self) -> PublicKey;

    /// Produce a signature over the canonical operation bytes
    async fn sign(&self, message: &[u8]) -> Result<Signature, TactError>;
}

/// An external signer backed by an in-process private key.
///
/// Useful in tests and demos wherever the async signer interface is
/// required but no remote party exists.
#[derive(Debug, Clone)]
pub struct InProcessSigner {
    key: PrivateKey,
}

impl InProcessSigner {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }
}

#[async_trait]
impl ExternalSigner for InProcessSigner {
    fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    async fn sign(&self, message: &[u8]) -> Result<Signature, TactError> {
        Ok(self.key.sign(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_process_signer_matches_direct_signing() {
        let key = PrivateKey::from_seed(b"signer");
        let signer = InProcessSigner::new(key);

        let signature = signer.sign(b"message").await.unwrap();
        assert_eq!(signature, key.sign(b"message"));
        assert_eq!(signer.public_key(), key.public_key());
    }
}
