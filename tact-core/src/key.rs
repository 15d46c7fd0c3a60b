use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// A 32-byte private key.
///
/// The concrete asymmetric primitive is out of scope; keys here are opaque
/// byte strings and the signature function is a deterministic SHA-256
/// construction with the same interface shape as a real signer.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKey([u8; 32]);

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        write!(f, "PrivateKey(..)")
    }
}

impl PrivateKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PrivateKey(bytes)
    }

    /// Derive a private key deterministically from a seed
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"TACT_PrivKey");
        hasher.update(seed);
        PrivateKey(hasher.finalize().into())
    }

    /// Derive the public key for this private key
    pub fn public_key(&self) -> PublicKey {
        let mut hasher = Sha256::new();
        hasher.update(b"TACT_PubKey");
        hasher.update(self.0);
        PublicKey(hasher.finalize().into())
    }

    /// Sign a message, producing a signature verifiable against the
    /// corresponding public key
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::create(&self.public_key(), message)
    }
}

/// A 32-byte public key, the leaf unit of an endorsement
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(&self.0[0..6]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key:{}", hex::encode(&self.0[0..6]))
    }
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        PublicKey(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check a signature over a message against this key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        Signature::create(self, message) == *signature
    }
}

/// A 32-byte signature over the canonical bytes of an operation
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature([u8; 32]);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(&self.0[0..6]))
    }
}

impl Signature {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Signature(bytes)
    }

    fn create(key: &PublicKey, message: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"TACT_Sig");
        hasher.update(key.0);
        hasher.update(message);
        Signature(hasher.finalize().into())
    }
}

/// A set of (public key, signature) pairs collected for one transaction.
///
/// Keys are unique; merging two sets is a union, so combining
/// contributions is associative and commutative regardless of the order
/// in which signers arrive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSet {
    signatures: BTreeMap<PublicKey, Signature>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature for a key. An existing entry for the same key is
    /// kept unchanged; duplicate keys cannot occur.
    pub fn insert(&mut self, key: PublicKey, signature: Signature) {
        self.signatures.entry(key).or_insert(signature);
    }

    /// Union-merge another set into this one
    pub fn merge(&mut self, other: SignatureSet) {
        for (key, signature) in other.signatures {
            self.insert(key, signature);
        }
    }

    /// The union of two sets, leaving both inputs untouched
    pub fn union(&self, other: &SignatureSet) -> SignatureSet {
        let mut merged = self.clone();
        merged.merge(other.clone());
        merged
    }

    /// Whether this set carries a signature for the given key
    pub fn contains(&self, key: &PublicKey) -> bool {
        self.signatures.contains_key(key)
    }

    pub fn get(&self, key: &PublicKey) -> Option<&Signature> {
        self.signatures.get(key)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, PublicKey, Signature> {
        self.signatures.iter()
    }

    /// Verify every signature in the set against the given message
    pub fn verify_all(&self, message: &[u8]) -> bool {
        self.signatures
            .iter()
            .all(|(key, signature)| key.verify(message, signature))
    }
}

impl FromIterator<(PublicKey, Signature)> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = (PublicKey, Signature)>>(iter: I) -> Self {
        let mut set = SignatureSet::new();
        for (key, signature) in iter {
            set.insert(key, signature);
        }
        set
    }
}
