use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

/// Serial number of one non-fungible asset instance within a token type
pub type SerialNumber = u64;

// EntityId uniquely identifies an addressable entity on the ledger
// (account, token, pending transaction). It is a 32 byte identifier,
// resembling a public key but guaranteed to be off the ed25519 curve so
// it can never collide with real key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId([u8; 32]);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as a hex string with a prefix of the first 6 bytes
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "ent:{}", prefix)
    }
}

impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId([0; 32])
    }
}

impl Deref for EntityId {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl EntityId {
    pub fn new(uid: [u8; 32]) -> Self {
        EntityId(uid)
    }

    /// Create an EntityId from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        EntityId(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn create_entity_id(seeds: &[&[u8]], bump: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"TACT_Entity");

        // Add all seeds
        for seed in seeds {
            hasher.update(seed);
        }

        // Add bump
        hasher.update([bump]);

        hasher.finalize().into()
    }

    /// Verify that a 32-byte array is not a valid point on the ed25519 curve
    ///
    /// Returns true if the bytes do not represent a valid curve point.
    /// Returns false if the bytes do represent a valid curve point.
    pub fn is_off_curve(bytes: &[u8; 32]) -> bool {
        let Ok(compressed_edwards_y) = CompressedEdwardsY::from_slice(bytes.as_ref()) else {
            return true; // Cannot even parse as a point format, so it's off-curve
        };
        compressed_edwards_y.decompress().is_none()
    }

    /// Try to find an EntityId for given seeds
    pub fn try_find_eid(seeds: &[&[u8]]) -> Option<(EntityId, u8)> {
        for bump in 0..255 {
            let id = EntityId::create_entity_id(seeds, bump);
            if EntityId::is_off_curve(&id) {
                return Some((EntityId(id), bump));
            }
        }
        None
    }

    /// Find an EntityId for given seeds
    pub fn find_eid(seeds: &[&[u8]]) -> (EntityId, u8) {
        EntityId::try_find_eid(seeds).expect("Failed to find a valid EntityId")
    }

    /// Generate a unique EntityId for testing purposes
    pub fn unique_id_for_tests() -> Self {
        // Use current timestamp as basis for uniqueness
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("Time went backwards")
            .as_nanos()
            .to_le_bytes();

        let ts_slice = timestamp.as_slice();
        let extra = [1, 2, 3, 4];

        let (id, _) = EntityId::find_eid(&[ts_slice, &extra]);
        id
    }
}

/// Identifies an account on the ledger
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct AccountId(pub EntityId);

impl AccountId {
    pub fn new(id: EntityId) -> Self {
        AccountId(id)
    }

    pub fn from_seed(seed: &[u8]) -> Self {
        let (id, _) = EntityId::find_eid(&[b"account", seed]);
        AccountId(id)
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acct:{}", hex::encode(&self.0 .0[0..6]))
    }
}

/// Identifies a token type on the ledger
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct TokenId(pub EntityId);

impl TokenId {
    pub fn new(id: EntityId) -> Self {
        TokenId(id)
    }

    pub fn from_seed(seed: &[u8]) -> Self {
        let (id, _) = EntityId::find_eid(&[b"token", seed]);
        TokenId(id)
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tok:{}", hex::encode(&self.0 .0[0..6]))
    }
}

/// Identifies a pending (scheduled) transaction awaiting co-signers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct PendingId(pub EntityId);

impl PendingId {
    pub fn new(id: EntityId) -> Self {
        PendingId(id)
    }

    pub fn entity_id(&self) -> &EntityId {
        &self.0
    }
}

impl fmt::Display for PendingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pend:{}", hex::encode(&self.0 .0[0..6]))
    }
}

/// Identifies one non-fungible asset instance: a token type plus a serial
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NftId {
    pub token: TokenId,
    pub serial: SerialNumber,
}

impl NftId {
    pub fn new(token: TokenId, serial: SerialNumber) -> Self {
        Self { token, serial }
    }
}

impl fmt::Display for NftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token, self.serial)
    }
}
