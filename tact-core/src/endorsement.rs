use crate::error::TactError;
use crate::key::{PublicKey, SignatureSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A threshold public-key signing requirement, possibly nested.
///
/// An endorsement is a closed sum type: either a single key, or an
/// "N of M" node over child endorsements. It is immutable once built and
/// compared by structural equality. Evaluation is a single exhaustive
/// recursive match over the tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Endorsement {
    /// Satisfied iff the key has a signature in the set
    Leaf(PublicKey),

    /// Satisfied iff at least `required` children are satisfied
    Threshold {
        required: u32,
        children: Vec<Endorsement>,
    },
}

impl Endorsement {
    /// A single-key endorsement
    pub fn leaf(key: PublicKey) -> Self {
        Endorsement::Leaf(key)
    }

    /// An "N of M" endorsement over child endorsements.
    ///
    /// Construction fails unless `1 <= required <= children.len()`.
    pub fn threshold(required: u32, children: Vec<Endorsement>) -> Result<Self, TactError> {
        if required == 0 || required as usize > children.len() {
            return Err(TactError::Argument(format!(
                "threshold of {} is not satisfiable by {} children",
                required,
                children.len()
            )));
        }
        Ok(Endorsement::Threshold { required, children })
    }

    /// An endorsement requiring every child
    pub fn all_of(children: Vec<Endorsement>) -> Result<Self, TactError> {
        let required = children.len() as u32;
        Endorsement::threshold(required, children)
    }

    /// An endorsement requiring any single child
    pub fn any_of(children: Vec<Endorsement>) -> Result<Self, TactError> {
        Endorsement::threshold(1, children)
    }

    /// Evaluate this endorsement against a set of collected signatures.
    ///
    /// Pure and deterministic. Every child is evaluated against the same
    /// set independently, so the result does not depend on child ordering.
    pub fn is_satisfied(&self, signatures: &SignatureSet) -> bool {
        match self {
            Endorsement::Leaf(key) => signatures.contains(key),
            Endorsement::Threshold { required, children } => {
                let satisfied = children
                    .iter()
                    .filter(|child| child.is_satisfied(signatures))
                    .count();
                satisfied as u32 >= *required
            }
        }
    }

    /// All distinct keys mentioned anywhere in the tree
    pub fn signers(&self) -> BTreeSet<PublicKey> {
        let mut keys = BTreeSet::new();
        self.collect_signers(&mut keys);
        keys
    }

    fn collect_signers(&self, keys: &mut BTreeSet<PublicKey>) {
        match self {
            Endorsement::Leaf(key) => {
                keys.insert(*key);
            }
            Endorsement::Threshold { children, .. } => {
                for child in children {
                    child.collect_signers(keys);
                }
            }
        }
    }
}

impl From<PublicKey> for Endorsement {
    fn from(key: PublicKey) -> Self {
        Endorsement::Leaf(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::PrivateKey;

    fn keys(n: usize) -> Vec<PrivateKey> {
        (0..n)
            .map(|i| PrivateKey::from_seed(format!("key-{}", i).as_bytes()))
            .collect()
    }

    fn sign_with(keys: &[PrivateKey], message: &[u8]) -> SignatureSet {
        keys.iter()
            .map(|k| (k.public_key(), k.sign(message)))
            .collect()
    }

    #[test]
    fn test_leaf_satisfaction() {
        let key = PrivateKey::from_seed(b"only");
        let endorsement = Endorsement::leaf(key.public_key());

        assert!(endorsement.is_satisfied(&sign_with(&[key], b"m")));
        assert!(!endorsement.is_satisfied(&SignatureSet::new()));
    }

    #[test]
    fn test_threshold_construction_bounds() {
        let ks = keys(3);
        let children: Vec<Endorsement> =
            ks.iter().map(|k| Endorsement::leaf(k.public_key())).collect();

        assert!(Endorsement::threshold(0, children.clone()).is_err());
        assert!(Endorsement::threshold(4, children.clone()).is_err());
        assert!(Endorsement::threshold(1, vec![]).is_err());
        assert!(Endorsement::threshold(3, children).is_ok());
    }

    #[test]
    fn test_threshold_boundary() {
        // For every r in 1..=n: r distinct signers satisfy, r - 1 do not
        let ks = keys(5);
        let children: Vec<Endorsement> =
            ks.iter().map(|k| Endorsement::leaf(k.public_key())).collect();

        for required in 1..=5u32 {
            let endorsement = Endorsement::threshold(required, children.clone()).unwrap();

            let enough = sign_with(&ks[..required as usize], b"m");
            assert!(endorsement.is_satisfied(&enough));

            let short = sign_with(&ks[..(required - 1) as usize], b"m");
            assert!(!endorsement.is_satisfied(&short));
        }
    }

    #[test]
    fn test_satisfaction_is_order_independent() {
        let ks = keys(4);
        let forward: Vec<Endorsement> =
            ks.iter().map(|k| Endorsement::leaf(k.public_key())).collect();
        let mut backward = forward.clone();
        backward.reverse();

        let sigs = sign_with(&ks[1..3], b"m");

        let a = Endorsement::threshold(2, forward).unwrap();
        let b = Endorsement::threshold(2, backward).unwrap();
        assert_eq!(a.is_satisfied(&sigs), b.is_satisfied(&sigs));
    }

    #[test]
    fn test_nested_threshold() {
        // 1-of-2 over (2-of-2(a, b), leaf c)
        let ks = keys(3);
        let inner = Endorsement::all_of(vec![
            Endorsement::leaf(ks[0].public_key()),
            Endorsement::leaf(ks[1].public_key()),
        ])
        .unwrap();
        let outer =
            Endorsement::any_of(vec![inner, Endorsement::leaf(ks[2].public_key())]).unwrap();

        // c alone satisfies the outer node
        assert!(outer.is_satisfied(&sign_with(&ks[2..3], b"m")));
        // a alone does not satisfy either branch
        assert!(!outer.is_satisfied(&sign_with(&ks[0..1], b"m")));
        // a + b satisfy the inner branch
        assert!(outer.is_satisfied(&sign_with(&ks[0..2], b"m")));
    }

    #[test]
    fn test_signers_flattening() {
        let ks = keys(3);
        let nested = Endorsement::any_of(vec![
            Endorsement::leaf(ks[0].public_key()),
            Endorsement::all_of(vec![
                Endorsement::leaf(ks[1].public_key()),
                Endorsement::leaf(ks[2].public_key()),
                Endorsement::leaf(ks[0].public_key()), // duplicate
            ])
            .unwrap(),
        ])
        .unwrap();

        assert_eq!(nested.signers().len(), 3);
    }

    #[test]
    fn test_json_round_trip() {
        // Policy documents travel as JSON between services
        let ks = keys(2);
        let policy = Endorsement::any_of(vec![
            Endorsement::leaf(ks[0].public_key()),
            Endorsement::leaf(ks[1].public_key()),
        ])
        .unwrap();

        let json = serde_json::to_string(&policy).unwrap();
        let back: Endorsement = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }

    #[test]
    fn test_structural_equality() {
        let ks = keys(2);
        let a = Endorsement::all_of(vec![
            Endorsement::leaf(ks[0].public_key()),
            Endorsement::leaf(ks[1].public_key()),
        ])
        .unwrap();
        let b = Endorsement::all_of(vec![
            Endorsement::leaf(ks[0].public_key()),
            Endorsement::leaf(ks[1].public_key()),
        ])
        .unwrap();
        assert_eq!(a, b);
    }
}
