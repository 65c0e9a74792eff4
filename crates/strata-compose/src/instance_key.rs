use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::{CompositionArc, PrimIndex};

/// Composition fingerprint of an instanceable prim index.
///
/// Two prim indexes with equal keys are guaranteed to compose to the same
/// values, so all of their subtrees can be presented by one shared master.
/// Deriving a key walks the prim index's full arc list and is the
/// expensive part of registration; the instance cache relies on that work
/// happening before its lock is taken.
///
/// The structural form is retained so equality never rests on the digest
/// alone; the digest only makes hashing O(1) and fronts the comparisons.
#[derive(Clone)]
pub struct InstanceKey {
    digest: u64,
    arcs: Vec<CompositionArc>,
}

impl InstanceKey {
    pub fn new(index: &PrimIndex) -> Self {
        let arcs = index.arcs().to_vec();
        let mut hasher = DefaultHasher::new();
        arcs.hash(&mut hasher);
        Self {
            digest: hasher.finish(),
            arcs,
        }
    }
}

impl PartialEq for InstanceKey {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest && self.arcs == other.arcs
    }
}

impl Eq for InstanceKey {}

impl Hash for InstanceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.digest);
    }
}

impl PartialOrd for InstanceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InstanceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // Digest first: cheap, and any total order consistent with `Eq`
        // serves the ordered collections this key ends up in.
        self.digest
            .cmp(&other.digest)
            .then_with(|| self.arcs.cmp(&other.arcs))
    }
}

impl fmt::Debug for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceKey({:016x})", self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArcKind;
    use std::collections::hash_map::DefaultHasher;
    use strata_path::ScenePath;

    fn path(text: &str) -> ScenePath {
        ScenePath::parse(text).unwrap()
    }

    fn reference(asset: &str) -> CompositionArc {
        CompositionArc::new(ArcKind::Reference, asset, path("/Prototype"))
    }

    fn hash_of(key: &InstanceKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn keys_ignore_the_prim_path() {
        let a = PrimIndex::new(path("/World/A"), true, vec![reference("prop")]);
        let b = PrimIndex::new(path("/World/B"), true, vec![reference("prop")]);
        let key_a = InstanceKey::new(&a);
        let key_b = InstanceKey::new(&b);
        assert_eq!(key_a, key_b);
        assert_eq!(hash_of(&key_a), hash_of(&key_b));
        assert_eq!(key_a.cmp(&key_b), Ordering::Equal);
    }

    #[test]
    fn keys_separate_different_compositions() {
        let a = PrimIndex::new(path("/World/A"), true, vec![reference("prop")]);
        let b = PrimIndex::new(path("/World/A"), true, vec![reference("other")]);
        let key_a = InstanceKey::new(&a);
        let key_b = InstanceKey::new(&b);
        assert_ne!(key_a, key_b);
        assert_ne!(key_a.cmp(&key_b), Ordering::Equal);
    }

    #[test]
    fn arc_order_is_significant() {
        let forward = vec![reference("one"), reference("two")];
        let backward = vec![reference("two"), reference("one")];
        let a = InstanceKey::new(&PrimIndex::new(path("/A"), true, forward));
        let b = InstanceKey::new(&PrimIndex::new(path("/A"), true, backward));
        assert_ne!(a, b);
    }
}
