//! Zero-sized hash builder for the crate's internal hash collections.
//!
//! All internal maps hash short string keys on hot read/write paths, so we
//! use foldhash with a fixed seed instead of the std SipHash default.
//! HashDoS resistance is irrelevant here: keys come from the application's
//! own templates and data objects, never from an untrusted wire.

use std::hash::BuildHasher;

pub use foldhash::fast::{FixedState, FoldHasher};

/// Insertion-ordered map used for property slots and event channels.
///
/// Insertion order is observable behavior in this crate (property
/// enumeration order, event subscription order), so plain `HashMap`
/// iteration order is not an option.
pub type FastIndexMap<K, V> = indexmap::IndexMap<K, V, FastHashBuilder>;

/// A zero-sized `BuildHasher` over foldhash with a fixed seed.
///
/// Every instance hashes identically, so collections built with it carry no
/// per-collection state and behave deterministically across runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct FastHashBuilder;

impl BuildHasher for FastHashBuilder {
    type Hasher = FoldHasher<'static>;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        FixedState::with_seed(0x6b6f_6d6f_7265_6269).build_hasher()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_is_zero_sized() {
        assert_eq!(std::mem::size_of::<FastHashBuilder>(), 0);
    }

    #[test]
    fn builder_is_deterministic() {
        let a = FastHashBuilder.hash_one("displayed");
        let b = FastHashBuilder.hash_one("displayed");
        assert_eq!(a, b);
    }

    #[test]
    fn index_map_preserves_insertion_order() {
        let mut map: FastIndexMap<&str, u32> = FastIndexMap::default();
        map.insert("name", 0);
        map.insert("age", 1);
        map.insert("image", 2);
        let keys: Vec<_> = map.keys().copied().collect();
        assert_eq!(keys, ["name", "age", "image"]);
    }
}
