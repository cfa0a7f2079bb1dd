//! Deep-copy contract for stored results.
//!
//! `Clone` on a result store is shallow (values are shared). Handing results
//! to another thread whose lifetime outlives the producer requires a copy
//! that shares nothing, which is what [`DeepClone`] provides.

use std::hash::Hash;

use indexmap::IndexMap;

/// A clone that duplicates all shared state reachable from `self`.
///
/// For plain value types this is the same as [`Clone::clone`]. Types that
/// share storage on `clone()` (such as result stores) must allocate fresh
/// storage here.
pub trait DeepClone {
    /// Returns a copy that shares no interior state with `self`.
    fn deep_clone(&self) -> Self;
}

macro_rules! deep_clone_via_clone {
    ($($t:ty),* $(,)?) => {
        $(
            impl DeepClone for $t {
                fn deep_clone(&self) -> Self {
                    self.clone()
                }
            }
        )*
    };
}

deep_clone_via_clone!(bool, usize, u32, u64, i64, f64, String);

impl<T: Clone> DeepClone for Vec<T> {
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: DeepClone> DeepClone for Option<T> {
    fn deep_clone(&self) -> Self {
        self.as_ref().map(DeepClone::deep_clone)
    }
}

impl<K: Clone + Hash + Eq, V: DeepClone> DeepClone for IndexMap<K, V> {
    fn deep_clone(&self) -> Self {
        self.iter()
            .map(|(k, v)| (k.clone(), v.deep_clone()))
            .collect()
    }
}
