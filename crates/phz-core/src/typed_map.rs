//! Enum-keyed heterogeneous result store.
//!
//! A [`TypedEnumMap`] holds at most one value per kind of a closed
//! enumeration. Each kind is a zero-sized marker type implementing
//! [`ResultKind`], which fixes the value type stored under that kind, so
//! every access site is statically typed. Kind tables are declared with
//! [`result_kinds!`](crate::result_kinds), which generates the enum, the
//! markers and their trait impls from a single list: a kind cannot exist
//! without a value type.
//!
//! Cloning a map is shallow: the clone shares every stored value with the
//! original. New kinds set on either copy stay local to that copy, while
//! mutations through [`get_mut`](TypedEnumMap::get_mut) of a shared kind are
//! visible from both. [`DeepClone`] produces an independent copy.

use std::any::Any;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;

use crate::clone::DeepClone;
use crate::error::StateError;

/// A result kind: a key of a closed enumeration bound to one value type.
///
/// Implemented by the marker types generated by
/// [`result_kinds!`](crate::result_kinds).
pub trait ResultKind: 'static {
    /// The enumeration this kind belongs to.
    type Key: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    /// The canonical value type stored under this kind.
    type Value: DeepClone + Send + Sync + 'static;
    /// The enumeration variant identifying this kind.
    const KEY: Self::Key;
    /// Human-readable kind name, used in error messages.
    const NAME: &'static str;
}

type Slot = Arc<dyn Any + Send + Sync>;

struct Entry {
    slot: Slot,
    copy: fn(&Slot) -> Slot,
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            copy: self.copy,
        }
    }
}

fn copy_slot<T: DeepClone + Send + Sync + 'static>(slot: &Slot) -> Slot {
    match slot.downcast_ref::<RwLock<T>>() {
        Some(lock) => {
            let value = lock.read().unwrap_or_else(PoisonError::into_inner);
            Arc::new(RwLock::new(value.deep_clone()))
        }
        // Slots are only ever created by `set::<K>` with `K::Value`.
        None => Arc::clone(slot),
    }
}

/// A map from the kinds of enumeration `E` to their typed values.
pub struct TypedEnumMap<E> {
    entries: IndexMap<E, Entry>,
}

impl<E: Copy + Eq + Hash> TypedEnumMap<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Store `value` under kind `K`.
    ///
    /// Fails with [`StateError::AlreadySet`] if `K` is present; entries are
    /// never replaced or removed.
    pub fn set<K: ResultKind<Key = E>>(&mut self, value: K::Value) -> Result<(), StateError> {
        if self.entries.contains_key(&K::KEY) {
            return Err(StateError::AlreadySet { kind: K::NAME });
        }
        let slot: Slot = Arc::new(RwLock::new(value));
        self.entries.insert(
            K::KEY,
            Entry {
                slot,
                copy: copy_slot::<K::Value>,
            },
        );
        Ok(())
    }

    /// [`set`](Self::set), then write access to the stored value for
    /// building it in place.
    pub fn set_mut<K: ResultKind<Key = E>>(
        &mut self,
        value: K::Value,
    ) -> Result<RwLockWriteGuard<'_, K::Value>, StateError> {
        self.set::<K>(value)?;
        self.get_mut::<K>()
    }

    /// Read access to the value of kind `K`.
    ///
    /// Fails with [`StateError::NotSet`] if `K` is absent.
    pub fn get<K: ResultKind<Key = E>>(
        &self,
    ) -> Result<RwLockReadGuard<'_, K::Value>, StateError> {
        let lock = self.lock::<K>()?;
        Ok(lock.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Write access to the value of kind `K`.
    ///
    /// The value is shared with every shallow copy of this store. Holding a
    /// guard of kind `K` while requesting another guard of the same kind on
    /// the same thread deadlocks.
    pub fn get_mut<K: ResultKind<Key = E>>(
        &self,
    ) -> Result<RwLockWriteGuard<'_, K::Value>, StateError> {
        let lock = self.lock::<K>()?;
        Ok(lock.write().unwrap_or_else(PoisonError::into_inner))
    }

    /// Whether kind `K` has been set.
    pub fn contains<K: ResultKind<Key = E>>(&self) -> bool {
        self.entries.contains_key(&K::KEY)
    }

    /// Number of kinds set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no kind has been set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The kinds set so far, in insertion order.
    pub fn kinds(&self) -> impl Iterator<Item = E> + '_ {
        self.entries.keys().copied()
    }

    fn lock<K: ResultKind<Key = E>>(&self) -> Result<&RwLock<K::Value>, StateError> {
        self.entries
            .get(&K::KEY)
            .and_then(|entry| entry.slot.downcast_ref::<RwLock<K::Value>>())
            .ok_or(StateError::NotSet { kind: K::NAME })
    }
}

impl<E: Copy + Eq + Hash> Default for TypedEnumMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Copy + Eq + Hash> Clone for TypedEnumMap<E> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<E: Copy + Eq + Hash> DeepClone for TypedEnumMap<E> {
    fn deep_clone(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let slot = (entry.copy)(&entry.slot);
                (
                    *key,
                    Entry {
                        slot,
                        copy: entry.copy,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl<E: fmt::Debug> fmt::Debug for TypedEnumMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedEnumMap")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Declare a closed table of result kinds.
///
/// Generates the key enumeration (with `ALL` and `name()`), one marker type
/// per kind, and the [`ResultKind`] impl binding each marker to its value
/// type.
///
/// ```
/// phz_core::result_kinds! {
///     /// Kinds used in this example.
///     pub enum DemoKind {
///         /// A counter.
///         Count => usize,
///         /// A label.
///         Label => String,
///     }
/// }
///
/// let mut store = phz_core::TypedEnumMap::<DemoKind>::new();
/// store.set::<Count>(3).unwrap();
/// assert_eq!(*store.get::<Count>().unwrap(), 3);
/// assert!(!store.contains::<Label>());
/// ```
#[macro_export]
macro_rules! result_kinds {
    (
        $(#[$enum_meta:meta])*
        $vis:vis enum $Enum:ident {
            $(
                $(#[$meta:meta])*
                $Kind:ident => $Value:ty
            ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $Enum {
            $(
                $(#[$meta])*
                $Kind,
            )*
        }

        impl $Enum {
            /// Every kind of the table, in declaration order.
            pub const ALL: &'static [$Enum] = &[$($Enum::$Kind),*];

            /// The kind's name.
            pub fn name(self) -> &'static str {
                match self {
                    $($Enum::$Kind => stringify!($Kind),)*
                }
            }
        }

        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug)]
            $vis struct $Kind;

            impl $crate::ResultKind for $Kind {
                type Key = $Enum;
                type Value = $Value;
                const KEY: $Enum = $Enum::$Kind;
                const NAME: &'static str = stringify!($Kind);
            }
        )*
    };
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<TypedEnumMap<u8>>();
};
