//! Provides a string interning pool tailored for XML documents
//!
//! Element and attribute names repeat constantly in a stream of XML
//! fragments. Interning them lets the tree share one allocation per
//! distinct name and lets equality checks short-circuit on pointer
//! identity. Equality never *depends* on interning: two [`Name`]s
//! created independently compare equal when their text does.

#![deny(rust_2018_idioms)]
#![deny(missing_docs)]

use hashbrown::HashSet;
use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    sync::Arc,
};

/// A cheaply clonable, immutable name.
#[derive(Clone)]
pub struct Name(Arc<str>);

impl Name {
    /// Creates a name that is not shared with any pool.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// The name's text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when both names point at the same interned allocation.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for Name {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other) || *self.0 == *other.0
    }
}

impl Eq for Name {}

impl PartialEq<str> for Name {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Name {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl PartialEq<Name> for str {
    fn eq(&self, other: &Name) -> bool {
        self == &*other.0
    }
}

impl PartialEq<Name> for &str {
    fn eq(&self, other: &Name) -> bool {
        *self == &*other.0
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

/// Hashes exactly like the underlying `str`, which lets the pool look
/// names up by `&str`.
impl Hash for Name {
    fn hash<H>(&self, h: &mut H)
    where
        H: Hasher,
    {
        self.as_str().hash(h)
    }
}

impl Borrow<str> for Name {
    fn borrow(&self) -> &str {
        self
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        self
    }
}

impl Deref for Name {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Name {
    fn from(other: &str) -> Self {
        Self::new(other)
    }
}

impl From<String> for Name {
    fn from(other: String) -> Self {
        Self(Arc::from(other))
    }
}

impl From<&String> for Name {
    fn from(other: &String) -> Self {
        Self::new(other)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self)
    }
}

/// A string interning pool.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    lookup: HashSet<Name>,
}

impl Interner {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string to the pool.
    ///
    /// If it's not already present, the string will be copied to the
    /// pool. Every call with equal text returns a [`Name`] sharing the
    /// same allocation.
    pub fn intern(&mut self, s: &str) -> Name {
        self.lookup.get_or_insert_with(s, Name::new).clone()
    }

    /// The number of distinct names in the pool.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// True when nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Drops the pool's references. Names already handed out remain
    /// valid.
    pub fn clear(&mut self) {
        self.lookup.clear()
    }
}

#[cfg(test)]
mod test {
    use hashbrown::HashMap;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn interning_twice_creates_equal_values() {
        let mut pool = Interner::default();
        let a = pool.intern("hello");
        let b = pool.intern("hello");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn interning_two_values_creates_non_equal_values() {
        let mut pool = Interner::default();
        let a = pool.intern("hello");
        let b = pool.intern("world");
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn interning_preserves_string_values() {
        let mut pool = Interner::default();
        let a = pool.intern("hello");
        let b = pool.intern("world");

        assert_eq!(a.as_str(), "hello");
        assert_eq!(b.as_str(), "world");
    }

    #[test]
    fn interning_has_equal_pointer() {
        let mut pool = Interner::default();
        let a = pool.intern("hello");
        let b = pool.intern("hello");

        assert!(Name::ptr_eq(&a, &b));
    }

    #[test]
    fn equality_does_not_need_interning() {
        let mut pool = Interner::default();
        let a = pool.intern("hello");
        let b = Name::from("hello");

        assert!(!Name::ptr_eq(&a, &b));
        assert_eq!(a, b);
        assert_eq!(a, "hello");
        assert_eq!("hello", b);
    }

    #[test]
    fn names_outlive_a_cleared_pool() {
        let mut pool = Interner::default();
        let a = pool.intern("hello");
        pool.clear();

        assert!(pool.is_empty());
        assert_eq!(a, "hello");
    }

    proptest! {
        #[test]
        fn all_interned_keys_equal_each_other(s in prop::collection::vec("[a-c]{0,3}", 0..64)) {
            let mut pool = Interner::default();
            let mut by_string = HashMap::with_capacity(s.len());

            for s in s {
                let k = pool.intern(&s);
                by_string.entry(s).or_insert_with(Vec::new).push(k);
            }

            prop_assert_eq!(pool.len(), by_string.len());

            for (s, keys) in &by_string {
                let first_key = &keys[0];

                prop_assert!(
                    keys.iter().all(|k| Name::ptr_eq(first_key, k)),
                    "Not all interned keys for {} were shared: {:?}",
                    s,
                    keys,
                );
                prop_assert_eq!(s.as_str(), first_key.as_str());
            }
        }
    }
}
