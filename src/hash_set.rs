use core::fmt::Debug;

use crate::error::TryReserveError;
use crate::hash_table::HashTable;
use crate::hash_table::Iter as TableIter;
use crate::strategy::Handle;
use crate::strategy::Identity;
use crate::strategy::KeyStrategy;

/// A handle set with an optional read-through fallback.
///
/// Membership mode of the core table: entries carry no value. Like
/// [`HashMap`](crate::HashMap), keys are hashed and compared by the strategy
/// `S` (pointer [`Identity`] by default), and null handles are never stored.
///
/// # Examples
///
/// ```rust
/// use brent_hash::HashSet;
///
/// let (a, b) = ("a", "b");
/// let mut builtins = HashSet::new();
/// builtins.insert(a);
///
/// let mut scope = HashSet::with_fallback(&builtins);
/// assert!(scope.insert(b));
/// assert!(scope.contains(a));
/// assert!(!scope.contains_local(a));
/// assert!(!builtins.contains(b));
/// ```
#[derive(Clone)]
pub struct HashSet<'p, K, S = Identity> {
    table: HashTable<K, ()>,
    strategy: S,
    fallback: Option<&'p HashSet<'p, K, S>>,
}

impl<K: Debug, S> Debug for HashSet<'_, K, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter().map(|(k, _)| k)).finish()
    }
}

impl<'p, K: Handle> HashSet<'p, K, Identity> {
    /// Creates an empty set keyed by pointer identity.
    pub fn new() -> Self {
        Self::with_strategy(Identity)
    }
}

impl<'p, K, S> Default for HashSet<'p, K, S>
where
    K: Handle,
    S: KeyStrategy<K> + Default,
{
    fn default() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<'p, K, S> HashSet<'p, K, S>
where
    K: Handle,
    S: KeyStrategy<K>,
{
    /// Creates an empty set using `strategy` to hash and compare keys.
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: HashTable::new(),
            strategy,
            fallback: None,
        }
    }

    /// Creates an empty set that reads through to `parent` on a miss.
    pub fn with_fallback(parent: &'p Self) -> Self
    where
        S: Clone,
    {
        Self {
            table: HashTable::new(),
            strategy: parent.strategy.clone(),
            fallback: Some(parent),
        }
    }

    /// Returns the set consulted when a key is missing locally.
    pub fn fallback(&self) -> Option<&'p Self> {
        self.fallback
    }

    /// Returns the number of local keys.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set has no local keys.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all local keys and releases their storage.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Reserves room for at least `additional` more local keys.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    /// Returns `true` if `key` is present locally or in the fallback chain.
    pub fn contains(&self, key: K) -> bool {
        let mut set = self;
        loop {
            if set.contains_local(key) {
                return true;
            }
            match set.fallback {
                Some(parent) => set = parent,
                None => return false,
            }
        }
    }

    /// Returns `true` if `key` is present locally.
    pub fn contains_local(&self, key: K) -> bool {
        if key.is_null() {
            return false;
        }

        let hash = self.strategy.hash_key(&key);
        self.table
            .find(hash, |k| self.strategy.keys_equal(k, &key))
            .is_some()
    }

    /// Adds `key` to the local keys.
    ///
    /// Returns `true` if the key was newly inserted. A key already present
    /// only in the fallback is still added locally. Null keys are ignored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashSet;
    /// let mut set = HashSet::new();
    /// assert!(set.insert(5usize));
    /// assert!(!set.insert(5usize));
    /// assert!(!set.insert(0usize));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K) -> bool {
        self.try_insert(key).unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: K) -> Result<bool, TryReserveError> {
        if key.is_null() {
            return Ok(false);
        }

        let hash = self.strategy.hash_key(&key);
        let strategy = &self.strategy;
        let previous = self
            .table
            .try_insert(hash, key, (), |k| strategy.keys_equal(k, &key))?;
        Ok(previous.is_none())
    }

    /// Removes a local key. Returns `true` if it was present.
    pub fn remove(&mut self, key: K) -> bool {
        if key.is_null() {
            return false;
        }

        let hash = self.strategy.hash_key(&key);
        let strategy = &self.strategy;
        self.table
            .remove(hash, |k| strategy.keys_equal(k, &key))
            .is_some()
    }

    /// Cursor-style iteration over the local keys, see
    /// [`HashMap::next`](crate::HashMap::next).
    pub fn next(&self, after: Option<K>) -> Option<&K> {
        let after = match after {
            None => None,
            Some(key) => {
                let hash = self.strategy.hash_key(&key);
                Some(
                    self.table
                        .index_of(hash, |k| self.strategy.keys_equal(k, &key))?,
                )
            }
        };

        let index = self.table.next_index(after)?;
        self.table.get_index(index).map(|(k, _)| k)
    }

    /// Returns an independent copy of the local keys sharing this set's
    /// fallback.
    pub fn copy(&self) -> Self
    where
        S: Clone,
    {
        self.try_copy().unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`copy`](Self::copy).
    pub fn try_copy(&self) -> Result<Self, TryReserveError>
    where
        S: Clone,
    {
        let mut copy = Self {
            table: HashTable::new(),
            strategy: self.strategy.clone(),
            fallback: self.fallback,
        };
        copy.try_reserve(self.len())?;

        let mut cursor = self.next(None);
        while let Some(&key) = cursor {
            copy.try_insert(key)?;
            cursor = self.next(Some(key));
        }

        Ok(copy)
    }

    /// Returns an iterator over the local keys.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns chain statistics for the local table.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> crate::hash_table::TableStats {
        self.table.stats()
    }
}

/// An iterator over the local keys of a [`HashSet`].
pub struct Iter<'a, K> {
    inner: TableIter<'a, K, ()>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<'a, K, S> IntoIterator for &'a HashSet<'_, K, S>
where
    K: Handle,
    S: KeyStrategy<K>,
{
    type IntoIter = Iter<'a, K>;
    type Item = &'a K;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
