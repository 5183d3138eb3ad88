use core::fmt::Debug;

use crate::error::TryReserveError;
use crate::hash_table::HashTable;
use crate::hash_table::Iter as TableIter;
use crate::strategy::Handle;
use crate::strategy::Identity;
use crate::strategy::KeyStrategy;

/// A handle-keyed hash map with an optional read-through fallback.
///
/// `HashMap<'p, K, V, S>` maps [`Handle`] keys to values. Keys are compared
/// and hashed by the strategy `S`, which defaults to pointer [`Identity`]:
/// the map never looks behind a key. Null handles are never stored; every
/// operation given one is a no-op.
///
/// A map created with [`with_fallback`](Self::with_fallback) consults its
/// parent when a key is missing locally. Writes only ever touch the local
/// entries: the parent is borrowed immutably for `'p`.
///
/// # Examples
///
/// ```rust
/// use brent_hash::HashMap;
///
/// let (x, y) = (Box::new(0u8), Box::new(0u8));
/// let (x, y): (&u8, &u8) = (&x, &y);
///
/// let mut globals = HashMap::new();
/// globals.insert(x, "global x");
/// globals.insert(y, "global y");
///
/// let mut locals = HashMap::with_fallback(&globals);
/// locals.insert(x, "local x");
///
/// assert_eq!(locals.get(x), Some(&"local x"));
/// assert_eq!(locals.get(y), Some(&"global y"));
/// assert_eq!(globals.get(x), Some(&"global x"));
/// ```
#[derive(Clone)]
pub struct HashMap<'p, K, V, S = Identity> {
    table: HashTable<K, V>,
    strategy: S,
    fallback: Option<&'p HashMap<'p, K, V, S>>,
}

impl<K, V, S> Debug for HashMap<'_, K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.table.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<'p, K: Handle, V> HashMap<'p, K, V, Identity> {
    /// Creates an empty map keyed by pointer identity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashMap;
    /// let map: HashMap<&str, i32> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self::with_strategy(Identity)
    }
}

impl<'p, K, V, S> Default for HashMap<'p, K, V, S>
where
    K: Handle,
    S: KeyStrategy<K> + Default,
{
    fn default() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<'p, K, V, S> HashMap<'p, K, V, S>
where
    K: Handle,
    S: KeyStrategy<K>,
{
    /// Creates an empty map using `strategy` to hash and compare keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashMap;
    /// # use brent_hash::strategy::FoldIdentity;
    /// let mut map = HashMap::with_strategy(FoldIdentity::default());
    /// map.insert(7usize, "seven");
    /// assert_eq!(map.get(7), Some(&"seven"));
    /// ```
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            table: HashTable::new(),
            strategy,
            fallback: None,
        }
    }

    /// Creates an empty map that reads through to `parent` on a miss.
    ///
    /// The new map uses a clone of the parent's strategy.
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

    /// Returns the map consulted when a key is missing locally.
    pub fn fallback(&self) -> Option<&'p Self> {
        self.fallback
    }

    /// Returns the key strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the number of local entries. Fallback entries are not counted.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map has no local entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of allocated slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes all local entries and releases their storage.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Reserves room for at least `additional` more local entries.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(additional)
    }

    #[inline]
    fn hash(&self, key: K) -> usize {
        self.strategy.hash_key(&key)
    }

    /// Returns the value for `key`, consulting the fallback chain on a miss.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashMap;
    /// let (a, b) = ("a", "b");
    /// let mut map = HashMap::new();
    /// map.insert(a, 1);
    /// assert_eq!(map.get(a), Some(&1));
    /// assert_eq!(map.get(b), None);
    /// ```
    pub fn get(&self, key: K) -> Option<&V> {
        if key.is_null() {
            return None;
        }

        let mut map = self;
        loop {
            if let Some(value) = map.get_local(key) {
                return Some(value);
            }
            map = map.fallback?;
        }
    }

    /// Returns the value for `key` from the local entries only.
    pub fn get_local(&self, key: K) -> Option<&V> {
        if key.is_null() {
            return None;
        }

        let hash = self.hash(key);
        self.table
            .find(hash, |k| self.strategy.keys_equal(k, &key))
            .map(|(_, v)| v)
    }

    /// Returns a mutable reference to a local value.
    ///
    /// Values found only in the fallback cannot be mutated through this map.
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        if key.is_null() {
            return None;
        }

        let hash = self.hash(key);
        let strategy = &self.strategy;
        self.table
            .find_mut(hash, |k| strategy.keys_equal(k, &key))
            .map(|(_, v)| v)
    }

    /// Returns `true` if `key` is present locally or in the fallback chain.
    pub fn contains_key(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair into the local entries.
    ///
    /// Returns the previous local value. A value shadowed in the fallback is
    /// not returned, and the fallback is never modified. Inserting a null key
    /// does nothing and returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashMap;
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(1usize, "a"), None);
    /// assert_eq!(map.insert(1usize, "b"), Some("a"));
    /// assert_eq!(map.insert(0usize, "null"), None);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.try_insert(key, value)
            .unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TryReserveError> {
        if key.is_null() {
            return Ok(None);
        }

        let hash = self.hash(key);
        let strategy = &self.strategy;
        self.table
            .try_insert(hash, key, value, |k| strategy.keys_equal(k, &key))
    }

    /// Sets or clears the local value for `key`.
    ///
    /// `Some(value)` inserts, `None` removes. Returns the previous local
    /// value either way.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashMap;
    /// let a = "a";
    /// let mut map = HashMap::new();
    /// assert_eq!(map.set(a, Some(1)), None);
    /// assert_eq!(map.set(a, None), Some(1));
    /// assert!(map.is_empty());
    /// ```
    pub fn set(&mut self, key: K, value: Option<V>) -> Option<V> {
        match value {
            Some(value) => self.insert(key, value),
            None => self.remove(key),
        }
    }

    /// Removes a local entry, returning its value.
    ///
    /// Removing a key that is absent locally changes nothing, even when the
    /// fallback holds it.
    pub fn remove(&mut self, key: K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a local entry, returning the stored key and its value.
    pub fn remove_entry(&mut self, key: K) -> Option<(K, V)> {
        if key.is_null() {
            return None;
        }

        let hash = self.hash(key);
        let strategy = &self.strategy;
        self.table.remove(hash, |k| strategy.keys_equal(k, &key))
    }

    /// Cursor-style iteration over the local entries.
    ///
    /// `next(None)` returns the first entry; `next(Some(key))` returns the
    /// entry after `key`. Returns `None` when iteration is complete or when
    /// `key` is not in the map. Mutating the map between calls may cause
    /// entries to be skipped or visited twice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::HashMap;
    /// let mut map = HashMap::new();
    /// for k in 1..=3usize {
    ///     map.insert(k, k * 10);
    /// }
    ///
    /// let mut sum = 0;
    /// let mut cursor = map.next(None);
    /// while let Some((&k, &v)) = cursor {
    ///     sum += v;
    ///     cursor = map.next(Some(k));
    /// }
    /// assert_eq!(sum, 60);
    /// ```
    pub fn next(&self, after: Option<K>) -> Option<(&K, &V)> {
        let after = match after {
            None => None,
            Some(key) => {
                let hash = self.hash(key);
                Some(
                    self.table
                        .index_of(hash, |k| self.strategy.keys_equal(k, &key))?,
                )
            }
        };

        let index = self.table.next_index(after)?;
        self.table.get_index(index)
    }

    /// Returns an independent copy of the local entries.
    ///
    /// The copy shares this map's fallback. It is rebuilt entry by entry, so
    /// its layout is fresh.
    pub fn copy(&self) -> Self
    where
        V: Clone,
        S: Clone,
    {
        self.try_copy().unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`copy`](Self::copy).
    pub fn try_copy(&self) -> Result<Self, TryReserveError>
    where
        V: Clone,
        S: Clone,
    {
        let mut copy = Self {
            table: HashTable::new(),
            strategy: self.strategy.clone(),
            fallback: self.fallback,
        };
        copy.try_reserve(self.len())?;

        let mut cursor = self.next(None);
        while let Some((&key, value)) = cursor {
            copy.try_insert(key, value.clone())?;
            cursor = self.next(Some(key));
        }

        Ok(copy)
    }

    /// Returns an iterator over the local entries.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the local keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the local values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns chain statistics for the local table.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> crate::hash_table::TableStats {
        self.table.stats()
    }
}

/// An iterator over the local entries of a [`HashMap`].
pub struct Iter<'a, K, V> {
    inner: TableIter<'a, K, V>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// An iterator over the local keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// An iterator over the local values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<'_, K, V, S>
where
    K: Handle,
    S: KeyStrategy<K>,
{
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
