use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::mem;
use core::num::NonZeroUsize;

use crate::error::TryReserveError;
use crate::strategy::ZERO_HASH_SENTINEL;

/// Number of slots allocated by the first insertion into an empty table.
pub const MIN_CAPACITY: usize = 16;

/// Tables never shrink while they hold this many entries or fewer.
const SHRINK_FLOOR: usize = 16;

/// Link value terminating a chain.
const NO_LINK: usize = usize::MAX;

const SENTINEL_HASH: NonZeroUsize = match NonZeroUsize::new(ZERO_HASH_SENTINEL) {
    Some(hash) => hash,
    None => unreachable!(),
};

#[inline(always)]
fn fix_hash(hash: usize) -> NonZeroUsize {
    NonZeroUsize::new(hash).unwrap_or(SENTINEL_HASH)
}

#[derive(Clone)]
struct Slot<K, V> {
    hash: NonZeroUsize,
    link: usize,
    key: K,
    value: V,
}

/// Statistics describing the chain structure of a table.
///
/// Only available with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    /// Number of live entries.
    pub occupancy: usize,
    /// Number of allocated slots.
    pub capacity: usize,
    /// Entries stored at their home slot.
    pub home_entries: usize,
    /// Entries stored away from their home slot.
    pub displaced_entries: usize,
    /// Length of the longest chain.
    pub longest_chain: usize,
    /// `chain_histogram[n]` is the number of chains holding `n` entries.
    pub chain_histogram: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl TableStats {
    /// Average number of entries visited by a successful lookup.
    pub fn average_probe_length(&self) -> f64 {
        if self.occupancy == 0 {
            return 0.0;
        }

        // A chain of length n costs 1 + 2 + ... + n probes over its n entries.
        let total: usize = self
            .chain_histogram
            .iter()
            .enumerate()
            .map(|(len, &count)| count * len * (len + 1) / 2)
            .sum();
        total as f64 / self.occupancy as f64
    }

    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Chain Statistics ===");
        println!(
            "Occupancy: {}/{} ({:.2}% load)",
            self.occupancy,
            self.capacity,
            if self.capacity == 0 {
                0.0
            } else {
                self.occupancy as f64 / self.capacity as f64 * 100.0
            }
        );
        println!(
            "Placement: {} home, {} displaced",
            self.home_entries, self.displaced_entries
        );
        println!(
            "Chains: longest {}, {:.2} average probes",
            self.longest_chain,
            self.average_probe_length()
        );
        for (len, &count) in self.chain_histogram.iter().enumerate().skip(1) {
            if count != 0 {
                println!("{len:>3} | {count}");
            }
        }
    }
}

/// An open-addressing hash table using chained scatter with Brent's
/// variation.
///
/// Every entry lives in one flat slot array. Colliding entries are linked into
/// a chain rooted at their home slot (`hash & (capacity - 1)`), and links are
/// indices into the same array. When a new key's home slot is held by an entry
/// that was displaced from some other chain, that entry moves out of the way
/// instead of the new key, so entries sit at their home slot whenever
/// possible.
///
/// Like a raw table, `HashTable<K, V>` does not know how to hash or compare
/// keys: each operation takes the key's hash and an equality predicate. Hashes
/// are stored alongside the entries so that resizing never re-hashes keys.
///
/// ## Example
///
/// ```rust
/// use brent_hash::hash_table::HashTable;
///
/// let mut table = HashTable::new();
/// assert_eq!(table.insert(7, "seven", 70, |k| *k == "seven"), None);
/// assert_eq!(table.insert(7, "seven", 77, |k| *k == "seven"), Some(70));
/// assert_eq!(table.find(7, |k| *k == "seven"), Some((&"seven", &77)));
/// assert_eq!(table.remove(7, |k| *k == "seven"), Some(("seven", 77)));
/// assert!(table.is_empty());
/// ```
#[derive(Clone)]
pub struct HashTable<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    occupancy: usize,
    // Landing slots are searched downward from here. Every slot at or above
    // the cursor is occupied.
    free_cursor: usize,
}

impl<K, V> Debug for HashTable<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::ToString;

        f.debug_struct("HashTable")
            .field("occupancy", &self.occupancy)
            .field("capacity", &self.capacity())
            .field("free_cursor", &self.free_cursor)
            .field(
                "slots",
                &self
                    .slots
                    .iter()
                    .enumerate()
                    .map(|(index, slot)| match slot {
                        None => "..".to_string(),
                        Some(slot) => {
                            let home = self.home(slot.hash);
                            let marker = if home == index { '@' } else { '~' };
                            if slot.link == NO_LINK {
                                format!("{marker}{home:02}")
                            } else {
                                format!("{marker}{home:02}>{:02}", slot.link)
                            }
                        }
                    })
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<K, V> Default for HashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> HashTable<K, V> {
    /// Creates an empty table. No memory is allocated until the first
    /// insertion.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            occupancy: 0,
            free_cursor: 0,
        }
    }

    /// Creates a table that can hold at least `capacity` entries without
    /// growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<usize, ()> = HashTable::with_capacity(100);
    /// assert!(table.capacity() > 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let mut table = Self::new();
        table.reserve(capacity);
        table
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.occupancy
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// Returns the number of allocated slots: zero or a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn home(&self, hash: NonZeroUsize) -> usize {
        hash.get() & self.slots.len().wrapping_sub(1)
    }

    #[inline]
    fn occupied(&self, index: usize) -> &Slot<K, V> {
        match &self.slots[index] {
            Some(slot) => slot,
            None => unreachable!("chain reached empty slot {index}"),
        }
    }

    #[inline]
    fn occupied_mut(&mut self, index: usize) -> &mut Slot<K, V> {
        match &mut self.slots[index] {
            Some(slot) => slot,
            None => unreachable!("chain reached empty slot {index}"),
        }
    }

    /// Walks the chain for `hash`, returning the matching slot and its
    /// predecessor on the chain (if the match is not the chain head).
    fn locate(
        &self,
        hash: NonZeroUsize,
        eq: impl Fn(&K) -> bool,
    ) -> Option<(Option<usize>, usize)> {
        if self.occupancy == 0 {
            return None;
        }

        let mut index = self.home(hash);
        let head = self.slots[index].as_ref()?;
        if self.home(head.hash) != index {
            // A displaced entry only ever occupies a slot that is nobody's
            // home, so this chain is empty.
            return None;
        }

        let mut prev = None;
        loop {
            let slot = self.occupied(index);
            if slot.hash == hash && eq(&slot.key) {
                return Some((prev, index));
            }
            if slot.link == NO_LINK {
                return None;
            }
            prev = Some(index);
            index = slot.link;
        }
    }

    /// Finds an entry by hash and equality predicate.
    pub fn find(&self, hash: usize, eq: impl Fn(&K) -> bool) -> Option<(&K, &V)> {
        let (_, index) = self.locate(fix_hash(hash), eq)?;
        let slot = self.occupied(index);
        Some((&slot.key, &slot.value))
    }

    /// Finds an entry by hash and equality predicate, returning a mutable
    /// reference to its value.
    pub fn find_mut(&mut self, hash: usize, eq: impl Fn(&K) -> bool) -> Option<(&K, &mut V)> {
        let (_, index) = self.locate(fix_hash(hash), eq)?;
        let slot = self.occupied_mut(index);
        Some((&slot.key, &mut slot.value))
    }

    /// Returns the slot index currently holding the matching entry.
    ///
    /// Indices are only meaningful until the next mutation: insertions and
    /// removals relocate entries.
    pub fn index_of(&self, hash: usize, eq: impl Fn(&K) -> bool) -> Option<usize> {
        self.locate(fix_hash(hash), eq).map(|(_, index)| index)
    }

    /// Returns the first occupied slot index strictly after `after`, or the
    /// first occupied slot when `after` is `None`.
    ///
    /// Scanning from `None` until this returns `None` visits every entry
    /// exactly once, provided the table is not mutated in between.
    pub fn next_index(&self, after: Option<usize>) -> Option<usize> {
        let start = after.map_or(0, |index| index + 1);
        (start..self.slots.len()).find(|&index| self.slots[index].is_some())
    }

    /// Returns the entry stored at slot `index`, if any.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        self.slots
            .get(index)?
            .as_ref()
            .map(|slot| (&slot.key, &slot.value))
    }

    /// Inserts a key-value pair, replacing the value of an existing equal key.
    ///
    /// Returns the previous value, if any. The stored key is kept when a value
    /// is replaced; `key` is dropped.
    ///
    /// # Panics
    ///
    /// Panics if the new capacity overflows `usize`, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if growing
    /// the slot array fails. Use [`try_insert`](Self::try_insert) to handle
    /// these conditions.
    pub fn insert(&mut self, hash: usize, key: K, value: V, eq: impl Fn(&K) -> bool) -> Option<V> {
        self.try_insert(hash, key, value, eq)
            .unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`insert`](Self::insert).
    ///
    /// On error the table is unchanged and `key` and `value` are dropped.
    pub fn try_insert(
        &mut self,
        hash: usize,
        key: K,
        value: V,
        eq: impl Fn(&K) -> bool,
    ) -> Result<Option<V>, TryReserveError> {
        let hash = fix_hash(hash);
        if let Some((_, index)) = self.locate(hash, eq) {
            let slot = self.occupied_mut(index);
            return Ok(Some(mem::replace(&mut slot.value, value)));
        }

        self.insert_new(hash, key, value)?;
        Ok(None)
    }

    /// Inserts an entry the caller knows to be absent, returning references
    /// to the stored key and value.
    ///
    /// Inserting a key that is already present leaves both copies in the
    /// table; lookups will find only one of them.
    pub fn try_insert_unique(
        &mut self,
        hash: usize,
        key: K,
        value: V,
    ) -> Result<(&K, &mut V), TryReserveError> {
        let index = self.insert_new(fix_hash(hash), key, value)?;
        let slot = self.occupied_mut(index);
        Ok((&slot.key, &mut slot.value))
    }

    fn insert_new(&mut self, hash: NonZeroUsize, key: K, value: V) -> Result<usize, TryReserveError> {
        self.reserve_for_insert()?;

        let mut item = (key, value);
        loop {
            match self.place(hash, item.0, item.1) {
                Ok(index) => return Ok(index),
                Err(returned) => {
                    // The cursor ran out. Rebuilding resets it; double only
                    // when the table is at least half full.
                    item = returned;
                    let capacity = self.capacity();
                    let capacity = if self.occupancy * 2 >= capacity {
                        capacity
                            .checked_mul(2)
                            .ok_or(TryReserveError::CapacityOverflow)?
                    } else {
                        capacity
                    };
                    self.resize(capacity)?;
                }
            }
        }
    }

    /// Places a new entry, relocating a displaced occupant if needed. Hands
    /// the entry back if no landing slot is left.
    fn place(&mut self, hash: NonZeroUsize, key: K, value: V) -> Result<usize, (K, V)> {
        let home = self.home(hash);
        if self.slots[home].is_none() {
            self.slots[home] = Some(Slot {
                hash,
                link: NO_LINK,
                key,
                value,
            });
            self.occupancy += 1;
            return Ok(home);
        }

        let occupant = self.occupied(home);
        let occupant_home = self.home(occupant.hash);
        let occupant_link = occupant.link;

        let Some(free) = self.next_free() else {
            return Err((key, value));
        };

        if occupant_home == home {
            // The occupant owns this slot: the new entry lands in the free
            // slot, spliced right behind the chain head.
            self.slots[free] = Some(Slot {
                hash,
                link: occupant_link,
                key,
                value,
            });
            self.occupied_mut(home).link = free;
            self.occupancy += 1;
            return Ok(free);
        }

        // The occupant was displaced from another chain. Move it to the free
        // slot, repoint its predecessor, and give the home slot to the new
        // entry.
        let mut prev = occupant_home;
        loop {
            let link = self.occupied(prev).link;
            if link == home {
                break;
            }
            debug_assert_ne!(link, NO_LINK, "displaced entry missing from its chain");
            prev = link;
        }

        self.slots[free] = self.slots[home].take();
        self.occupied_mut(prev).link = free;
        self.slots[home] = Some(Slot {
            hash,
            link: NO_LINK,
            key,
            value,
        });
        self.occupancy += 1;
        Ok(home)
    }

    fn next_free(&mut self) -> Option<usize> {
        while self.free_cursor > 0 {
            self.free_cursor -= 1;
            if self.slots[self.free_cursor].is_none() {
                return Some(self.free_cursor);
            }
        }
        None
    }

    #[inline]
    fn release(&mut self, index: usize) {
        if index >= self.free_cursor {
            self.free_cursor = index + 1;
        }
    }

    /// Removes an entry, returning its key and value.
    ///
    /// If the removed entry has a successor on its chain, the successor moves
    /// into the vacated slot. The table shrinks to half its capacity once
    /// occupancy drops below a third of it.
    pub fn remove(&mut self, hash: usize, eq: impl Fn(&K) -> bool) -> Option<(K, V)> {
        let (prev, index) = self.locate(fix_hash(hash), eq)?;
        let removed = self.slots[index].take()?;

        if removed.link != NO_LINK {
            // @prev -> removed@index -> next@link  ==>  @prev -> next@index
            self.slots[index] = self.slots[removed.link].take();
            self.release(removed.link);
        } else {
            if let Some(prev) = prev {
                self.occupied_mut(prev).link = NO_LINK;
            }
            self.release(index);
        }
        self.occupancy -= 1;

        self.maybe_shrink();
        Some((removed.key, removed.value))
    }

    fn maybe_shrink(&mut self) {
        let capacity = self.capacity();
        if self.occupancy > SHRINK_FLOOR && self.occupancy < capacity / 3 {
            // Shrinking is an optimization; a failed allocation keeps the
            // current slots.
            if let Err(err) = self.resize(capacity / 2) {
                debug!("keeping {capacity} slots after failed shrink: {err}");
            }
        }
    }

    /// Removes all entries and releases the slot array.
    pub fn clear(&mut self) {
        self.slots = Vec::new();
        self.occupancy = 0;
        self.free_cursor = 0;
    }

    /// Reserves room for at least `additional` more entries.
    ///
    /// # Panics
    ///
    /// Panics or aborts on allocation failure, see [`insert`](Self::insert).
    pub fn reserve(&mut self, additional: usize) {
        self.try_reserve(additional)
            .unwrap_or_else(|err| err.handle());
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        if additional == 0 {
            return Ok(());
        }

        // Growth happens once `occupancy + 1 >= capacity`, so room for `n`
        // entries needs `n + 1` slots.
        let required = self
            .occupancy
            .checked_add(additional)
            .and_then(|n| n.checked_add(1))
            .ok_or(TryReserveError::CapacityOverflow)?;
        if required <= self.capacity() {
            return Ok(());
        }

        let capacity = required
            .max(MIN_CAPACITY)
            .checked_next_power_of_two()
            .ok_or(TryReserveError::CapacityOverflow)?;
        self.resize(capacity)
    }

    fn reserve_for_insert(&mut self) -> Result<(), TryReserveError> {
        let capacity = self.capacity();
        if capacity == 0 {
            return self.resize(MIN_CAPACITY);
        }

        if self.occupancy + 1 >= capacity {
            let capacity = capacity
                .checked_mul(2)
                .ok_or(TryReserveError::CapacityOverflow)?;
            return self.resize(capacity);
        }

        Ok(())
    }

    /// Moves every entry into a freshly allocated array of `capacity` slots.
    /// The table is untouched if the allocation fails.
    fn resize(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        debug_assert!(capacity.is_power_of_two());
        debug_assert!(self.occupancy < capacity);

        let layout = Layout::array::<Option<Slot<K, V>>>(capacity)
            .map_err(|_| TryReserveError::CapacityOverflow)?;
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| TryReserveError::AllocError { layout })?;
        slots.resize_with(capacity, || None);

        trace!(
            "resizing table from {} to {} slots with {} entries",
            self.capacity(),
            capacity,
            self.occupancy
        );

        let old = mem::replace(&mut self.slots, slots);
        self.occupancy = 0;
        self.free_cursor = capacity;

        for slot in old.into_iter().flatten() {
            if self.place(slot.hash, slot.key, slot.value).is_err() {
                unreachable!("rehash into {capacity} slots ran out of landing slots");
            }
        }

        Ok(())
    }

    /// Returns an iterator over all entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.occupancy,
        }
    }

    /// Returns chain statistics for the current table state.
    #[cfg(any(test, feature = "stats"))]
    pub fn stats(&self) -> TableStats {
        let mut stats = TableStats {
            occupancy: self.occupancy,
            capacity: self.capacity(),
            home_entries: 0,
            displaced_entries: 0,
            longest_chain: 0,
            chain_histogram: alloc::vec![0],
        };

        for (index, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else {
                continue;
            };
            if self.home(slot.hash) != index {
                stats.displaced_entries += 1;
                continue;
            }

            stats.home_entries += 1;
            let mut len = 1;
            let mut link = slot.link;
            while link != NO_LINK {
                len += 1;
                link = self.occupied(link).link;
            }

            stats.longest_chain = stats.longest_chain.max(len);
            if stats.chain_histogram.len() <= len {
                stats.chain_histogram.resize(len + 1, 0);
            }
            stats.chain_histogram[len] += 1;
        }

        stats
    }

    #[cfg(test)]
    fn chain(&self, home: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut index = home;
        while index != NO_LINK && self.slots[index].is_some() {
            chain.push(index);
            index = self.occupied(index).link;
        }
        chain
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        let capacity = self.capacity();
        assert!(capacity == 0 || capacity.is_power_of_two(), "{self:?}");
        if capacity > 0 {
            assert!(self.occupancy < capacity, "{self:?}");
        }

        let mut seen = alloc::vec![false; capacity];
        let mut reached = 0;
        for index in 0..capacity {
            let Some(slot) = &self.slots[index] else {
                continue;
            };
            if self.home(slot.hash) != index {
                continue;
            }

            let mut cursor = index;
            loop {
                assert!(!seen[cursor], "slot {cursor} reached twice: {self:?}");
                seen[cursor] = true;
                reached += 1;

                let slot = self.occupied(cursor);
                assert_eq!(self.home(slot.hash), index, "{self:?}");
                if slot.link == NO_LINK {
                    break;
                }
                cursor = slot.link;
            }
        }

        assert_eq!(reached, self.occupancy, "{self:?}");
        assert_eq!(
            self.slots.iter().filter(|slot| slot.is_some()).count(),
            self.occupancy,
            "{self:?}"
        );
        for index in self.free_cursor..capacity {
            assert!(self.slots[index].is_some(), "free slot {index} above cursor");
        }
    }
}

/// An iterator over the entries of a [`HashTable`].
///
/// This struct is created by [`HashTable::iter`]. Entries are yielded in slot
/// order, which is arbitrary and changes whenever the table is mutated.
pub struct Iter<'a, K, V> {
    slots: core::slice::Iter<'a, Option<Slot<K, V>>>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let slot = self.slots.by_ref().flatten().next()?;
        self.remaining -= 1;
        Some((&slot.key, &slot.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K, V> IntoIterator for &'a HashTable<K, V> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
