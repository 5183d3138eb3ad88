use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::cell::RefCell;
use core::fmt::Debug;
use core::ptr::NonNull;

use crate::error::TryReserveError;
use crate::hash_table::HashTable;
use crate::strategy::Content;
use crate::strategy::KeyStrategy;
use crate::strategy::content_hash;

/// A deduplicating store of byte buffers.
///
/// Interning a buffer returns a handle to the single stored copy of its
/// contents: interning equal bytes twice yields the same slice, at the same
/// address. Handles can therefore be compared and hashed by identity, for
/// example as keys of an [`Identity`](crate::strategy::Identity)-keyed
/// [`HashMap`](crate::HashMap).
///
/// The empty buffer is the one exception to address uniqueness: it owns no
/// allocation, so its handle carries the same dangling address as any other
/// empty `Vec<u8>` or `Box<[u8]>`, and an identity map cannot tell those
/// apart from the interned empty handle.
///
/// Interning only needs `&self`, so handles borrowed from the table stay
/// usable while more buffers are interned. Every stored buffer lives until
/// the table is dropped or [`clear`](Self::clear)ed.
///
/// # Examples
///
/// ```rust
/// use brent_hash::{HashMap, InternTable};
///
/// let interner = InternTable::new();
/// let a = interner.intern_copy(b"let");
/// let b = interner.intern_transfer(b"let".to_vec());
/// assert!(core::ptr::eq(a, b));
///
/// let mut keywords = HashMap::new();
/// keywords.insert(a, 1);
/// assert_eq!(keywords.get(interner.intern_str("let").as_bytes()), Some(&1));
/// ```
#[derive(Default)]
pub struct InternTable {
    // Each key is a buffer released with `Box::into_raw`. The table owns
    // them and reclaims them in `clear` and `Drop`. Slots move these raw
    // pointers around, never the boxes, so handles stay valid.
    table: RefCell<HashTable<NonNull<[u8]>, ()>>,
}

// SAFETY: the table exclusively owns every buffer its keys point to, exactly
// like a `Vec<Box<[u8]>>` would.
unsafe impl Send for InternTable {}

impl Debug for InternTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InternTable")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Drop for InternTable {
    fn drop(&mut self) {
        free_buffers(self.table.get_mut());
    }
}

#[inline]
fn stored_bytes(stored: &NonNull<[u8]>) -> &[u8] {
    // SAFETY: keys come from `Box::into_raw` and are freed only by
    // `free_buffers`, which also removes them from the table.
    unsafe { stored.as_ref() }
}

fn free_buffers(table: &mut HashTable<NonNull<[u8]>, ()>) {
    for (stored, _) in table.iter() {
        // SAFETY: each key was produced by `Box::into_raw` and is reclaimed
        // exactly once, here, before the table forgets it.
        drop(unsafe { Box::from_raw(stored.as_ptr()) });
    }
    table.clear();
}

impl InternTable {
    /// Creates an empty intern table.
    pub const fn new() -> Self {
        Self {
            table: RefCell::new(HashTable::new()),
        }
    }

    /// Returns the number of distinct buffers interned.
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    /// Returns `true` if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Frees every interned buffer.
    ///
    /// Taking `&mut self` guarantees no handle is still borrowed.
    pub fn clear(&mut self) {
        free_buffers(self.table.get_mut());
    }

    #[inline]
    fn handle<'i>(&'i self, stored: NonNull<[u8]>) -> &'i [u8] {
        // SAFETY: `stored` is a live buffer owned by the table. It is read
        // through the raw pointer, so relocating the key never retags it, and
        // it is freed only by `clear` or `Drop`, which both need exclusive
        // access to `self` and so end every `'i` borrow first.
        unsafe { stored.as_ref() }
    }

    fn find(
        table: &HashTable<NonNull<[u8]>, ()>,
        hash: usize,
        bytes: &[u8],
    ) -> Option<NonNull<[u8]>> {
        table
            .find(hash, |k| Content.keys_equal(stored_bytes(k), bytes))
            .map(|(&stored, _)| stored)
    }

    /// Takes ownership of `buffer` and stores it as a new entry.
    fn adopt(
        &self,
        table: &mut HashTable<NonNull<[u8]>, ()>,
        hash: usize,
        buffer: Box<[u8]>,
    ) -> Result<&[u8], TryReserveError> {
        // SAFETY: `Box::into_raw` never returns null.
        let stored = unsafe { NonNull::new_unchecked(Box::into_raw(buffer)) };
        match table.try_insert_unique(hash, stored, ()) {
            Ok(_) => Ok(self.handle(stored)),
            Err(err) => {
                // SAFETY: the table rejected the key, so this is its only owner.
                drop(unsafe { Box::from_raw(stored.as_ptr()) });
                Err(err)
            }
        }
    }

    /// Returns the interned copy of `bytes`, if any.
    pub fn get(&self, bytes: &[u8]) -> Option<&[u8]> {
        let table = self.table.borrow();
        let stored = Self::find(&table, content_hash(bytes), bytes)?;
        Some(self.handle(stored))
    }

    /// Returns `true` if content equal to `bytes` has been interned.
    pub fn contains(&self, bytes: &[u8]) -> bool {
        self.get(bytes).is_some()
    }

    /// Interns a copy of `bytes`.
    ///
    /// The bytes are only copied if no equal content is stored yet.
    ///
    /// # Panics
    ///
    /// Panics or aborts on allocation failure, see
    /// [`HashTable::insert`](crate::HashTable::insert).
    pub fn intern_copy(&self, bytes: &[u8]) -> &[u8] {
        self.try_intern_copy(bytes)
            .unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`intern_copy`](Self::intern_copy).
    pub fn try_intern_copy(&self, bytes: &[u8]) -> Result<&[u8], TryReserveError> {
        let hash = content_hash(bytes);
        let mut table = self.table.borrow_mut();
        if let Some(stored) = Self::find(&table, hash, bytes) {
            return Ok(self.handle(stored));
        }

        let mut owned = Vec::new();
        owned.try_reserve_exact(bytes.len()).map_err(|_| {
            match Layout::array::<u8>(bytes.len()) {
                Ok(layout) => TryReserveError::AllocError { layout },
                Err(_) => TryReserveError::CapacityOverflow,
            }
        })?;
        owned.extend_from_slice(bytes);

        self.adopt(&mut table, hash, owned.into_boxed_slice())
    }

    /// Interns `buffer`, taking ownership of it.
    ///
    /// If equal content is already stored, `buffer` is dropped and the
    /// existing handle is returned. Otherwise the buffer itself is adopted
    /// without copying.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use brent_hash::InternTable;
    /// let interner = InternTable::new();
    /// let buffer: Box<[u8]> = Box::new(*b"owned");
    /// let address = buffer.as_ptr();
    ///
    /// let handle = interner.intern_transfer(buffer);
    /// assert_eq!(handle.as_ptr(), address);
    /// ```
    pub fn intern_transfer(&self, buffer: impl Into<Box<[u8]>>) -> &[u8] {
        self.try_intern_transfer(buffer)
            .unwrap_or_else(|err| err.handle())
    }

    /// Fallible version of [`intern_transfer`](Self::intern_transfer).
    ///
    /// On error the buffer is dropped.
    pub fn try_intern_transfer(
        &self,
        buffer: impl Into<Box<[u8]>>,
    ) -> Result<&[u8], TryReserveError> {
        let buffer = buffer.into();
        let hash = content_hash(&buffer);
        let mut table = self.table.borrow_mut();
        if let Some(stored) = Self::find(&table, hash, &buffer) {
            return Ok(self.handle(stored));
        }

        self.adopt(&mut table, hash, buffer)
    }

    /// Interns a copy of a string.
    pub fn intern_str(&self, s: &str) -> &str {
        let bytes = self.intern_copy(s.as_bytes());
        // SAFETY: the stored buffer has the same content as `s`.
        unsafe { core::str::from_utf8_unchecked(bytes) }
    }

    /// Interns a string, taking ownership of its buffer.
    pub fn intern_string(&self, s: String) -> &str {
        let bytes = self.intern_transfer(s.into_bytes());
        // SAFETY: the stored buffer has the same content as `s`.
        unsafe { core::str::from_utf8_unchecked(bytes) }
    }

    /// Returns chain statistics for the underlying table.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> crate::hash_table::TableStats {
        self.table.borrow().stats()
    }
}
