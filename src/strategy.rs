use core::hash::BuildHasher;
use core::num::NonZeroUsize;
use core::ptr::NonNull;

/// Hash substituted for a zero hash and for the null address.
///
/// Zero never reaches a slot: the table remaps it to this value.
pub const ZERO_HASH_SENTINEL: usize = 1_234_567;

/// Number of leading bytes mixed into a [`content_hash`].
pub const CONTENT_HASH_PREFIX: usize = 127;

/// A fixed-width key whose identity is its address.
///
/// Maps and sets never look behind a handle: two handles are the same key
/// when [`Handle::same`] says so, and they hash by [`Handle::addr`].
pub trait Handle: Copy {
    /// The address (or integer value) identifying this handle.
    fn addr(self) -> usize;

    /// Whether this is the null handle. Null keys are rejected by every
    /// facade operation.
    #[inline]
    fn is_null(self) -> bool {
        self.addr() == 0
    }

    /// Identity comparison.
    #[inline]
    fn same(self, other: Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Handle for usize {
    #[inline]
    fn addr(self) -> usize {
        self
    }
}

impl Handle for NonZeroUsize {
    #[inline]
    fn addr(self) -> usize {
        self.get()
    }

    #[inline]
    fn is_null(self) -> bool {
        false
    }
}

impl<T: ?Sized> Handle for *const T {
    #[inline]
    fn addr(self) -> usize {
        self.cast::<()>() as usize
    }

    // Fat pointers also compare their metadata, so `&buf[..2]` and `&buf[..3]`
    // stay distinct keys.
    #[inline]
    fn same(self, other: Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl<T: ?Sized> Handle for *mut T {
    #[inline]
    fn addr(self) -> usize {
        self.cast::<()>() as usize
    }

    #[inline]
    fn same(self, other: Self) -> bool {
        core::ptr::eq(self, other)
    }
}

impl<T: ?Sized> Handle for NonNull<T> {
    #[inline]
    fn addr(self) -> usize {
        self.as_ptr().cast::<()>() as usize
    }

    #[inline]
    fn is_null(self) -> bool {
        false
    }

    #[inline]
    fn same(self, other: Self) -> bool {
        core::ptr::eq(self.as_ptr(), other.as_ptr())
    }
}

impl<T: ?Sized> Handle for &T {
    #[inline]
    fn addr(self) -> usize {
        (self as *const T).cast::<()>() as usize
    }

    #[inline]
    fn is_null(self) -> bool {
        false
    }

    #[inline]
    fn same(self, other: Self) -> bool {
        core::ptr::eq(self, other)
    }
}

/// A hashing and equality policy for keys of type `K`.
///
/// Facades are generic over their strategy, so each (facade, strategy) pair is
/// monomorphized and no dynamic dispatch happens on the hot path. A strategy
/// must be consistent: keys that compare equal must hash equally.
pub trait KeyStrategy<K: ?Sized> {
    /// Hashes `key`. Zero is allowed; the table remaps it.
    fn hash_key(&self, key: &K) -> usize;

    /// Returns `true` if `a` and `b` denote the same key.
    fn keys_equal(&self, a: &K, b: &K) -> bool;
}

/// Pointer identity with an address-derived hash.
///
/// This is the default strategy of [`HashMap`](crate::HashMap) and
/// [`HashSet`](crate::HashSet).
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<K: Handle> KeyStrategy<K> for Identity {
    #[inline]
    fn hash_key(&self, key: &K) -> usize {
        // `key.addr()` would resolve to the `&K` impl and hash the reference.
        scramble(K::addr(*key))
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        K::same(*a, *b)
    }
}

/// Spreads the bits of an address so that aligned pointers and small integers
/// both land on distinct low bits.
///
/// The null address maps to [`ZERO_HASH_SENTINEL`].
#[inline]
pub fn scramble(addr: usize) -> usize {
    if addr == 0 {
        return ZERO_HASH_SENTINEL;
    }

    let h = (addr as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    (h ^ (h >> 32)) as usize
}

/// Pointer identity, hashing the address through a [`BuildHasher`].
///
/// Useful when handle values are adversarial or tightly clustered and the
/// plain [`scramble`] would produce long chains.
#[derive(Clone, Debug, Default)]
pub struct Hashed<S> {
    hash_builder: S,
}

impl<S> Hashed<S> {
    /// Creates a strategy hashing addresses with `hash_builder`.
    pub fn new(hash_builder: S) -> Self {
        Self { hash_builder }
    }
}

impl<K: Handle, S: BuildHasher> KeyStrategy<K> for Hashed<S> {
    #[inline]
    fn hash_key(&self, key: &K) -> usize {
        self.hash_builder.hash_one(K::addr(*key)) as usize
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        K::same(*a, *b)
    }
}

/// Identity strategy backed by foldhash's deterministic fast hasher.
#[cfg(feature = "foldhash")]
pub type FoldIdentity = Hashed<foldhash::fast::FixedState>;

/// Byte-content equality with a bounded-cost content hash.
///
/// Used by the [`InternTable`](crate::InternTable).
#[derive(Clone, Copy, Debug, Default)]
pub struct Content;

impl<K: AsRef<[u8]> + ?Sized> KeyStrategy<K> for Content {
    #[inline]
    fn hash_key(&self, key: &K) -> usize {
        content_hash(key.as_ref())
    }

    #[inline]
    fn keys_equal(&self, a: &K, b: &K) -> bool {
        a.as_ref() == b.as_ref()
    }
}

/// Hashes at most the first [`CONTENT_HASH_PREFIX`] bytes of `bytes`, then
/// folds in the full length.
///
/// Buffers of equal length that differ only past the prefix collide here and
/// are told apart by the full comparison in [`Content::keys_equal`].
pub fn content_hash(bytes: &[u8]) -> usize {
    let mut hash = bytes.first().map_or(0, |&b| (b as usize) << 7);
    for &byte in bytes.iter().take(CONTENT_HASH_PREFIX) {
        hash = hash.wrapping_mul(1_000_003) ^ byte as usize;
    }
    hash ^ bytes.len()
}
