#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

cfg_if::cfg_if! {
    if #[cfg(feature = "logging")] {
        macro_rules! trace {
            ($($arg:tt)+) => { log::trace!($($arg)+) };
        }

        macro_rules! debug {
            ($($arg:tt)+) => { log::debug!($($arg)+) };
        }
    } else {
        // Keep the arguments type-checked when logging is compiled out.
        macro_rules! trace {
            ($($arg:tt)+) => {
                if false {
                    let _ = format_args!($($arg)+);
                }
            };
        }

        macro_rules! debug {
            ($($arg:tt)+) => {
                if false {
                    let _ = format_args!($($arg)+);
                }
            };
        }
    }
}

/// The error returned by fallible allocation paths.
pub mod error;

/// Hashing and equality strategies for table keys.
///
/// This module defines the [`Handle`](strategy::Handle) key abstraction and
/// the [`KeyStrategy`](strategy::KeyStrategy) implementations used by the
/// map, set and intern facades.
pub mod strategy;

/// The core chained-scatter table shared by every facade.
pub mod hash_table;

/// A handle-keyed map with read-through fallback.
///
/// This module provides a `HashMap` that wraps the `HashTable` and resolves
/// keys through a [`KeyStrategy`](strategy::KeyStrategy).
pub mod hash_map;

/// A handle set with read-through fallback.
pub mod hash_set;

/// Deduplicated storage of byte buffers.
pub mod intern;

pub use error::TryReserveError;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use intern::InternTable;
pub use strategy::Handle;
pub use strategy::Identity;
pub use strategy::KeyStrategy;
