use core::alloc::Layout;

/// The error type for fallible table operations.
///
/// Returned by the `try_*` family of methods when growing a table's slot
/// array fails. The table is left exactly as it was before the call.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum TryReserveError {
    /// The requested slot count does not fit in the address space.
    #[error("capacity overflow")]
    CapacityOverflow,

    /// The allocator returned an error for the given layout.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    AllocError {
        /// The layout of the slot array that could not be allocated.
        layout: Layout,
    },
}

impl TryReserveError {
    /// Diverges the way the infallible entry points are expected to: an
    /// allocation failure aborts through the global handler, an overflow
    /// panics.
    #[cold]
    #[inline(never)]
    pub(crate) fn handle(self) -> ! {
        match self {
            TryReserveError::CapacityOverflow => panic!("capacity overflow"),
            TryReserveError::AllocError { layout } => alloc::alloc::handle_alloc_error(layout),
        }
    }
}
