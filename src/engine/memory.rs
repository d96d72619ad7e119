//! Raw buffer allocation and the deferred-free queue.
//!
//! Pool buffers are managed by hand so that a buffer replaced during growth
//! can outlive the replacement: while any view is open, references handed
//! out earlier in the walk may still point into the old storage. The
//! [`DeferredFrees`] queue parks such buffers until the outermost view
//! closes, then releases them in one batch.
//!
//! The queue also owns the **iteration depth** counter, since the two pieces
//! of state are only ever consulted together: a release is immediate exactly
//! when the depth is zero.

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};

use crate::engine::error::{contract_violation, ContractViolation};
use crate::engine::types::MAX_DEFERRED_FREES;

/// Computes the layout of `count` elements of `element_size` bytes at
/// `element_align` alignment.
///
/// ## Panics
/// Panics if the total size overflows `isize`; allocation requests that
/// large are fatal, like any other out-of-memory condition.
#[inline]
pub(crate) fn array_layout(element_size: usize, element_align: usize, count: usize) -> Layout {
    let size = element_size
        .checked_mul(count)
        .expect("buffer size overflow");
    Layout::from_size_align(size, element_align).expect("invalid buffer layout")
}

/// Allocates an uninitialized array described by `layout`.
///
/// Zero-sized layouts never touch the allocator; a dangling-but-aligned
/// pointer is returned instead, per standard allocator discipline.
/// Out-of-memory aborts via [`handle_alloc_error`].
pub(crate) fn alloc_array(layout: Layout) -> *mut u8 {
    if layout.size() == 0 {
        return layout.align() as *mut u8;
    }
    // SAFETY: layout has non-zero size.
    let ptr = unsafe { alloc(layout) };
    if ptr.is_null() {
        handle_alloc_error(layout);
    }
    ptr
}

/// Releases an array previously produced by [`alloc_array`] with the same
/// layout. Zero-sized layouts are a no-op.
///
/// ## Safety
/// `ptr` must have been returned by [`alloc_array`] with exactly `layout`,
/// and must not be released twice.
pub(crate) unsafe fn dealloc_array(ptr: *mut u8, layout: Layout) {
    if layout.size() != 0 {
        // SAFETY: per this function's contract.
        unsafe { dealloc(ptr, layout) };
    }
}

/// A buffer whose release has been postponed.
#[derive(Clone, Copy)]
pub(crate) struct FreedBlock {
    ptr: *mut u8,
    layout: Layout,
}

/// Reallocation-aware release queue.
///
/// While `depth > 0` (at least one view is open), released buffers are
/// parked instead of freed; when the depth returns to zero the queue commits
/// and every parked buffer is deallocated. The queue capacity is fixed at
/// [`MAX_DEFERRED_FREES`]; exceeding it is a contract violation.
pub(crate) struct DeferredFrees {
    pending: Vec<FreedBlock>,
    depth: i64,
}

impl DeferredFrees {
    pub(crate) fn new() -> Self {
        Self {
            pending: Vec::with_capacity(MAX_DEFERRED_FREES),
            depth: 0,
        }
    }

    /// Number of views currently open.
    #[inline]
    pub(crate) fn depth(&self) -> i64 {
        self.depth
    }

    /// Records that a view has been opened.
    #[inline]
    pub(crate) fn begin_iteration(&mut self) {
        self.depth += 1;
    }

    /// Records that a view has closed; commits the queue when the last one
    /// does.
    pub(crate) fn end_iteration(&mut self) {
        self.depth -= 1;
        if self.depth <= 0 {
            self.commit();
        }
    }

    /// Releases a buffer now, or parks it until the outermost view closes.
    ///
    /// ## Safety
    /// Same contract as [`dealloc_array`]; additionally the buffer must stay
    /// untouched by the caller once handed over.
    pub(crate) unsafe fn release(&mut self, ptr: *mut u8, layout: Layout) {
        if layout.size() == 0 {
            return;
        }
        if self.depth <= 0 {
            // SAFETY: forwarded caller contract.
            unsafe { dealloc_array(ptr, layout) };
            return;
        }

        if self.pending.len() >= MAX_DEFERRED_FREES {
            contract_violation(ContractViolation::DeferredQueueOverflow {
                capacity: MAX_DEFERRED_FREES,
            });
        }

        log::trace!(
            "deferring free of {} bytes (depth {})",
            layout.size(),
            self.depth
        );
        self.pending.push(FreedBlock { ptr, layout });
    }

    /// Frees every parked buffer.
    pub(crate) fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        log::trace!("committing {} deferred frees", self.pending.len());
        for block in self.pending.drain(..) {
            // SAFETY: blocks are only enqueued by `release`, which forwards
            // the alloc_array contract; draining guarantees single release.
            unsafe { dealloc_array(block.ptr, block.layout) };
        }
    }
}

impl Drop for DeferredFrees {
    fn drop(&mut self) {
        self.commit();
    }
}
