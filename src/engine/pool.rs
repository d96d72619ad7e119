use std::alloc::Layout;
use std::mem::{align_of, size_of};
use std::ptr;

use crate::engine::component::ComponentHook;
use crate::engine::memory::{alloc_array, array_layout, dealloc_array, DeferredFrees};
use crate::engine::types::{entity_id, ComponentId, EntityHandle, INITIAL_CAPACITY};

/// Invariant:
/// - `dense[0..count]` holds the handles of every member entity; the payload
///   for `dense[i]` sits at byte offset `i * element_size` in `data`.
/// - `sparse[slot]` is the packed index of the member with that slot, or -1.
/// - For every `i < count`: `sparse[entity_id(dense[i])] == i`.
/// - Buffers replaced while a view is open go through `DeferredFrees` so
///   pointers handed out earlier keep reading the old storage.
pub(crate) struct ComponentPool {
    sparse: *mut i64,
    sparse_capacity: usize,

    dense: *mut EntityHandle,
    dense_capacity: usize,

    data: *mut u8,
    count: usize,
    capacity: usize,

    element_size: usize,
    element_align: usize,
    id: ComponentId,

    pub(crate) on_create: Option<ComponentHook>,
    pub(crate) on_destroy: Option<ComponentHook>,
}

impl ComponentPool {
    pub(crate) fn new(id: ComponentId, element_size: usize, element_align: usize) -> Self {
        Self {
            sparse: ptr::null_mut(),
            sparse_capacity: 0,
            dense: ptr::null_mut(),
            dense_capacity: 0,
            data: ptr::null_mut(),
            count: 0,
            capacity: 0,
            element_size,
            element_align,
            id,
            on_create: None,
            on_destroy: None,
        }
    }

    #[inline]
    pub(crate) fn component_id(&self) -> ComponentId {
        self.id
    }

    /// Number of member entities.
    #[inline]
    pub(crate) fn count(&self) -> usize {
        self.count
    }

    /// Payload capacity in elements.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// O(1) membership test; in bounds for any handle.
    #[inline]
    pub(crate) fn has(&self, entity: EntityHandle) -> bool {
        let slot = entity_id(entity) as usize;
        // SAFETY: slot is bounds-checked against the sparse extent first.
        slot < self.sparse_capacity && unsafe { *self.sparse.add(slot) } != -1
    }

    #[inline]
    fn data_layout(&self, capacity: usize) -> Layout {
        array_layout(self.element_size, self.element_align, capacity)
    }

    /// Pointer to the payload at packed index `index`.
    ///
    /// ## Safety
    /// `index` must be within the payload buffer's capacity.
    #[inline]
    pub(crate) unsafe fn payload_at(&self, index: usize) -> *mut u8 {
        // SAFETY: per this function's contract.
        unsafe { self.data.add(index * self.element_size) }
    }

    /// Handle stored at packed index `index` of the dense array.
    ///
    /// Entries at or beyond `count()` are stale handles left behind by
    /// swap-and-pop; callers that may read them (a view cursor after
    /// mid-iteration removals) filter through `has`.
    ///
    /// ## Safety
    /// `index` must be within the dense buffer's capacity, i.e. below the
    /// highest `count()` observed since the buffer last grew.
    #[inline]
    pub(crate) unsafe fn dense_handle(&self, index: usize) -> EntityHandle {
        debug_assert!(index < self.dense_capacity);
        // SAFETY: per this function's contract.
        unsafe { *self.dense.add(index) }
    }

    /// Pointer to `entity`'s payload.
    ///
    /// ## Safety
    /// `self.has(entity)` must hold.
    #[inline]
    pub(crate) unsafe fn get(&self, entity: EntityHandle) -> *mut u8 {
        debug_assert!(self.has(entity));
        // SAFETY: membership guarantees the sparse entry is a valid packed
        // index.
        unsafe {
            let position = *self.sparse.add(entity_id(entity) as usize);
            self.payload_at(position as usize)
        }
    }

    /// Appends `entity` and returns a pointer to its **uninitialized**
    /// payload slot. The caller writes the payload before anything else
    /// reads it.
    ///
    /// Any buffer replaced by growth is routed through `frees`, so
    /// references obtained from this pool before the call stay readable.
    ///
    /// ## Safety
    /// `entity` must not already be a member.
    pub(crate) unsafe fn add(
        &mut self,
        entity: EntityHandle,
        frees: &mut DeferredFrees,
    ) -> *mut u8 {
        debug_assert!(!self.has(entity));

        if self.count >= self.capacity {
            let new_capacity = if self.capacity < INITIAL_CAPACITY {
                INITIAL_CAPACITY
            } else {
                self.capacity * 2
            };
            let new_data = alloc_array(self.data_layout(new_capacity));
            if !self.data.is_null() {
                // SAFETY: both buffers cover at least `count` elements; the
                // old buffer was produced by alloc_array with this layout.
                unsafe {
                    ptr::copy_nonoverlapping(self.data, new_data, self.count * self.element_size);
                    frees.release(self.data, self.data_layout(self.capacity));
                }
            }
            self.data = new_data;
            self.capacity = new_capacity;
        }

        let slot = entity_id(entity) as usize;
        if slot >= self.sparse_capacity {
            let new_capacity = slot + 1;
            let layout = array_layout(size_of::<i64>(), align_of::<i64>(), new_capacity);
            let new_sparse = alloc_array(layout) as *mut i64;
            if !self.sparse.is_null() {
                // SAFETY: old buffer holds `sparse_capacity` initialized
                // entries and was allocated with the matching layout.
                unsafe {
                    ptr::copy_nonoverlapping(self.sparse, new_sparse, self.sparse_capacity);
                    frees.release(
                        self.sparse as *mut u8,
                        array_layout(size_of::<i64>(), align_of::<i64>(), self.sparse_capacity),
                    );
                }
            }
            for i in self.sparse_capacity..new_capacity {
                // SAFETY: i < new_capacity, freshly allocated above.
                unsafe { *new_sparse.add(i) = -1 };
            }
            self.sparse = new_sparse;
            self.sparse_capacity = new_capacity;
        }

        // SAFETY: slot < sparse_capacity after the growth above.
        unsafe { *self.sparse.add(slot) = self.count as i64 };

        if self.count >= self.dense_capacity {
            let new_capacity = if self.dense_capacity < INITIAL_CAPACITY {
                INITIAL_CAPACITY
            } else {
                self.dense_capacity * 2
            };
            let layout = array_layout(size_of::<EntityHandle>(), align_of::<EntityHandle>(), new_capacity);
            let new_dense = alloc_array(layout) as *mut EntityHandle;
            if !self.dense.is_null() {
                // SAFETY: old buffer holds `count` initialized handles and
                // was allocated with the matching layout.
                unsafe {
                    ptr::copy_nonoverlapping(self.dense, new_dense, self.count);
                    frees.release(
                        self.dense as *mut u8,
                        array_layout(
                            size_of::<EntityHandle>(),
                            align_of::<EntityHandle>(),
                            self.dense_capacity,
                        ),
                    );
                }
            }
            self.dense = new_dense;
            self.dense_capacity = new_capacity;
        }

        // SAFETY: count < dense_capacity and count < capacity after growth.
        unsafe {
            *self.dense.add(self.count) = entity;
            let payload = self.payload_at(self.count);
            self.count += 1;
            payload
        }
    }

    /// Unlinks `entity` with the standard sparse-set swap-and-pop. The last
    /// member's handle and payload move into the vacated position; the copy
    /// is skipped when `entity` is itself the last member.
    ///
    /// Destroy hooks are the caller's responsibility and fire before this.
    ///
    /// ## Safety
    /// `self.has(entity)` must hold.
    pub(crate) unsafe fn remove(&mut self, entity: EntityHandle) {
        debug_assert!(self.has(entity));

        // SAFETY: membership guarantees the sparse entry is a valid packed
        // index and `count > 0`; every index below stays within capacity.
        unsafe {
            let slot = entity_id(entity) as usize;
            let position = *self.sparse.add(slot) as usize;
            let last = self.count - 1;
            let moved = *self.dense.add(last);

            *self.sparse.add(entity_id(moved) as usize) = position as i64;
            *self.dense.add(position) = moved;
            *self.sparse.add(slot) = -1;

            if position != last {
                ptr::copy_nonoverlapping(
                    self.payload_at(last),
                    self.payload_at(position),
                    self.element_size,
                );
            }
        }

        self.count -= 1;
    }

    /// Shrinks the payload buffer to the live count rounded up to a multiple
    /// of [`INITIAL_CAPACITY`], freeing the old buffer immediately. Returns
    /// whether a shrink happened.
    ///
    /// Only worthwhile pools shrink: more than [`INITIAL_CAPACITY`] members
    /// and capacity above twice the count.
    pub(crate) fn shrink_payloads(&mut self) -> bool {
        if self.count <= INITIAL_CAPACITY || self.capacity <= self.count * 2 {
            return false;
        }

        let mut new_capacity = self.count;
        let remainder = new_capacity % INITIAL_CAPACITY;
        if remainder != 0 {
            new_capacity += INITIAL_CAPACITY - remainder;
        }

        let new_data = alloc_array(self.data_layout(new_capacity));
        // SAFETY: the live prefix is `count` elements in both buffers; the
        // old buffer was produced by alloc_array with this layout, and no
        // view is open when the world shrinks (asserted by the caller).
        unsafe {
            ptr::copy_nonoverlapping(self.data, new_data, self.count * self.element_size);
            dealloc_array(self.data, self.data_layout(self.capacity));
        }
        self.data = new_data;
        self.capacity = new_capacity;
        true
    }

    /// Releases every buffer and drops the hooks. The pool is unusable
    /// afterwards.
    ///
    /// Remaining members' destroy hooks are the caller's responsibility and
    /// fire before this.
    ///
    /// ## Safety
    /// Must be called at most once, with no live pointers into the buffers.
    pub(crate) unsafe fn deinit(&mut self) {
        // SAFETY: buffers were produced by alloc_array with these layouts
        // and are released exactly once here.
        unsafe {
            if !self.sparse.is_null() {
                dealloc_array(
                    self.sparse as *mut u8,
                    array_layout(size_of::<i64>(), align_of::<i64>(), self.sparse_capacity),
                );
            }
            if !self.dense.is_null() {
                dealloc_array(
                    self.dense as *mut u8,
                    array_layout(
                        size_of::<EntityHandle>(),
                        align_of::<EntityHandle>(),
                        self.dense_capacity,
                    ),
                );
            }
            if !self.data.is_null() {
                dealloc_array(self.data, self.data_layout(self.capacity));
            }
        }

        self.sparse = ptr::null_mut();
        self.sparse_capacity = 0;
        self.dense = ptr::null_mut();
        self.dense_capacity = 0;
        self.data = ptr::null_mut();
        self.count = 0;
        self.capacity = 0;
        self.on_create = None;
        self.on_destroy = None;
    }
}
