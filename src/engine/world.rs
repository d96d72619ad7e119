//! The registry itself: entity identities, component pools, and garbage
//! collection.
//!
//! ## Purpose
//! [`World`] owns the identity table that issues versioned entity handles,
//! the table of per-component-type pools, and the deferred-free queue that
//! makes storage growth safe under open views.
//!
//! ## Access model
//! Every operation takes `&self`: the mutable state lives in one
//! `UnsafeCell`, which is what allows entities to be created and components
//! attached *while a view over the same world is open*. The world is neither
//! `Send` nor `Sync`; a registry belongs to one thread for its whole life.
//! Access correctness inside that thread is enforced by construction and by
//! the documented hook contract, not by the borrow checker.
//!
//! ## Identity table
//! Live slots store their own handle; freed slots store the free-list link
//! in the slot field and the *next* version to issue in the version field.
//! Recycling pops the most recently freed slot (LIFO), so handle churn stays
//! concentrated in few slots. The table never shrinks.
//!
//! ## Safety
//! Correctness relies on:
//! - never holding a reference into the state across a call into user code
//!   (hooks re-enter the world),
//! - re-deriving pool pointers by index after any hook fires, because the
//!   pool table may have moved,
//! - routing every buffer replaced under a non-zero iteration depth through
//!   the deferred-free queue.

use std::any::type_name;
use std::cell::{Cell, UnsafeCell};
use std::mem::{align_of, size_of};
use std::ptr;

use crate::engine::component::{component_id_of, Component};
use crate::engine::entity::Entity;
use crate::engine::memory::{alloc_array, array_layout, dealloc_array, DeferredFrees};
use crate::engine::pool::ComponentPool;
use crate::engine::types::{
    entity_id, entity_version, make_handle, ComponentId, EntityHandle, EntityId, INITIAL_CAPACITY,
    NULL_ID, VIEW_MAX_COMPONENTS,
};
use crate::engine::view::{ComponentSet, View};

/// Mutable registry state; only ever touched through the owning [`World`]'s
/// cell.
pub(crate) struct WorldState {
    pub(crate) entities: Vec<EntityHandle>,
    pub(crate) alive_count: u64,
    pub(crate) avail_id: EntityId,

    pub(crate) pools: *mut ComponentPool,
    pub(crate) pool_count: usize,
    pub(crate) pool_capacity: usize,

    pub(crate) frees: DeferredFrees,
}

impl WorldState {
    #[inline]
    fn pool_table_layout(capacity: usize) -> std::alloc::Layout {
        array_layout(size_of::<ComponentPool>(), align_of::<ComponentPool>(), capacity)
    }
}

/// The entity-component registry.
///
/// Owns the entity identity table and one sparse-set pool per component type
/// that has been referenced. Entities are created here, components attach
/// through the [`Entity`] façade, and multi-component iteration goes through
/// [`World::new_view`].
pub struct World {
    state: UnsafeCell<WorldState>,
    user_data: Cell<*mut ()>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            state: UnsafeCell::new(WorldState {
                entities: Vec::new(),
                alive_count: 0,
                avail_id: NULL_ID,
                pools: ptr::null_mut(),
                pool_count: 0,
                pool_capacity: 0,
                frees: DeferredFrees::new(),
            }),
            user_data: Cell::new(ptr::null_mut()),
        }
    }

    #[inline]
    pub(crate) fn state_ptr(&self) -> *mut WorldState {
        self.state.get()
    }

    /// Number of live entities.
    pub fn count(&self) -> u64 {
        // SAFETY: plain field read; no user code runs.
        unsafe { (*self.state.get()).alive_count }
    }

    /// Creates a new live entity, recycling the most recently freed slot if
    /// one exists.
    pub fn new_entity(&self) -> Entity<'_> {
        // SAFETY: exclusive for the duration of this call; no user code
        // runs while the reference is live.
        let state = unsafe { &mut *self.state.get() };

        let handle = if state.avail_id == NULL_ID {
            let slot = state.entities.len();
            debug_assert!(slot < NULL_ID as usize, "identity table exhausted");
            let handle = make_handle(slot as EntityId, 0);
            state.entities.push(handle);
            handle
        } else {
            let slot = state.avail_id;
            let stored = state.entities[slot as usize];
            state.avail_id = entity_id(stored);
            let recycled = make_handle(slot, entity_version(stored));
            state.entities[slot as usize] = recycled;
            recycled
        };

        state.alive_count += 1;
        Entity::new(handle, self)
    }

    /// Returns the entity whose handle sits at identity-table index `index`.
    ///
    /// The entry may be a free-list node rather than a live entity; callers
    /// check [`Entity::valid`] before operating on the result.
    ///
    /// ## Panics
    /// Panics if `index` is beyond the identity table.
    pub fn at(&self, index: usize) -> Entity<'_> {
        // SAFETY: plain indexed read; no user code runs.
        let handle = unsafe { (&(*self.state.get()).entities)[index] };
        Entity::new(handle, self)
    }

    /// Bit-for-bit liveness check: the stored handle at the entity's slot
    /// must equal the handle itself.
    pub(crate) fn is_live(&self, handle: EntityHandle) -> bool {
        // SAFETY: plain reads; no user code runs.
        let state = unsafe { &*self.state.get() };
        let slot = entity_id(handle) as usize;
        slot < state.entities.len() && state.entities[slot] == handle
    }

    /// Destroys a live entity: removes every component it has (firing
    /// destroy hooks), then threads its slot onto the free list with the
    /// version advanced.
    pub(crate) fn destroy_entity(&self, handle: EntityHandle) {
        let state = self.state.get();

        let mut i = 0;
        // Hooks may register new component types, so the pool count is
        // re-read and the pool pointer re-derived on every step.
        // SAFETY: pool pointers are derived fresh from the state after any
        // user code; membership is re-checked after the hook fires.
        unsafe {
            while i < (*state).pool_count {
                if (*(*state).pools.add(i)).has(handle) {
                    self.fire_destroy_hook(i, handle);
                    let pool = (*state).pools.add(i);
                    if (*pool).has(handle) {
                        (*pool).remove(handle);
                    }
                }
                i += 1;
            }
        }

        // SAFETY: exclusive for the remainder of the call; no user code.
        let state = unsafe { &mut *self.state.get() };
        let slot = entity_id(handle);
        let next_version = entity_version(handle).wrapping_add(1);
        state.entities[slot as usize] = make_handle(state.avail_id, next_version);
        state.avail_id = slot;
        state.alive_count -= 1;
    }

    /// Index of the pool for `T`, creating it if this is the first time the
    /// type is referenced on this world.
    fn pool_index<T: Component>(&self) -> usize {
        let id = component_id_of::<T>();

        // SAFETY: exclusive for the duration of this call; no user code
        // runs while the reference is live.
        let state = unsafe { &mut *self.state.get() };

        for i in 0..state.pool_count {
            // SAFETY: i < pool_count.
            if unsafe { (*state.pools.add(i)).component_id() } == id {
                return i;
            }
        }

        if state.pool_count >= state.pool_capacity {
            let new_capacity = if state.pool_capacity < INITIAL_CAPACITY {
                INITIAL_CAPACITY
            } else {
                state.pool_capacity * 2
            };
            let new_pools = alloc_array(WorldState::pool_table_layout(new_capacity)) as *mut ComponentPool;
            if !state.pools.is_null() {
                // SAFETY: bitwise move of the initialized prefix; the old
                // backing array is released without dropping its entries
                // (ownership moved to the new array), deferred while any
                // view still holds pointers into it.
                unsafe {
                    ptr::copy_nonoverlapping(state.pools, new_pools, state.pool_count);
                    state.frees.release(
                        state.pools as *mut u8,
                        WorldState::pool_table_layout(state.pool_capacity),
                    );
                }
            }
            state.pools = new_pools;
            state.pool_capacity = new_capacity;
        }

        let index = state.pool_count;
        // SAFETY: index < pool_capacity after the growth above.
        unsafe {
            state
                .pools
                .add(index)
                .write(ComponentPool::new(id, size_of::<T>(), align_of::<T>()));
        }
        state.pool_count += 1;
        log::debug!("allocated component pool for {}", type_name::<T>());
        index
    }

    /// Resolves an existing pool by component id without creating one.
    pub(crate) fn find_pool(&self, id: ComponentId) -> Option<*mut ComponentPool> {
        let state = self.state.get();
        // SAFETY: plain scans; no user code runs.
        unsafe {
            for i in 0..(*state).pool_count {
                let pool = (*state).pools.add(i);
                if (*pool).component_id() == id {
                    return Some(pool);
                }
            }
        }
        None
    }

    pub(crate) fn has_component<T: Component>(&self, handle: EntityHandle) -> bool {
        let index = self.pool_index::<T>();
        // SAFETY: index is in bounds; membership test runs no user code.
        unsafe { (*(*self.state.get()).pools.add(index)).has(handle) }
    }

    /// Attaches `value` to the entity, fires the create hook, and returns
    /// the installed payload.
    ///
    /// The façade has already asserted the entity is live and the component
    /// absent.
    pub(crate) fn add_component<T: Component>(&self, handle: EntityHandle, value: T) -> &mut T {
        let index = self.pool_index::<T>();

        // SAFETY: the pool pointer and the frees queue are disjoint
        // projections of the state; no user code runs until the payload is
        // written.
        unsafe {
            let state = self.state.get();
            let pool = (*state).pools.add(index);
            let payload = (*pool).add(handle, &mut (*state).frees) as *mut T;
            payload.write(value);
        }

        self.fire_create_hook(index, handle);

        // Re-derive the payload pointer: the hook may have grown the pool.
        // SAFETY: the entity was just added; hooks must not remove it.
        unsafe {
            let pool = (*self.state.get()).pools.add(index);
            &mut *((*pool).get(handle) as *mut T)
        }
    }

    /// Pointer to the entity's `T` payload. The façade has already asserted
    /// presence.
    pub(crate) fn component_ptr<T: Component>(&self, handle: EntityHandle) -> *mut T {
        let index = self.pool_index::<T>();
        // SAFETY: index is in bounds; presence asserted by the caller.
        unsafe { (*(*self.state.get()).pools.add(index)).get(handle) as *mut T }
    }

    /// Detaches `T` from the entity, firing the destroy hook first so it can
    /// still read the payload.
    pub(crate) fn remove_component<T: Component>(&self, handle: EntityHandle) {
        let index = self.pool_index::<T>();
        self.fire_destroy_hook(index, handle);
        // SAFETY: pointer re-derived after the hook; membership re-checked
        // in case the hook violated its contract.
        unsafe {
            let pool = (*self.state.get()).pools.add(index);
            if (*pool).has(handle) {
                (*pool).remove(handle);
            }
        }
    }

    /// Installs (or replaces) the create hook for `T`, allocating the pool
    /// if necessary. The hook fires after a payload of `T` has been
    /// installed and written.
    pub fn set_create_func<T, F>(&self, hook: F)
    where
        T: Component,
        F: for<'w> FnMut(&'w World, Entity<'w>) + 'static,
    {
        let index = self.pool_index::<T>();
        // SAFETY: index is in bounds; replacing the option drops any
        // previous hook, which cannot be mid-fire from safe code.
        unsafe {
            (*(*self.state.get()).pools.add(index)).on_create = Some(Box::new(hook));
        }
    }

    /// Installs (or replaces) the destroy hook for `T`, allocating the pool
    /// if necessary. The hook fires before a payload of `T` is removed and
    /// for every remaining member when the world is dropped.
    pub fn set_destroy_func<T, F>(&self, hook: F)
    where
        T: Component,
        F: for<'w> FnMut(&'w World, Entity<'w>) + 'static,
    {
        let index = self.pool_index::<T>();
        // SAFETY: as in `set_create_func`.
        unsafe {
            (*(*self.state.get()).pools.add(index)).on_destroy = Some(Box::new(hook));
        }
    }

    /// Fires the create hook of pool `index`, if installed.
    ///
    /// The hook is taken out for the duration of the call: the pool table
    /// may move while user code runs, and a recursive fire of the same hook
    /// is skipped rather than re-entered. If the hook installed a
    /// replacement for itself, the replacement wins.
    fn fire_create_hook(&self, index: usize, handle: EntityHandle) {
        // SAFETY: index stays in bounds (pools are never removed) and no
        // reference into the state is held across the call.
        let taken = unsafe { (*(*self.state.get()).pools.add(index)).on_create.take() };
        let Some(mut hook) = taken else { return };
        hook(self, Entity::new(handle, self));
        // SAFETY: pointer re-derived after user code.
        unsafe {
            let pool = (*self.state.get()).pools.add(index);
            if (*pool).on_create.is_none() {
                (*pool).on_create = Some(hook);
            }
        }
    }

    /// Fires the destroy hook of pool `index`, if installed. Same take/restore
    /// discipline as [`World::fire_create_hook`].
    fn fire_destroy_hook(&self, index: usize, handle: EntityHandle) {
        // SAFETY: as in `fire_create_hook`.
        let taken = unsafe { (*(*self.state.get()).pools.add(index)).on_destroy.take() };
        let Some(mut hook) = taken else { return };
        hook(self, Entity::new(handle, self));
        // SAFETY: pointer re-derived after user code.
        unsafe {
            let pool = (*self.state.get()).pools.add(index);
            if (*pool).on_destroy.is_none() {
                (*pool).on_destroy = Some(hook);
            }
        }
    }

    /// Commits pending deferred frees, then shrinks the payload buffer of
    /// every pool holding less than half its capacity (and more than a
    /// handful of members) down to the live count rounded up to a multiple
    /// of [`INITIAL_CAPACITY`].
    ///
    /// Must not be called while any view is open.
    pub fn collect_garbage(&self) {
        // SAFETY: exclusive for the duration of this call; no user code.
        let state = unsafe { &mut *self.state.get() };
        debug_assert!(
            state.frees.depth() == 0,
            "collect_garbage called while a view is open"
        );

        state.frees.commit();

        let mut shrunk = 0usize;
        for i in 0..state.pool_count {
            // SAFETY: i < pool_count.
            if unsafe { (*state.pools.add(i)).shrink_payloads() } {
                shrunk += 1;
            }
        }
        if shrunk > 0 {
            log::debug!("collect_garbage shrank {shrunk} pool(s)");
        }
    }

    /// Opens a view over every entity possessing all component types in `S`
    /// (a tuple of 1 to [`VIEW_MAX_COMPONENTS`] component types).
    ///
    /// If any type in the set has never been referenced, the view is born
    /// exhausted and no pool is allocated for it.
    pub fn new_view<S: ComponentSet>(&self) -> View<'_> {
        let mut ids = [0 as ComponentId; VIEW_MAX_COMPONENTS];
        let len = S::component_ids(&mut ids);
        View::open(self, &ids[..len])
    }

    /// Introspection: `(live members, payload capacity)` of the pool for
    /// `T`, or `None` if the type has never been referenced on this world.
    ///
    /// Never allocates a pool. Intended for diagnostics and tests.
    pub fn pool_stats<T: Component>(&self) -> Option<(usize, usize)> {
        let id = component_id_of::<T>();
        // SAFETY: the pointer was just resolved from the live pool table.
        self.find_pool(id)
            .map(|pool| unsafe { ((*pool).count(), (*pool).capacity()) })
    }

    /// Opaque per-world pointer for embedding callers; never interpreted by
    /// the registry.
    pub fn user_data(&self) -> *mut () {
        self.user_data.get()
    }

    /// Sets the opaque per-world pointer.
    pub fn set_user_data(&self, data: *mut ()) {
        self.user_data.set(data);
    }
}

impl Drop for World {
    fn drop(&mut self) {
        let state = self.state.get();

        // Destroy hooks may register new pools even during teardown, so the
        // count is re-read and every pointer re-derived per step.
        // SAFETY: each pool is deinitialized exactly once; hooks run before
        // its buffers are released.
        unsafe {
            let mut i = 0;
            while i < (*state).pool_count {
                if (*(*state).pools.add(i)).on_destroy.is_some() {
                    let mut j = 0;
                    while j < (*(*state).pools.add(i)).count() {
                        let handle = (*(*state).pools.add(i)).dense_handle(j);
                        self.fire_destroy_hook(i, handle);
                        j += 1;
                    }
                }
                (*(*state).pools.add(i)).deinit();
                i += 1;
            }

            if !(*state).pools.is_null() {
                dealloc_array(
                    (*state).pools as *mut u8,
                    WorldState::pool_table_layout((*state).pool_capacity),
                );
                (*state).pools = ptr::null_mut();
                (*state).pool_count = 0;
                (*state).pool_capacity = 0;
            }
        }
        // The identity table and the deferred-free queue drop normally; the
        // queue commits anything still pending.
    }
}
