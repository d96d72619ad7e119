//! Multi-component view iteration.
//!
//! A [`View`] is a short-lived cursor over the intersection of up to
//! [`VIEW_MAX_COMPONENTS`] component pools. The smallest pool drives the
//! walk: its dense array is scanned from the highest index down, and each
//! candidate is kept only if every other pool also contains it.
//!
//! ## Mutation under iteration
//!
//! Walking high-to-low means entities appended during iteration land at
//! indices the cursor has already passed and are not visited. Storage growth
//! triggered mid-walk is safe for a different reason: while any view is
//! open, replaced buffers are parked on the world's deferred-free queue, so
//! references handed out earlier keep reading the old storage.
//!
//! ## RAII Integration
//!
//! Opening a view (even one that resolves empty) raises the world's
//! iteration depth; dropping it lowers the depth and, when the outermost
//! view closes, commits every parked buffer. Views need not close in LIFO
//! order.

use std::ptr;

use crate::engine::component::{component_id_of, Component};
use crate::engine::entity::Entity;
use crate::engine::error::{contract_violation, ContractViolation};
use crate::engine::pool::ComponentPool;
use crate::engine::types::{ComponentId, EntityHandle, NULL_HANDLE, VIEW_MAX_COMPONENTS};
use crate::engine::world::World;

/// A set of component types a view intersects.
///
/// Implemented for tuples of [`Component`] types up to arity
/// [`VIEW_MAX_COMPONENTS`]; a single-component view is the one-element tuple
/// `(T,)`.
pub trait ComponentSet {
    /// Writes the set's component ids into `into` in declaration order and
    /// returns how many were written.
    fn component_ids(into: &mut [ComponentId; VIEW_MAX_COMPONENTS]) -> usize;
}

macro_rules! impl_component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn component_ids(into: &mut [ComponentId; VIEW_MAX_COMPONENTS]) -> usize {
                let mut len = 0;
                $(
                    into[len] = component_id_of::<$ty>();
                    len += 1;
                )+
                len
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
impl_component_set!(A, B, C, D, E, F, G, H, I);
impl_component_set!(A, B, C, D, E, F, G, H, I, J);
impl_component_set!(A, B, C, D, E, F, G, H, I, J, K);
impl_component_set!(A, B, C, D, E, F, G, H, I, J, K, L);
impl_component_set!(A, B, C, D, E, F, G, H, I, J, K, L, M);
impl_component_set!(A, B, C, D, E, F, G, H, I, J, K, L, M, N);
impl_component_set!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O);
impl_component_set!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);

/// Cursor over the entities possessing every component type of a set.
///
/// Usage follows the explicit-cursor shape:
///
/// ```ignore
/// let mut view = world.new_view::<(Tag, Transform)>();
/// while view.valid() {
///     let transform = view.get::<Transform>();
///     view.next();
/// }
/// ```
pub struct View<'w> {
    world: &'w World,
    to_pool: [ComponentId; VIEW_MAX_COMPONENTS],
    pools: [*mut ComponentPool; VIEW_MAX_COMPONENTS],
    pool_count: usize,
    driver: *mut ComponentPool,
    index: usize,
    entity: EntityHandle,
}

impl<'w> View<'w> {
    /// Resolves `ids` against the world's pools and positions the cursor on
    /// the first qualifying entity. A never-referenced component type makes
    /// the view born exhausted without allocating a pool.
    pub(crate) fn open(world: &'w World, ids: &[ComponentId]) -> View<'w> {
        if ids.len() > VIEW_MAX_COMPONENTS {
            contract_violation(ContractViolation::ViewTooWide {
                requested: ids.len(),
                max: VIEW_MAX_COMPONENTS,
            });
        }

        // The depth rises for every view, exhausted or not; Drop rebalances.
        // SAFETY: plain counter bump; no user code runs.
        unsafe { (*world.state_ptr()).frees.begin_iteration() };

        let mut view = View {
            world,
            to_pool: [0; VIEW_MAX_COMPONENTS],
            pools: [ptr::null_mut(); VIEW_MAX_COMPONENTS],
            pool_count: 0,
            driver: ptr::null_mut(),
            index: 0,
            entity: NULL_HANDLE,
        };

        for (i, &id) in ids.iter().enumerate() {
            let Some(pool) = world.find_pool(id) else {
                view.pool_count = 0;
                view.driver = ptr::null_mut();
                return view;
            };
            view.to_pool[i] = id;
            view.pools[i] = pool;
            view.pool_count = i + 1;

            // Smallest pool drives; ties keep the earliest in the set.
            // SAFETY: `pool` was just resolved from the live pool table.
            unsafe {
                if view.driver.is_null() || (*pool).count() < (*view.driver).count() {
                    view.driver = pool;
                }
            }
        }

        // SAFETY: the driver pointer is live; dense reads stay within the
        // buffer it had at this moment.
        unsafe {
            if !view.driver.is_null() && (*view.driver).count() != 0 {
                view.index = (*view.driver).count() - 1;
                view.entity = (*view.driver).dense_handle(view.index);
                if !view.contains(view.entity) {
                    view.next();
                }
            }
        }

        view
    }

    fn contains(&self, entity: EntityHandle) -> bool {
        for i in 0..self.pool_count {
            // SAFETY: pools were resolved at construction; buffers they may
            // still point at are parked, not freed, while this view is open.
            if !unsafe { (*self.pools[i]).has(entity) } {
                return false;
            }
        }
        true
    }

    /// Whether the cursor currently rests on an entity.
    #[inline]
    pub fn valid(&self) -> bool {
        self.entity != NULL_HANDLE
    }

    /// Advances the cursor to the next entity present in every pool of the
    /// set, or to exhaustion.
    pub fn next(&mut self) {
        loop {
            if self.index > 0 {
                self.index -= 1;
                // SAFETY: index only descends from the driver count observed
                // at construction, which the dense buffer's capacity covers;
                // stale entries past a shrunken count fail `contains`.
                self.entity = unsafe { (*self.driver).dense_handle(self.index) };
            } else {
                self.entity = NULL_HANDLE;
            }

            if self.entity == NULL_HANDLE || self.contains(self.entity) {
                break;
            }
        }
    }

    fn payload<T: Component>(&self) -> *mut T {
        debug_assert!(self.valid(), "view cursor is exhausted");

        let id = component_id_of::<T>();
        let mut index = 0;
        let mut found = false;
        for i in 0..self.pool_count {
            if self.to_pool[i] == id {
                index = i;
                found = true;
                break;
            }
        }
        debug_assert!(found, "component type is not part of this view");

        // SAFETY: dispatch resolved against the view's own set; the current
        // entity is a member of every pool in it.
        unsafe { (*self.pools[index]).get(self.entity) as *mut T }
    }

    /// Shared access to the current entity's `T` payload.
    ///
    /// `T` must be one of the view's component types; this is checked only
    /// by a debug assertion.
    pub fn get<T: Component>(&self) -> &'w T {
        // SAFETY: see `payload`; the reference stays readable for 'w under
        // the deferred-free discipline.
        unsafe { &*self.payload::<T>() }
    }

    /// Mutable access to the current entity's `T` payload.
    ///
    /// `T` must be one of the view's component types; this is checked only
    /// by a debug assertion.
    pub fn get_mut<T: Component>(&self) -> &'w mut T {
        // SAFETY: as in `get`; exclusivity is the caller's discipline on
        // this single-threaded registry.
        unsafe { &mut *self.payload::<T>() }
    }

    /// The entity the cursor currently rests on (the null entity once
    /// exhausted).
    pub fn get_entity(&self) -> Entity<'w> {
        Entity::new(self.entity, self.world)
    }
}

impl Drop for View<'_> {
    fn drop(&mut self) {
        // SAFETY: the world outlives this borrow; lowering the depth may
        // commit parked buffers, which no longer have live readers once the
        // outermost view closes.
        unsafe { (*self.world.state_ptr()).frees.end_iteration() };
    }
}
