//! Component type identity and lifecycle hooks.
//!
//! This module provides the global registry that assigns stable
//! [`ComponentId`] values to Rust component types, plus the [`Component`]
//! marker trait and the callable type used for per-component create/destroy
//! hooks.
//!
//! ## Design
//! - Ids are compact integers (`0, 1, 2, …`) handed out in first-use order.
//! - The mapping is process-global and lives for the process lifetime; it is
//!   not stable across runs and is not required to be.
//! - Registration is implicit: the first call to [`component_id_of`] for a
//!   type assigns its id.
//!
//! ## Concurrency
//! The registry is protected by an `RwLock` so id lookup from multiple
//! worlds (each single-threaded on its own) stays coherent. A poisoned lock
//! is ignored; the map is only ever appended to, so a panicked writer cannot
//! leave it torn.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::engine::entity::Entity;
use crate::engine::types::ComponentId;
use crate::engine::world::World;

/// Marker trait for component payloads.
///
/// Components are plain, copy-friendly records: `Copy` makes byte-level
/// moves inside the pools sound and means payloads never need drop glue.
/// Every `Copy + 'static` type is a component; there is nothing to derive.
pub trait Component: Copy + 'static {}

impl<T: Copy + 'static> Component for T {}

/// Per-component lifecycle callback.
///
/// `on_create` hooks fire after the payload has been installed and written,
/// so the hook may read the new component through the entity. `on_destroy`
/// hooks fire before the payload is removed, so the hook still sees the last
/// value. Hooks may call back into the [`World`], with one exception: a hook
/// must not structurally mutate the pool that is firing it (the pool's
/// invariants are mid-update while the hook runs).
pub type ComponentHook = Box<dyn for<'w> FnMut(&'w World, Entity<'w>)>;

/// Mapping between Rust component types and compact [`ComponentId`] values.
struct TypeRegistry {
    next_id: ComponentId,
    by_type: HashMap<TypeId, ComponentId>,
}

static REGISTRY: OnceLock<RwLock<TypeRegistry>> = OnceLock::new();

fn type_registry() -> &'static RwLock<TypeRegistry> {
    REGISTRY.get_or_init(|| {
        RwLock::new(TypeRegistry {
            next_id: 0,
            by_type: HashMap::new(),
        })
    })
}

/// Returns the [`ComponentId`] for `T`, assigning one on first reference.
///
/// ## Behavior
/// - The fast path is a shared-lock map lookup.
/// - On first use the id counter is advanced under the write lock; a racing
///   first use of the same type resolves to whichever registration landed.
pub fn component_id_of<T: Component>() -> ComponentId {
    let registry = type_registry();
    let type_id = TypeId::of::<T>();

    if let Some(&id) = registry
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_type
        .get(&type_id)
    {
        return id;
    }

    let mut registry = registry.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(&id) = registry.by_type.get(&type_id) {
        return id;
    }

    let id = registry.next_id;
    registry.next_id += 1;
    registry.by_type.insert(type_id, id);
    id
}
