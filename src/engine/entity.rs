//! The entity façade.
//!
//! [`Entity`] pairs a packed handle with a non-owning reference to the
//! [`World`] that issued it, so component operations read as methods on the
//! entity instead of calls into the registry. The value is two words and
//! freely copyable.
//!
//! Every operation (except the raw accessors) asserts the handle is still
//! live: a destroyed entity's slot carries a newer version, so stale copies
//! fail validation forever, even after the slot is recycled.

use std::any::type_name;
use std::fmt;
use std::ptr;

use crate::engine::component::Component;
use crate::engine::error::{contract_violation, ContractViolation};
use crate::engine::types::{entity_id, entity_version, EntityHandle, EntityId, EntityVersion, NULL_HANDLE};
use crate::engine::world::World;

/// A versioned entity handle bound to its world.
///
/// Obtained from [`World::new_entity`], [`World::at`], or a view cursor.
/// The null sentinel from [`Entity::null`] is bound to no world and is never
/// valid.
#[derive(Clone, Copy)]
pub struct Entity<'w> {
    handle: EntityHandle,
    world: Option<&'w World>,
}

impl<'w> Entity<'w> {
    #[inline]
    pub(crate) fn new(handle: EntityHandle, world: &'w World) -> Self {
        Self {
            handle,
            world: Some(world),
        }
    }

    /// The sentinel entity: null handle, no world, never valid.
    pub fn null() -> Entity<'static> {
        Entity {
            handle: NULL_HANDLE,
            world: None,
        }
    }

    /// Returns whether this handle still names a live entity: the world is
    /// present and the identity table entry at the handle's slot equals the
    /// handle bit-for-bit.
    pub fn valid(&self) -> bool {
        match self.world {
            Some(world) => world.is_live(self.handle),
            None => false,
        }
    }

    fn require_valid(&self) -> &'w World {
        match self.world {
            Some(world) if world.is_live(self.handle) => world,
            _ => contract_violation(ContractViolation::InvalidEntity {
                handle: self.handle,
            }),
        }
    }

    /// Destroys the entity: removes every component it has (firing destroy
    /// hooks) and recycles its slot with the version advanced. Every copy of
    /// this handle is invalid afterwards.
    pub fn destroy(self) {
        let world = self.require_valid();
        world.destroy_entity(self.handle);
    }

    /// Returns whether the entity has a `T` component.
    pub fn has<T: Component>(&self) -> bool {
        self.require_valid().has_component::<T>(self.handle)
    }

    /// Attaches `value` to the entity and returns the installed payload.
    /// The create hook for `T`, if any, has already fired by the time this
    /// returns.
    ///
    /// There is no implicit replace: adding a component the entity already
    /// has is a contract violation.
    pub fn add<T: Component>(&self, value: T) -> &'w mut T {
        let world = self.require_valid();
        if world.has_component::<T>(self.handle) {
            contract_violation(ContractViolation::DuplicateAdd {
                component: type_name::<T>(),
            });
        }
        world.add_component(self.handle, value)
    }

    /// Shared access to the entity's `T` payload.
    pub fn get<T: Component>(&self) -> &'w T {
        let world = self.require_valid();
        if !world.has_component::<T>(self.handle) {
            contract_violation(ContractViolation::MissingComponent {
                component: type_name::<T>(),
            });
        }
        // SAFETY: presence was just asserted; the pointer stays readable
        // for 'w under the deferred-free discipline.
        unsafe { &*world.component_ptr::<T>(self.handle) }
    }

    /// Mutable access to the entity's `T` payload.
    pub fn get_mut<T: Component>(&self) -> &'w mut T {
        let world = self.require_valid();
        if !world.has_component::<T>(self.handle) {
            contract_violation(ContractViolation::MissingComponent {
                component: type_name::<T>(),
            });
        }
        // SAFETY: as in `get`; exclusivity is the caller's discipline, as
        // everywhere on this single-threaded registry.
        unsafe { &mut *world.component_ptr::<T>(self.handle) }
    }

    /// Detaches `T` from the entity. The destroy hook, if any, fires before
    /// the payload is removed.
    pub fn remove<T: Component>(&self) {
        let world = self.require_valid();
        if !world.has_component::<T>(self.handle) {
            contract_violation(ContractViolation::MissingComponent {
                component: type_name::<T>(),
            });
        }
        world.remove_component::<T>(self.handle);
    }

    /// The slot index of this (live) entity.
    pub fn id(&self) -> EntityId {
        self.require_valid();
        entity_id(self.handle)
    }

    /// The version of this (live) entity.
    pub fn version(&self) -> EntityVersion {
        self.require_valid();
        entity_version(self.handle)
    }

    /// The raw packed handle; available on any entity, including stale and
    /// null ones.
    #[inline]
    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    /// The world this entity is bound to, if any.
    #[inline]
    pub fn world(&self) -> Option<&'w World> {
        self.world
    }
}

impl PartialEq for Entity<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
            && match (self.world, other.world) {
                (Some(a), Some(b)) => ptr::eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl Eq for Entity<'_> {}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.handle == NULL_HANDLE {
            f.write_str("Entity(null)")
        } else {
            write!(
                f,
                "Entity(slot {}, version {})",
                entity_id(self.handle),
                entity_version(self.handle)
            )
        }
    }
}
