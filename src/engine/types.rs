//! Core identifier types and the bit-level entity handle layout.
//!
//! This module defines the **fundamental types, sentinels, and tunable
//! constants** shared across the registry: entity management, component
//! pools, and views all agree on the encodings declared here.
//!
//! ## Entity Representation
//!
//! Entities are encoded as a packed 64-bit integer:
//!
//! ```text
//! | version (32) | slot (32) |
//! ```
//!
//! - **Slot** indexes the identity table owned by the [`World`](crate::World).
//! - **Version** is incremented each time a slot is recycled, so handles to a
//!   destroyed entity fail validation even after the slot is reused.
//!
//! The all-ones handle is reserved as the "no entity" sentinel, and the
//! all-ones slot as the "no free slot" free-list terminator. Both follow from
//! the layout and are validated by static assertions below.

/// Packed 64-bit entity identity: `(version << 32) | slot`.
pub type EntityHandle = u64;
/// Slot index into the identity table (low 32 bits of a handle).
pub type EntityId = u32;
/// Generation counter distinguishing reuses of the same slot (high 32 bits).
pub type EntityVersion = u32;

/// Process-lifetime identifier for a component type.
///
/// Ids are dense small integers assigned in first-use order by the global
/// type registry. They are stable for the lifetime of the process only.
pub type ComponentId = u64;

/// Sentinel handle denoting "no entity".
pub const NULL_HANDLE: EntityHandle = EntityHandle::MAX;
/// Sentinel slot denoting "no free slot" (free-list terminator).
pub const NULL_ID: EntityId = EntityId::MAX;

/// Number of bits reserved for the slot index.
pub const ID_BITS: u32 = 32;
/// Number of bits reserved for the version counter.
pub const VERSION_BITS: u32 = 32;

/// Hard cap on the number of component types a single view may intersect.
pub const VIEW_MAX_COMPONENTS: usize = 16;

/// Hard cap on buffers parked in the deferred-free queue before the
/// queue-overflow contract violation fires.
pub const MAX_DEFERRED_FREES: usize = 64;

/// First allocation size (in elements) for pool payload/dense buffers and
/// the pool table, and the rounding granularity used when shrinking.
pub const INITIAL_CAPACITY: usize = 8;

const _: [(); 1] = [(); (ID_BITS + VERSION_BITS == EntityHandle::BITS) as usize];
const _: [(); 1] = [(); (NULL_HANDLE == make_handle(NULL_ID, EntityVersion::MAX)) as usize];
const _: [(); 1] = [(); (VIEW_MAX_COMPONENTS > 0) as usize];

/// Packs a slot index and version into an [`EntityHandle`].
#[inline]
pub const fn make_handle(id: EntityId, version: EntityVersion) -> EntityHandle {
    ((version as EntityHandle) << ID_BITS) | (id as EntityHandle)
}

/// Returns the slot index encoded in a handle.
#[inline]
pub const fn entity_id(handle: EntityHandle) -> EntityId {
    handle as EntityId
}

/// Returns the version encoded in a handle.
#[inline]
pub const fn entity_version(handle: EntityHandle) -> EntityVersion {
    (handle >> ID_BITS) as EntityVersion
}
