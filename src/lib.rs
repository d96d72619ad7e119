//! # sparse-ecs
//!
//! Lightweight sparse-set entity-component registry.
//!
//! ## Design Goals
//! - Stable, versioned 64-bit entity handles with slot recycling
//! - Per-component sparse-set pools: O(1) membership, insert, and remove
//!   over tightly packed payloads
//! - Cache-friendly multi-component iteration through views
//! - Storage growth under an open view never invalidates references already
//!   handed out (deferred deallocation)
//!
//! The registry is strictly single-threaded: a [`World`] belongs to one
//! thread for its whole life and is neither `Send` nor `Sync`.
//!
//! ```
//! use sparse_ecs::prelude::*;
//!
//! #[derive(Clone, Copy)]
//! struct Transform { x: f32, y: f32 }
//! #[derive(Clone, Copy)]
//! struct Tag { name: &'static str }
//!
//! let world = World::new();
//!
//! let e = world.new_entity();
//! e.add(Transform { x: 5.0, y: 3.0 });
//! e.add(Tag { name: "Bob" });
//!
//! let mut view = world.new_view::<(Tag, Transform)>();
//! while view.valid() {
//!     let tag = view.get::<Tag>();
//!     let transform = view.get::<Transform>();
//!     println!("{}: {}, {}", tag.name, transform.x, transform.y);
//!     view.next();
//! }
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core registry types

pub use engine::world::World;

pub use engine::entity::Entity;

pub use engine::view::{ComponentSet, View};

pub use engine::component::{component_id_of, Component, ComponentHook};

pub use engine::error::ContractViolation;

pub use engine::types::{
    entity_id, entity_version, make_handle, ComponentId, EntityHandle, EntityId, EntityVersion,
    INITIAL_CAPACITY, MAX_DEFERRED_FREES, NULL_HANDLE, NULL_ID, VIEW_MAX_COMPONENTS,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used registry types.
///
/// Import with:
/// ```rust
/// use sparse_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        component_id_of, Component, ComponentSet, Entity, EntityHandle, View, World, NULL_HANDLE,
    };
}
