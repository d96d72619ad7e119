//! Contract-violation diagnostics.
//!
//! Every failure the registry can detect is a programmer error: operating on
//! a stale handle, double-adding a component, reading a component that is not
//! there, overflowing the deferred-free queue, or requesting an over-wide
//! view. None of these are recoverable at runtime, so the registry halts the
//! process with a diagnostic identifying the class.
//!
//! [`ContractViolation`] models the taxonomy; it implements [`fmt::Display`]
//! and [`std::error::Error`] so the same values are usable in logs or test
//! assertions. The display strings are short and imperative, suitable for a
//! panic payload.

use std::fmt;

use crate::engine::types::EntityHandle;

/// Classification of a caller bug detected by the registry.
///
/// ### Fields
/// Each variant carries just enough context to make the diagnostic
/// actionable: the offending handle, the component type name, or the
/// relevant capacity bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// An operation was invoked on a handle that fails validation, either
    /// because its slot was recycled or because it never referred to a live
    /// entity.
    InvalidEntity {
        /// The handle that failed validation.
        handle: EntityHandle,
    },

    /// A component type was added to an entity that already has it. There is
    /// no implicit replace; remove the component first.
    DuplicateAdd {
        /// Component type name, for diagnostics.
        component: &'static str,
    },

    /// A component was read or removed from an entity that does not have it.
    MissingComponent {
        /// Component type name, for diagnostics.
        component: &'static str,
    },

    /// More buffer releases were deferred during iteration than the fixed
    /// queue holds.
    DeferredQueueOverflow {
        /// Queue capacity that was exceeded.
        capacity: usize,
    },

    /// A view was requested over more component types than the supported
    /// maximum.
    ViewTooWide {
        /// Number of component types requested.
        requested: usize,
        /// Maximum component types per view.
        max: usize,
    },
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::InvalidEntity { handle } => {
                write!(f, "invalid entity handle {:#018x}", handle)
            }
            ContractViolation::DuplicateAdd { component } => {
                write!(f, "entity already has component {}", component)
            }
            ContractViolation::MissingComponent { component } => {
                write!(f, "entity does not have component {}", component)
            }
            ContractViolation::DeferredQueueOverflow { capacity } => {
                write!(f, "deferred-free queue overflow (capacity {})", capacity)
            }
            ContractViolation::ViewTooWide { requested, max } => {
                write!(f, "view over {} component types (max {})", requested, max)
            }
        }
    }
}

impl std::error::Error for ContractViolation {}

/// Halts the process with the violation's diagnostic.
///
/// Kept out of line so the panic machinery stays off the hot paths that
/// guard with it.
#[cold]
#[inline(never)]
pub(crate) fn contract_violation(violation: ContractViolation) -> ! {
    panic!("{violation}");
}
