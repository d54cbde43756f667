// crates/clearance-core/src/runtime/clearance.rs
// ============================================================================
// Module: Clearance Calculator
// Description: Derives a requester's effective clearance from group memberships.
// Purpose: Compute per-request clearance without caching.
// Dependencies: crate::{core, interfaces, runtime::registry}
// ============================================================================

//! ## Overview
//! Clearance is the maximum level across a subject's active, registered
//! groups, with level 1 as the floor. Anonymous requesters and subjects with
//! no memberships hold level 1. Adding a membership never lowers the result.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::SecurityLevel;
use crate::core::Subject;
use crate::interfaces::StoreError;
use crate::runtime::registry::ClassificationRegistry;

// ============================================================================
// SECTION: Calculator
// ============================================================================

/// Computes effective clearance levels.
#[derive(Clone)]
pub struct ClearanceCalculator {
    /// Registry consulted for group levels.
    registry: ClassificationRegistry,
}

impl ClearanceCalculator {
    /// Creates a calculator backed by `registry`.
    #[must_use]
    pub const fn new(registry: ClassificationRegistry) -> Self {
        Self { registry }
    }

    /// Returns the registry backing this calculator.
    #[must_use]
    pub const fn registry(&self) -> &ClassificationRegistry {
        &self.registry
    }

    /// Computes the clearance for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the registry cannot be read.
    pub fn compute_level(&self, subject: Option<&Subject>) -> Result<SecurityLevel, StoreError> {
        match subject {
            Some(subject) if !subject.group_memberships.is_empty() => {
                self.registry.max_level_for_groups(&subject.group_memberships)
            }
            _ => Ok(SecurityLevel::FLOOR),
        }
    }
}
