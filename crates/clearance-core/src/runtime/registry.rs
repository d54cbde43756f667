// crates/clearance-core/src/runtime/registry.rs
// ============================================================================
// Module: Classification Registry
// Description: Group-to-level lookups over a classification source.
// Purpose: Answer "what level does this group grant" and "what is the max".
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The registry is a thin, stateless view over a [`ClassificationSource`].
//! Unknown and inactive groups contribute nothing; neither is an error.
//! Backend failures propagate so the request boundary can decide the
//! fallback.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::ClassificationGroup;
use crate::core::GroupId;
use crate::core::SecurityLevel;
use crate::interfaces::ClassificationSource;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Maps external group identifiers to clearance levels.
#[derive(Clone)]
pub struct ClassificationRegistry {
    /// Backing classification source.
    source: Arc<dyn ClassificationSource>,
}

impl ClassificationRegistry {
    /// Creates a registry over `source`.
    #[must_use]
    pub fn new(source: Arc<dyn ClassificationSource>) -> Self {
        Self { source }
    }

    /// Returns the level granted by `group_id` when the group exists and is active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the source cannot be read.
    pub fn lookup_level(&self, group_id: &GroupId) -> Result<Option<SecurityLevel>, StoreError> {
        Ok(self
            .source
            .find_active_group(group_id)?
            .filter(|group| group.active && group.group_id == *group_id)
            .map(|group| group.level))
    }

    /// Returns the highest level granted by any active group in `group_ids`.
    ///
    /// An empty set, or a set with no active matches, yields level 1 without
    /// consulting the source for the empty case.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the source cannot be read.
    pub fn max_level_for_groups(
        &self,
        group_ids: &BTreeSet<GroupId>,
    ) -> Result<SecurityLevel, StoreError> {
        if group_ids.is_empty() {
            return Ok(SecurityLevel::FLOOR);
        }
        let groups = self.source.find_active_groups(group_ids)?;
        Ok(groups
            .iter()
            .filter(|group| group.active && group_ids.contains(&group.group_id))
            .map(|group| group.level)
            .fold(SecurityLevel::FLOOR, SecurityLevel::max))
    }

    /// Returns every active group ordered by level, then identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the source cannot be read.
    pub fn active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError> {
        let mut groups: Vec<ClassificationGroup> =
            self.source.list_active_groups()?.into_iter().filter(|group| group.active).collect();
        groups.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.group_id.cmp(&b.group_id)));
        Ok(groups)
    }
}
