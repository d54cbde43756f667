// crates/clearance-core/src/interfaces/mod.rs
// ============================================================================
// Module: Clearance Interfaces
// Description: Backend-agnostic directory store contracts.
// Purpose: Define the read surfaces the authorization core depends on.
// Dependencies: thiserror, crate::core
// ============================================================================

//! ## Overview
//! The authorization core reads classification groups and subjects through
//! two traits. Implementations return active records only, perform at most
//! one backend round trip per call, and report backend failures as
//! [`StoreError`] instead of pretending the record is missing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use thiserror::Error;

use crate::core::ClassificationGroup;
use crate::core::GroupId;
use crate::core::Subject;
use crate::core::SubjectId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Directory store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("directory store io error: {0}")]
    Io(String),
    /// Stored data could not be decoded.
    #[error("directory store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("directory store version mismatch: {0}")]
    VersionMismatch(String),
    /// Caller supplied invalid data.
    #[error("directory store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("directory store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Classification Source
// ============================================================================

/// Read access to classification group mappings.
pub trait ClassificationSource: Send + Sync {
    /// Returns the active group with `group_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn find_active_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Option<ClassificationGroup>, StoreError>;

    /// Returns the active groups whose identifiers appear in `group_ids`.
    ///
    /// The default implementation issues one lookup per identifier; backends
    /// that can batch should override it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn find_active_groups(
        &self,
        group_ids: &BTreeSet<GroupId>,
    ) -> Result<Vec<ClassificationGroup>, StoreError> {
        let mut groups = Vec::with_capacity(group_ids.len());
        for group_id in group_ids {
            if let Some(group) = self.find_active_group(group_id)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// Returns every active group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn list_active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError>;
}

// ============================================================================
// SECTION: Subject Store
// ============================================================================

/// Read access to subject records.
pub trait SubjectStore: Send + Sync {
    /// Returns the active subject with `subject_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn find_by_id(&self, subject_id: &SubjectId) -> Result<Option<Subject>, StoreError>;

    /// Returns the active subject whose username equals `username`.
    ///
    /// Callers pass a normalized (lowercase) username.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn find_by_username(&self, username: &str) -> Result<Option<Subject>, StoreError>;
}
