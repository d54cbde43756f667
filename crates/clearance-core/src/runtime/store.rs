// crates/clearance-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Directory
// Description: Mutex-guarded in-memory directory for tests and demos.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryDirectory`] implements both store traits over two `BTreeMap`s.
//! Writes are immediately visible to subsequent lookups. It is not intended
//! for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::ClassificationGroup;
use crate::core::GroupId;
use crate::core::Subject;
use crate::core::SubjectId;
use crate::core::seed::demo_subjects;
use crate::core::seed::standard_classification_groups;
use crate::interfaces::ClassificationSource;
use crate::interfaces::StoreError;
use crate::interfaces::SubjectStore;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Directory contents guarded by one mutex.
#[derive(Debug, Default)]
struct DirectoryState {
    /// Classification groups keyed by identifier.
    groups: BTreeMap<GroupId, ClassificationGroup>,
    /// Subjects keyed by identifier.
    subjects: BTreeMap<SubjectId, Subject>,
}

/// In-memory directory store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDirectory {
    /// Shared directory state.
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory holding the standard groups and demo subjects.
    #[must_use]
    pub fn seeded() -> Self {
        let mut state = DirectoryState::default();
        for group in standard_classification_groups() {
            state.groups.insert(group.group_id.clone(), group);
        }
        for subject in demo_subjects() {
            state.subjects.insert(subject.subject_id.clone(), subject);
        }
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Inserts or replaces a classification group.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory lock is poisoned.
    pub fn upsert_group(&self, group: ClassificationGroup) -> Result<(), StoreError> {
        self.lock()?.groups.insert(group.group_id.clone(), group);
        Ok(())
    }

    /// Inserts or replaces a subject.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when another subject already owns the
    /// username, or [`StoreError`] when the lock is poisoned.
    pub fn upsert_subject(&self, subject: Subject) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let conflict = guard.subjects.values().any(|existing| {
            existing.username == subject.username && existing.subject_id != subject.subject_id
        });
        if conflict {
            return Err(StoreError::Invalid(format!(
                "username already registered: {}",
                subject.username
            )));
        }
        guard.subjects.insert(subject.subject_id.clone(), subject);
        drop(guard);
        Ok(())
    }

    /// Marks a group inactive; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory lock is poisoned.
    pub fn deactivate_group(&self, group_id: &GroupId) -> Result<bool, StoreError> {
        Ok(self.lock()?.groups.get_mut(group_id).map(|group| group.active = false).is_some())
    }

    /// Marks a subject inactive; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory lock is poisoned.
    pub fn deactivate_subject(&self, subject_id: &SubjectId) -> Result<bool, StoreError> {
        Ok(self.lock()?.subjects.get_mut(subject_id).map(|subject| subject.active = false).is_some())
    }

    /// Locks the directory state.
    fn lock(&self) -> Result<MutexGuard<'_, DirectoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("directory mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Trait Implementations
// ============================================================================

impl ClassificationSource for InMemoryDirectory {
    fn find_active_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Option<ClassificationGroup>, StoreError> {
        Ok(self.lock()?.groups.get(group_id).filter(|group| group.active).cloned())
    }

    fn find_active_groups(
        &self,
        group_ids: &BTreeSet<GroupId>,
    ) -> Result<Vec<ClassificationGroup>, StoreError> {
        let guard = self.lock()?;
        Ok(group_ids
            .iter()
            .filter_map(|group_id| guard.groups.get(group_id))
            .filter(|group| group.active)
            .cloned()
            .collect())
    }

    fn list_active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError> {
        Ok(self.lock()?.groups.values().filter(|group| group.active).cloned().collect())
    }
}

impl SubjectStore for InMemoryDirectory {
    fn find_by_id(&self, subject_id: &SubjectId) -> Result<Option<Subject>, StoreError> {
        Ok(self.lock()?.subjects.get(subject_id).filter(|subject| subject.active).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Subject>, StoreError> {
        Ok(self
            .lock()?
            .subjects
            .values()
            .find(|subject| subject.active && subject.username == username)
            .cloned())
    }
}
