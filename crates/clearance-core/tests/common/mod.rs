// crates/clearance-core/tests/common/mod.rs
// ============================================================================
// Module: Clearance Core Test Helpers
// Description: Shared directory fixtures for core integration tests.
// ============================================================================

//! Shared fixtures for clearance core tests.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use clearance_core::ClassificationGroup;
use clearance_core::ClassificationRegistry;
use clearance_core::ClassificationSource;
use clearance_core::ClearanceCalculator;
use clearance_core::GroupId;
use clearance_core::InMemoryDirectory;
use clearance_core::SecurityLevel;
use clearance_core::StoreError;
use clearance_core::Subject;
use clearance_core::SubjectId;
use clearance_core::SubjectStore;

/// Builds a level from a literal known to be in range.
pub fn level(value: u8) -> SecurityLevel {
    SecurityLevel::new(value).unwrap()
}

/// Directory with the registry {G1:1, G2:3, G3:5}.
pub fn scenario_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory.upsert_group(ClassificationGroup::new("G1", level(1))).unwrap();
    directory.upsert_group(ClassificationGroup::new("G2", level(3))).unwrap();
    directory.upsert_group(ClassificationGroup::new("G3", level(5))).unwrap();
    directory
}

/// Calculator over `directory`.
pub fn calculator(directory: &InMemoryDirectory) -> ClearanceCalculator {
    ClearanceCalculator::new(ClassificationRegistry::new(Arc::new(directory.clone())))
}

/// Builds a group identifier set.
pub fn groups(ids: &[&str]) -> BTreeSet<GroupId> {
    ids.iter().map(|id| GroupId::new(*id)).collect()
}

/// Store whose every call fails, counting invocations.
#[derive(Debug, Default)]
pub struct FailingStore {
    /// Number of calls observed.
    pub calls: AtomicUsize,
}

impl FailingStore {
    /// Records a call and returns the canned failure.
    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Io("connection refused".to_string()))
    }

    /// Returns how many calls were made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ClassificationSource for FailingStore {
    fn find_active_group(&self, _: &GroupId) -> Result<Option<ClassificationGroup>, StoreError> {
        self.fail()
    }

    fn list_active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError> {
        self.fail()
    }
}

impl SubjectStore for FailingStore {
    fn find_by_id(&self, _: &SubjectId) -> Result<Option<Subject>, StoreError> {
        self.fail()
    }

    fn find_by_username(&self, _: &str) -> Result<Option<Subject>, StoreError> {
        self.fail()
    }
}
