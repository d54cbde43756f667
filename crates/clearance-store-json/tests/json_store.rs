// crates/clearance-store-json/tests/json_store.rs
// ============================================================================
// Module: JSON Directory Store Tests
// Description: File-backed lookups, live re-reads, and fail-closed decoding.
// ============================================================================

//! ## Overview
//! Exercises the JSON directory store against temporary directories.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use clearance_core::ClassificationRegistry;
use clearance_core::ClassificationSource;
use clearance_core::ClearanceCalculator;
use clearance_core::GroupId;
use clearance_core::SecurityLevel;
use clearance_core::StoreError;
use clearance_core::Subject;
use clearance_core::SubjectResolver;
use clearance_core::SubjectStore;
use clearance_core::seed::demo_subjects;
use clearance_core::seed::standard_classification_groups;
use clearance_store_json::GROUPS_FILE_NAME;
use clearance_store_json::JsonDirectoryStore;
use clearance_store_json::JsonStoreError;
use clearance_store_json::MAX_DIRECTORY_FILE_BYTES;
use clearance_store_json::SUBJECTS_FILE_NAME;
use serde_json::json;
use tempfile::TempDir;

fn seeded_store(temp: &TempDir) -> JsonDirectoryStore {
    let store = JsonDirectoryStore::new(temp.path()).unwrap();
    for group in standard_classification_groups() {
        store.upsert_group(&group).unwrap();
    }
    for subject in demo_subjects() {
        store.upsert_subject(&subject).unwrap();
    }
    store
}

#[test]
fn missing_files_read_as_empty_directory() {
    let temp = TempDir::new().unwrap();
    let store = JsonDirectoryStore::new(temp.path().join("fresh")).unwrap();
    assert!(store.list_active_groups().unwrap().is_empty());
    assert!(store.find_by_username("user.basic").unwrap().is_none());
}

#[test]
fn seeded_directory_resolves_every_demo_subject() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(seeded_store(&temp));
    let resolver = SubjectResolver::new(store.clone());
    let calculator = ClearanceCalculator::new(ClassificationRegistry::new(store.clone()));
    for (expected, subject) in SecurityLevel::all().zip(demo_subjects()) {
        let by_id = resolver.resolve(Some(subject.subject_id.as_str())).unwrap();
        assert_eq!(by_id.as_ref(), Some(&subject));
        assert_eq!(calculator.compute_level(by_id.as_ref()).unwrap(), expected);
    }
}

#[test]
fn external_edits_are_visible_to_the_next_lookup() {
    let temp = TempDir::new().unwrap();
    let store = seeded_store(&temp);
    let managers = GroupId::new("Portal_Managers");
    assert!(store.find_active_group(&managers).unwrap().is_some());
    let edited = json!([
        {"group_id": "Portal_Users", "level": 1},
        {"group_id": "Portal_Managers", "level": 3, "active": false}
    ]);
    fs::write(temp.path().join(GROUPS_FILE_NAME), edited.to_string()).unwrap();
    assert!(store.find_active_group(&managers).unwrap().is_none());
    let wanted: BTreeSet<GroupId> = [GroupId::new("Portal_Users"), managers].into_iter().collect();
    assert_eq!(store.find_active_groups(&wanted).unwrap().len(), 1);
}

#[test]
fn usernames_in_files_match_case_insensitively() {
    let temp = TempDir::new().unwrap();
    let store = JsonDirectoryStore::new(temp.path()).unwrap();
    let subjects = json!([
        {"subject_id": "u1", "username": "Mixed.Case", "display_name": "Mixed"}
    ]);
    fs::write(temp.path().join(SUBJECTS_FILE_NAME), subjects.to_string()).unwrap();
    let found = store.find_by_username("mixed.case").unwrap().unwrap();
    assert_eq!(found.username, "mixed.case");
    assert!(found.active);
}

#[test]
fn out_of_range_levels_fail_closed() {
    let temp = TempDir::new().unwrap();
    let store = JsonDirectoryStore::new(temp.path()).unwrap();
    fs::write(temp.path().join(GROUPS_FILE_NAME), r#"[{"group_id": "G", "level": 6}]"#).unwrap();
    let err = store.list_active_groups().unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)), "unexpected error: {err}");
}

#[test]
fn duplicate_group_ids_fail_closed() {
    let temp = TempDir::new().unwrap();
    let store = JsonDirectoryStore::new(temp.path()).unwrap();
    let groups = json!([
        {"group_id": "G", "level": 1},
        {"group_id": "G", "level": 5}
    ]);
    fs::write(temp.path().join(GROUPS_FILE_NAME), groups.to_string()).unwrap();
    assert!(matches!(store.find_active_group(&GroupId::new("G")), Err(StoreError::Corrupt(_))));
}

#[test]
fn malformed_json_fails_closed() {
    let temp = TempDir::new().unwrap();
    let store = JsonDirectoryStore::new(temp.path()).unwrap();
    fs::write(temp.path().join(SUBJECTS_FILE_NAME), "{not json").unwrap();
    assert!(matches!(store.find_by_username("anyone"), Err(StoreError::Corrupt(_))));
}

#[test]
fn oversized_files_are_rejected() {
    let temp = TempDir::new().unwrap();
    let store = JsonDirectoryStore::new(temp.path()).unwrap();
    let size = usize::try_from(MAX_DIRECTORY_FILE_BYTES).unwrap() + 16;
    fs::write(temp.path().join(GROUPS_FILE_NAME), vec![b' '; size]).unwrap();
    assert!(matches!(store.list_active_groups(), Err(StoreError::Corrupt(_))));
}

#[test]
fn username_conflicts_are_rejected_on_write() {
    let temp = TempDir::new().unwrap();
    let store = seeded_store(&temp);
    let clash = Subject::new("someone-else", "EMPLOYEE.REGULAR", "Clash");
    assert!(matches!(store.upsert_subject(&clash), Err(JsonStoreError::Invalid(_))));
}

#[test]
fn deactivation_hides_records() {
    let temp = TempDir::new().unwrap();
    let store = seeded_store(&temp);
    let admin = demo_subjects().remove(4);
    assert!(store.deactivate_subject(&admin.subject_id).unwrap());
    assert!(store.find_by_id(&admin.subject_id).unwrap().is_none());
    assert!(store.deactivate_group(&GroupId::new("Portal_TopSecret")).unwrap());
    assert!(!store.deactivate_group(&GroupId::new("Nope")).unwrap());
    assert_eq!(store.list_active_groups().unwrap().len(), 4);
}
