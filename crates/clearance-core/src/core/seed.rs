// crates/clearance-core/src/core/seed.rs
// ============================================================================
// Module: Standard Directory Seed
// Description: Standard classification groups and demo subjects.
// Purpose: Give stores, demos, and tests one shared baseline directory.
// Dependencies: crate::core::{directory, level}
// ============================================================================

//! ## Overview
//! The standard portal directory maps five external groups onto levels 1
//! through 5 and provides one demo subject per level. Demo subject ids are
//! id-shaped so both resolver lookup paths can be exercised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::directory::ClassificationGroup;
use crate::core::directory::RoleTag;
use crate::core::directory::Subject;
use crate::core::level::SecurityLevel;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Standard groups as `(group id, level, description)`, lowest level first.
const STANDARD_GROUPS: [(&str, u8, &str); 5] = [
    ("Portal_Users", 1, "Basic portal users; public content"),
    ("Portal_Employees", 2, "Regular employees; internal content"),
    ("Portal_Managers", 3, "Department managers; sensitive content"),
    ("Portal_Executives", 4, "Senior executives; confidential content"),
    ("Portal_TopSecret", 5, "Top clearance; all classified content"),
];

/// Demo subjects as `(subject id, username, display name, role, group count)`.
///
/// A subject with group count `n` belongs to the first `n` standard groups.
const DEMO_SUBJECTS: [(&str, &str, &str, RoleTag, usize); 5] = [
    ("subj0basic00000001", "user.basic", "Basic User", RoleTag::Viewer, 1),
    ("subj0employee00002", "employee.regular", "Regular Employee", RoleTag::Viewer, 2),
    ("subj0manager000003", "manager.department", "Department Manager", RoleTag::Editor, 3),
    ("subj0executive0004", "executive.senior", "Senior Executive", RoleTag::Editor, 4),
    ("subj0admin00000005", "admin.security", "Security Administrator", RoleTag::Admin, 5),
];

/// Mail domain used for demo subject addresses.
const DEMO_MAIL_DOMAIN: &str = "organization.example";

// ============================================================================
// SECTION: Seed Builders
// ============================================================================

/// Returns the five standard classification groups, lowest level first.
#[must_use]
pub fn standard_classification_groups() -> Vec<ClassificationGroup> {
    STANDARD_GROUPS
        .iter()
        .filter_map(|(group_id, level, description)| {
            SecurityLevel::new(*level).map(|level| {
                ClassificationGroup::new(*group_id, level).with_description(*description)
            })
        })
        .collect()
}

/// Returns one active demo subject per level, lowest level first.
#[must_use]
pub fn demo_subjects() -> Vec<Subject> {
    DEMO_SUBJECTS
        .iter()
        .map(|(subject_id, username, display_name, role, group_count)| {
            Subject::new(*subject_id, username, *display_name)
                .with_role(*role)
                .with_email(format!("{username}@{DEMO_MAIL_DOMAIN}"))
                .with_groups(STANDARD_GROUPS.iter().take(*group_count).map(|(group, _, _)| *group))
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::demo_subjects;
    use super::standard_classification_groups;

    #[test]
    fn standard_groups_cover_every_level_once() {
        let levels: Vec<u8> =
            standard_classification_groups().iter().map(|group| group.level.get()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn demo_subjects_accumulate_memberships() {
        let subjects = demo_subjects();
        assert_eq!(subjects.len(), 5);
        for (index, subject) in subjects.iter().enumerate() {
            assert_eq!(subject.group_memberships.len(), index + 1);
            assert!(subject.active);
            assert_eq!(subject.username, subject.username.to_lowercase());
        }
    }
}
