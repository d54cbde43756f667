// crates/clearance-core/tests/proptest_clearance.rs
// ============================================================================
// Module: Clearance Property-Based Tests
// Description: Property tests for clearance bounds, monotonicity, and filtering.
// Purpose: Check the clearance invariants across generated directories.
// ============================================================================

//! Property-based tests for clearance invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::collections::BTreeSet;

use clearance_core::ClassificationGroup;
use clearance_core::InMemoryDirectory;
use clearance_core::SecurityLevel;
use clearance_core::Subject;
use clearance_core::filter_by_level;
use clearance_core::filter_json_by_level;
use clearance_core::is_authorized;
use common::calculator;
use common::level;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

fn level_strategy() -> impl Strategy<Value = SecurityLevel> {
    (1u8 ..= 5).prop_map(level)
}

fn group_name_strategy() -> impl Strategy<Value = String> {
    "G[0-9]{1,2}"
}

fn registry_strategy() -> impl Strategy<Value = Vec<(String, SecurityLevel, bool)>> {
    prop::collection::vec((group_name_strategy(), level_strategy(), any::<bool>()), 0 .. 12)
}

fn resource_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!({"title": "untagged"})),
        (-3i64 .. 9).prop_map(|required| json!({"minSecurityLevel": required})),
        Just(json!({"minSecurityLevel": "3"})),
    ]
}

fn directory_from(entries: &[(String, SecurityLevel, bool)]) -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    for (name, group_level, active) in entries {
        let group = ClassificationGroup::new(name.as_str(), *group_level);
        let group = if *active { group } else { group.deactivated() };
        directory.upsert_group(group).unwrap();
    }
    directory
}

fn expected_level(
    entries: &[(String, SecurityLevel, bool)],
    memberships: &BTreeSet<String>,
) -> SecurityLevel {
    let mut latest = std::collections::BTreeMap::new();
    for (name, group_level, active) in entries {
        latest.insert(name.clone(), (*group_level, *active));
    }
    latest
        .iter()
        .filter(|(name, (_, active))| *active && memberships.contains(*name))
        .map(|(_, (group_level, _))| *group_level)
        .fold(SecurityLevel::FLOOR, SecurityLevel::max)
}

proptest! {
    #[test]
    fn computed_level_is_max_of_active_memberships(
        entries in registry_strategy(),
        memberships in prop::collection::btree_set(group_name_strategy(), 0 .. 6),
    ) {
        let directory = directory_from(&entries);
        let subject = Subject::new("s", "prop", "Prop").with_groups(memberships.iter().cloned());
        let computed = calculator(&directory).compute_level(Some(&subject)).unwrap();
        prop_assert_eq!(computed, expected_level(&entries, &memberships));
    }

    #[test]
    fn adding_memberships_never_lowers_clearance(
        entries in registry_strategy(),
        base in prop::collection::btree_set(group_name_strategy(), 0 .. 4),
        extra in prop::collection::btree_set(group_name_strategy(), 0 .. 4),
    ) {
        let directory = directory_from(&entries);
        let calculator = calculator(&directory);
        let before = Subject::new("s", "prop", "Prop").with_groups(base.iter().cloned());
        let after = before.clone().with_groups(extra.iter().cloned());
        let before_level = calculator.compute_level(Some(&before)).unwrap();
        let after_level = calculator.compute_level(Some(&after)).unwrap();
        prop_assert!(after_level >= before_level);
    }

    #[test]
    fn filter_is_order_preserving_subset_and_idempotent(
        current in level_strategy(),
        items in prop::collection::vec(resource_strategy(), 0 .. 16),
    ) {
        let once = filter_by_level(current, items.clone());
        prop_assert!(once.len() <= items.len());
        let mut cursor = items.iter();
        for kept in &once {
            prop_assert!(cursor.any(|item| item == kept));
        }
        let twice = filter_by_level(current, once.clone());
        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(filter_json_by_level(current, &Value::Array(items)), once);
    }

    #[test]
    fn authorization_matches_integer_comparison(
        current in level_strategy(),
        required in proptest::option::of(any::<i64>()),
    ) {
        let expected = i64::from(current.get()) >= required.unwrap_or(1);
        prop_assert_eq!(is_authorized(current, required), expected);
    }

    #[test]
    fn raising_clearance_never_hides_resources(
        low in level_strategy(),
        high in level_strategy(),
        items in prop::collection::vec(resource_strategy(), 0 .. 16),
    ) {
        prop_assume!(low <= high);
        let low_view = filter_by_level(low, &items);
        let high_view = filter_by_level(high, &items);
        for item in low_view {
            prop_assert!(high_view.contains(&item));
        }
    }
}
