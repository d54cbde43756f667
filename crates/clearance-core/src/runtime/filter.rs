// crates/clearance-core/src/runtime/filter.rs
// ============================================================================
// Module: Access Filter
// Description: Level-based authorization checks over protected resources.
// Purpose: Decide visibility for lists and single lookups.
// Dependencies: serde_json, crate::core
// ============================================================================

//! ## Overview
//! A resource is visible when the requester's level is at least the
//! resource's required level (1 when undeclared). Filtering preserves input
//! order, never adds items, and is idempotent. Single lookups distinguish a
//! missing resource from an insufficient clearance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::AccessCheck;
use crate::core::AccessDenial;
use crate::core::ProtectedResource;
use crate::core::SecurityLevel;

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Returns true when `current` meets `required` (absent means 1).
#[must_use]
pub fn is_authorized(current: SecurityLevel, required: Option<i64>) -> bool {
    current.satisfies(required)
}

/// Checks one resource and reports both sides of the comparison.
#[must_use]
pub fn check_single<R: ProtectedResource + ?Sized>(
    current: SecurityLevel,
    resource: &R,
) -> AccessCheck {
    let required = resource.required_level();
    AccessCheck { allowed: is_authorized(current, required), required: required.unwrap_or(1), current }
}

/// Authorizes a single-resource lookup.
///
/// # Errors
///
/// Returns [`AccessDenial::NotFound`] when `resource` is `None` and
/// [`AccessDenial::Forbidden`] when the level is insufficient.
pub fn authorize_lookup<R: ProtectedResource>(
    current: SecurityLevel,
    resource: Option<R>,
) -> Result<R, AccessDenial> {
    let resource = resource.ok_or(AccessDenial::NotFound)?;
    let check = check_single(current, &resource);
    if check.allowed { Ok(resource) } else { Err(AccessDenial::Forbidden(check)) }
}

// ============================================================================
// SECTION: Filtering
// ============================================================================

/// Keeps the resources visible at `current`, preserving order.
#[must_use]
pub fn filter_by_level<R, I>(current: SecurityLevel, resources: I) -> Vec<R>
where
    R: ProtectedResource,
    I: IntoIterator<Item = R>,
{
    resources
        .into_iter()
        .filter(|resource| is_authorized(current, resource.required_level()))
        .collect()
}

/// Filters a JSON array of resources; any non-array input yields an empty list.
#[must_use]
pub fn filter_json_by_level(current: SecurityLevel, resources: &Value) -> Vec<Value> {
    match resources {
        Value::Array(items) => filter_by_level(current, items).into_iter().cloned().collect(),
        _ => Vec::new(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::filter_json_by_level;
    use crate::core::SecurityLevel;

    #[test]
    fn non_array_input_yields_empty_list() {
        assert!(filter_json_by_level(SecurityLevel::CEILING, &json!({"a": 1})).is_empty());
        assert!(filter_json_by_level(SecurityLevel::CEILING, &json!(null)).is_empty());
        assert!(filter_json_by_level(SecurityLevel::CEILING, &json!("apps")).is_empty());
    }

    #[test]
    fn array_items_without_level_default_to_floor() {
        let items = json!([{"title": "a"}, {"title": "b", "minSecurityLevel": 2}]);
        let visible = filter_json_by_level(SecurityLevel::FLOOR, &items);
        assert_eq!(visible, vec![json!({"title": "a"})]);
    }

    #[test]
    fn integral_float_levels_filter_like_integers() {
        let items = json!([
            {"title": "a", "minSecurityLevel": 2.0},
            {"title": "b", "minSecurityLevel": 2.5},
        ]);
        assert!(filter_json_by_level(SecurityLevel::FLOOR, &items).is_empty());
        let at_two = filter_json_by_level(SecurityLevel::new(2).unwrap(), &items);
        assert_eq!(at_two, vec![json!({"title": "a", "minSecurityLevel": 2.0})]);
    }
}
