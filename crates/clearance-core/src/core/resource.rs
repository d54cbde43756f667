// crates/clearance-core/src/core/resource.rs
// ============================================================================
// Module: Protected Resources
// Description: Abstraction over anything that carries a minimum clearance level.
// Purpose: Let the access filter operate on apps, files, and raw JSON alike.
// Dependencies: serde, serde_json, crate::core::level
// ============================================================================

//! ## Overview
//! A protected resource exposes an optional required level. Absent means 1.
//! JSON resources carry it as `minSecurityLevel` (or `requiredLevel`); a
//! value that is present but not an integer can never be satisfied, so the
//! resource is hidden instead of leaking.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::core::level::SecurityLevel;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Primary JSON field holding a resource's required level.
pub const MIN_LEVEL_FIELD: &str = "minSecurityLevel";

/// Alternate JSON field accepted for the required level.
pub const REQUIRED_LEVEL_FIELD: &str = "requiredLevel";

/// Requirement used for malformed level values; no level satisfies it.
pub const UNSATISFIABLE_LEVEL: i64 = i64::MAX;

/// Largest magnitude at which every integral `f64` is exact (2^53).
const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Anything gated by a minimum clearance level.
pub trait ProtectedResource {
    /// Returns the required level, or `None` when the resource does not declare one.
    fn required_level(&self) -> Option<i64>;
}

impl<T: ProtectedResource + ?Sized> ProtectedResource for &T {
    fn required_level(&self) -> Option<i64> {
        (**self).required_level()
    }
}

impl ProtectedResource for Value {
    fn required_level(&self) -> Option<i64> {
        let raw = self.get(MIN_LEVEL_FIELD).or_else(|| self.get(REQUIRED_LEVEL_FIELD))?;
        match raw {
            Value::Null => None,
            Value::Number(number) => Some(
                number
                    .as_i64()
                    .or_else(|| number.as_f64().and_then(integral_float))
                    .unwrap_or(UNSATISFIABLE_LEVEL),
            ),
            _ => Some(UNSATISFIABLE_LEVEL),
        }
    }
}

/// Converts floats such as `2.0` to their integer value.
#[allow(clippy::cast_possible_truncation, reason = "Integral and within the exact f64 range.")]
fn integral_float(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() <= MAX_EXACT_FLOAT_INTEGER).then_some(value as i64)
}

// ============================================================================
// SECTION: Access Checks
// ============================================================================

/// Outcome of checking one resource against a requester's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessCheck {
    /// Whether the requester may see the resource.
    pub allowed: bool,
    /// Effective requirement (1 when the resource declares none).
    pub required: i64,
    /// Requester's level.
    pub current: SecurityLevel,
}

/// Reason a single-resource lookup was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenial {
    /// The resource does not exist.
    NotFound,
    /// The resource exists but the requester's level is too low.
    Forbidden(AccessCheck),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
