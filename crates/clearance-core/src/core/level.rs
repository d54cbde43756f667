// crates/clearance-core/src/core/level.rs
// ============================================================================
// Module: Security Levels
// Description: Bounded clearance level type shared by groups, subjects, and resources.
// Purpose: Make out-of-range levels unrepresentable after construction.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`SecurityLevel`] is an integer in `1..=5`. Level 1 is the floor every
//! requester holds, including anonymous ones. Deserialization rejects values
//! outside the range so stores cannot smuggle in a level 0 or 6.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when constructing a level from raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LevelError {
    /// Value falls outside `1..=5`.
    #[error("security level {0} is outside 1..=5")]
    OutOfRange(i64),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Clearance level held by a requester or granted by a group.
///
/// # Invariants
/// - The wrapped value is always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// Lowest level; assigned to anonymous and unresolved requesters.
    pub const FLOOR: Self = Self(1);
    /// Highest level.
    pub const CEILING: Self = Self(5);

    /// Creates a level when `value` is within `1..=5`.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::FLOOR.0 && value <= Self::CEILING.0 { Some(Self(value)) } else { None }
    }

    /// Returns the numeric level.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns true when this level meets `required` (absent means 1).
    #[must_use]
    pub fn satisfies(self, required: Option<i64>) -> bool {
        i64::from(self.0) >= required.unwrap_or(1)
    }

    /// Iterates every valid level in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (Self::FLOOR.0 ..= Self::CEILING.0).map(Self)
    }
}

impl Default for SecurityLevel {
    fn default() -> Self {
        Self::FLOOR
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<i64> for SecurityLevel {
    type Error = LevelError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value).ok().and_then(Self::new).ok_or(LevelError::OutOfRange(value))
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level.0
    }
}

impl From<SecurityLevel> for i64 {
    fn from(level: SecurityLevel) -> Self {
        Self::from(level.0)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
