// crates/clearance-core/src/runtime/resolver.rs
// ============================================================================
// Module: Subject Resolver
// Description: Maps caller-supplied tokens to active directory subjects.
// Purpose: Disambiguate opaque identifiers from usernames and look them up.
// Dependencies: thiserror, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A token is either an opaque subject identifier or a username. Tokens made
//! of 15 to 64 ASCII alphanumerics that contain at least one digit are
//! treated as identifiers first; a miss falls through to the username
//! lookup so alphanumeric usernames still resolve. Everything else goes
//! straight to the case-insensitive username lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::Subject;
use crate::core::SubjectId;
use crate::core::normalize_username;
use crate::interfaces::StoreError;
use crate::interfaces::SubjectStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum length of an id-shaped token.
pub const MIN_ID_TOKEN_LENGTH: usize = 15;

/// Maximum length of an id-shaped token.
pub const MAX_ID_TOKEN_LENGTH: usize = 64;

/// Maximum accepted token length in bytes.
pub const MAX_TOKEN_LENGTH: usize = 256;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while resolving a subject or computing a clearance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClearanceError {
    /// Token is structurally unusable.
    #[error("invalid subject token: {0}")]
    InvalidToken(String),
    /// Directory store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Token Shape
// ============================================================================

/// Structural classification of a subject token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    /// Looks like an opaque directory identifier.
    OpaqueId,
    /// Treated as a username.
    Username,
}

impl TokenShape {
    /// Classifies an already trimmed token.
    #[must_use]
    pub fn classify(token: &str) -> Self {
        let id_shaped = (MIN_ID_TOKEN_LENGTH ..= MAX_ID_TOKEN_LENGTH).contains(&token.len())
            && token.bytes().all(|byte| byte.is_ascii_alphanumeric())
            && token.bytes().any(|byte| byte.is_ascii_digit());
        if id_shaped { Self::OpaqueId } else { Self::Username }
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves subject tokens against a [`SubjectStore`].
#[derive(Clone)]
pub struct SubjectResolver {
    /// Backing subject store.
    store: Arc<dyn SubjectStore>,
}

impl SubjectResolver {
    /// Creates a resolver over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SubjectStore>) -> Self {
        Self { store }
    }

    /// Resolves `token` to an active subject.
    ///
    /// Absent and blank tokens resolve to `None` without touching the store.
    /// Unknown and inactive subjects also resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ClearanceError::InvalidToken`] for oversized or control-character
    /// tokens and [`ClearanceError::Store`] when the store fails.
    pub fn resolve(&self, token: Option<&str>) -> Result<Option<Subject>, ClearanceError> {
        let Some(token) = token.map(str::trim).filter(|token| !token.is_empty()) else {
            return Ok(None);
        };
        validate_token(token)?;
        if TokenShape::classify(token) == TokenShape::OpaqueId
            && let Some(subject) = self.store.find_by_id(&SubjectId::new(token))?
        {
            return Ok(active_only(subject));
        }
        let username = normalize_username(token);
        Ok(self.store.find_by_username(&username)?.and_then(active_only))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects tokens that cannot be a directory identifier or username.
fn validate_token(token: &str) -> Result<(), ClearanceError> {
    if token.len() > MAX_TOKEN_LENGTH {
        return Err(ClearanceError::InvalidToken(format!(
            "token exceeds {MAX_TOKEN_LENGTH} bytes"
        )));
    }
    if token.chars().any(char::is_control) {
        return Err(ClearanceError::InvalidToken("token contains control characters".to_string()));
    }
    Ok(())
}

/// Drops inactive subjects returned by a misbehaving store.
fn active_only(subject: Subject) -> Option<Subject> {
    subject.active.then_some(subject)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::TokenShape;

    #[test]
    fn classify_requires_length_alphanumerics_and_a_digit() {
        assert_eq!(TokenShape::classify("subj0basic00000001"), TokenShape::OpaqueId);
        assert_eq!(TokenShape::classify("abcdefghijklmnop"), TokenShape::Username);
        assert_eq!(TokenShape::classify("short123"), TokenShape::Username);
        assert_eq!(TokenShape::classify("manager.department"), TokenShape::Username);
        assert_eq!(TokenShape::classify(&"a1".repeat(40)), TokenShape::Username);
    }
}
