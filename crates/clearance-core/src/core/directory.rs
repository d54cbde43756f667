// crates/clearance-core/src/core/directory.rs
// ============================================================================
// Module: Directory Records
// Description: Classification group and subject records served by directory stores.
// Purpose: Define the serialized shapes shared by every store backend.
// Dependencies: serde, crate::core::{identifiers, level}
// ============================================================================

//! ## Overview
//! Directory records describe who a requester is and which external groups
//! they belong to. Only `level`, `active`, and `group_memberships` influence
//! authorization; descriptions, role tags, and e-mail addresses are carried
//! for display.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::GroupId;
use crate::core::identifiers::SubjectId;
use crate::core::level::SecurityLevel;

// ============================================================================
// SECTION: Classification Groups
// ============================================================================

/// Mapping from an external group to a clearance level.
///
/// # Invariants
/// - `group_id` is unique within a directory.
/// - Inactive groups are treated as absent by every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationGroup {
    /// External group identifier (case-sensitive).
    pub group_id: GroupId,
    /// Level granted to members.
    pub level: SecurityLevel,
    /// Optional human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the mapping participates in lookups.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl ClassificationGroup {
    /// Creates an active classification group.
    #[must_use]
    pub fn new(group_id: impl Into<GroupId>, level: SecurityLevel) -> Self {
        Self { group_id: group_id.into(), level, description: None, active: true }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the group inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}

// ============================================================================
// SECTION: Subjects
// ============================================================================

/// Descriptive role tag attached to a subject.
///
/// Role tags never influence clearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    /// Portal administrator.
    Admin,
    /// Content editor.
    Editor,
    /// Read-only user.
    #[default]
    Viewer,
}

impl RoleTag {
    /// Returns the stable label used in storage and responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    /// Parses a stored label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "admin" => Some(Self::Admin),
            "editor" => Some(Self::Editor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory record for a requester.
///
/// # Invariants
/// - `username` is stored lowercase; [`Subject::new`] normalizes it.
/// - `group_memberships` is a set; it may name groups unknown to the registry.
/// - Inactive subjects never resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Opaque directory identifier.
    pub subject_id: SubjectId,
    /// Lowercase login name.
    pub username: String,
    /// Display name.
    pub display_name: String,
    /// Descriptive role tag.
    #[serde(default)]
    pub role_tag: RoleTag,
    /// Optional e-mail address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// External groups the subject belongs to.
    #[serde(default)]
    pub group_memberships: BTreeSet<GroupId>,
    /// Whether the subject may resolve.
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Subject {
    /// Creates an active viewer subject with no memberships.
    #[must_use]
    pub fn new(
        subject_id: impl Into<SubjectId>,
        username: &str,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: normalize_username(username),
            display_name: display_name.into(),
            role_tag: RoleTag::Viewer,
            email: None,
            group_memberships: BTreeSet::new(),
            active: true,
        }
    }

    /// Replaces the role tag.
    #[must_use]
    pub const fn with_role(mut self, role_tag: RoleTag) -> Self {
        self.role_tag = role_tag;
        self
    }

    /// Sets the e-mail address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Adds group memberships.
    #[must_use]
    pub fn with_groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<GroupId>,
    {
        self.group_memberships.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Marks the subject inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Normalizes a username for storage and lookup.
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Serde default for `active` flags.
const fn default_active() -> bool {
    true
}
