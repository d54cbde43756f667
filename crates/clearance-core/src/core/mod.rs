// crates/clearance-core/src/core/mod.rs
// ============================================================================
// Module: Clearance Core Types
// Description: Identifiers, levels, directory records, and resource abstractions.
// Purpose: Provide stable, serializable types shared by every clearance crate.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Core types are the canonical shapes for classification groups, subjects,
//! and protected resources. Store backends and the HTTP surface derive their
//! payloads from these types.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod directory;
pub mod identifiers;
pub mod level;
pub mod resource;
pub mod seed;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use directory::ClassificationGroup;
pub use directory::RoleTag;
pub use directory::Subject;
pub use directory::normalize_username;
pub use identifiers::GroupId;
pub use identifiers::SubjectId;
pub use level::LevelError;
pub use level::SecurityLevel;
pub use resource::AccessCheck;
pub use resource::AccessDenial;
pub use resource::MIN_LEVEL_FIELD;
pub use resource::ProtectedResource;
pub use resource::REQUIRED_LEVEL_FIELD;
pub use resource::UNSATISFIABLE_LEVEL;
