// crates/clearance-core/src/lib.rs
// ============================================================================
// Module: Clearance Core Library
// Description: Public API surface for the portal clearance core.
// Purpose: Expose core types, store interfaces, and runtime components.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Clearance core derives a numeric security level (1 to 5) from a
//! requester's external group memberships and uses it to decide which
//! resources the requester may see. It is backend-agnostic: directory data
//! arrives through [`ClassificationSource`] and [`SubjectStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::ClassificationSource;
pub use interfaces::StoreError;
pub use interfaces::SubjectStore;
pub use runtime::ClassificationRegistry;
pub use runtime::ClearanceCalculator;
pub use runtime::ClearanceError;
pub use runtime::InMemoryDirectory;
pub use runtime::SubjectResolver;
pub use runtime::TokenShape;
pub use runtime::authorize_lookup;
pub use runtime::check_single;
pub use runtime::filter_by_level;
pub use runtime::filter_json_by_level;
pub use runtime::is_authorized;
