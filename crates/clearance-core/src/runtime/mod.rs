// crates/clearance-core/src/runtime/mod.rs
// ============================================================================
// Module: Clearance Runtime
// Description: Registry, resolver, calculator, filter, and in-memory store.
// Purpose: Implement the authorization pipeline over directory store traits.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules turn a subject token into a clearance level and use that
//! level to gate resources. Every HTTP surface calls into the same
//! components so lookups behave identically across store backends.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clearance;
pub mod filter;
pub mod registry;
pub mod resolver;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clearance::ClearanceCalculator;
pub use filter::authorize_lookup;
pub use filter::check_single;
pub use filter::filter_by_level;
pub use filter::filter_json_by_level;
pub use filter::is_authorized;
pub use registry::ClassificationRegistry;
pub use resolver::ClearanceError;
pub use resolver::SubjectResolver;
pub use resolver::TokenShape;
pub use store::InMemoryDirectory;
