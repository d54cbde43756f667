// crates/clearance-store-json/src/lib.rs
// ============================================================================
// Module: JSON Directory Store
// Description: Flat-file directory backend using JSON arrays on disk.
// Purpose: Serve directory lookups without a database for local deployments.
// Dependencies: clearance-core, serde_json
// ============================================================================

//! ## Overview
//! This crate stores classification groups and subjects as two JSON array
//! files inside one directory. Files are re-read on every lookup so edits
//! made by other processes are visible to the next request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::GROUPS_FILE_NAME;
pub use store::JsonDirectoryStore;
pub use store::JsonStoreError;
pub use store::MAX_DIRECTORY_FILE_BYTES;
pub use store::SUBJECTS_FILE_NAME;
