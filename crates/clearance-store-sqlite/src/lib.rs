// crates/clearance-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Directory Store
// Description: Durable classification and subject directory using SQLite.
// Purpose: Provide a database-backed implementation of the directory traits.
// Dependencies: clearance-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed implementation of
//! [`clearance_core::ClassificationSource`] and [`clearance_core::SubjectStore`].
//! Every lookup reads current rows; nothing is cached between calls, so
//! directory edits take effect on the next request.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteDirectoryConfig;
pub use store::SqliteDirectoryStore;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
