// crates/clearance-cli/src/lib.rs
// ============================================================================
// Module: Portal Clearance CLI Library
// Description: Shared helpers for the portal-clearance binary.
// Purpose: Keep testable policy logic out of the entry point.
// Dependencies: clearance-config, thiserror
// ============================================================================

//! ## Overview
//! The binary in `src/main.rs` parses arguments and dispatches commands; the
//! bind policy lives here so it can be unit tested.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod serve_policy;
