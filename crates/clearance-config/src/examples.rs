// crates/clearance-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration for documentation and the CLI.
// Purpose: Keep the documented config in lockstep with the validated model.
// Dependencies: none
// ============================================================================

//! ## Overview
//! The example below spells out every section with its default value, except
//! that the directory points at a `SQLite` file. It must always load cleanly
//! through [`crate::ClearanceConfig::from_toml_str`].

/// Returns a complete example `clearance.toml`.
#[must_use]
pub fn config_toml_example() -> String {
    r#"# clearance.toml

[server]
bind = "127.0.0.1:5000"
max_body_bytes = 65536
# Minimum clearance needed to list classification groups.
registry_view_level = 5

[identity]
# Header consulted first, then the JSON/form body field, then the query field.
header = "x-user-id"
field = "userId"

[directory]
# memory | sqlite | json
type = "sqlite"
path = "clearance.db"
busy_timeout_ms = 5000
journal_mode = "wal"
sync_mode = "full"

[catalog]
# Omit path to serve the built-in demo catalog.
# path = "catalog.json"

[audit]
enabled = true
# Omit path to write JSON lines to stderr.
# path = "clearance-audit.jsonl"
log_resolutions = false
"#
    .to_string()
}
