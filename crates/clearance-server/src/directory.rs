// crates/clearance-server/src/directory.rs
// ============================================================================
// Module: Directory Backends
// Description: Opens the configured directory store behind the core traits.
// Purpose: Keep backend selection in one place for the server and CLI.
// Dependencies: clearance-config, clearance-core, clearance-store-*
// ============================================================================

//! ## Overview
//! [`DirectoryHandle`] owns one concrete store and hands out trait objects
//! for the resolver and registry. Seeding writes the standard
//! classification groups and demo subjects through the backend's own
//! administrative writes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use clearance_config::DirectoryBackend;
use clearance_config::DirectoryConfig;
use clearance_core::ClassificationSource;
use clearance_core::InMemoryDirectory;
use clearance_core::StoreError;
use clearance_core::SubjectStore;
use clearance_core::seed::demo_subjects;
use clearance_core::seed::standard_classification_groups;
use clearance_store_json::JsonDirectoryStore;
use clearance_store_sqlite::SqliteDirectoryConfig;
use clearance_store_sqlite::SqliteDirectoryStore;

use crate::server::ServerError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Record counts written by [`DirectoryHandle::seed_demo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    /// Classification groups written.
    pub groups: usize,
    /// Subjects written.
    pub subjects: usize,
}

/// Opened directory store.
#[derive(Clone)]
pub enum DirectoryHandle {
    /// Process-local directory pre-loaded with demo data.
    Memory(Arc<InMemoryDirectory>),
    /// `SQLite` database.
    Sqlite(Arc<SqliteDirectoryStore>),
    /// JSON array files.
    Json(Arc<JsonDirectoryStore>),
}

impl DirectoryHandle {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Directory`] when the store cannot be opened.
    pub fn open(config: &DirectoryConfig) -> Result<Self, ServerError> {
        match config.backend {
            DirectoryBackend::Memory => Ok(Self::Memory(Arc::new(InMemoryDirectory::seeded()))),
            DirectoryBackend::Sqlite => {
                let path = required_path(config)?;
                let store_config = SqliteDirectoryConfig {
                    path: path.to_path_buf(),
                    busy_timeout_ms: config.busy_timeout_ms,
                    journal_mode: config.journal_mode,
                    sync_mode: config.sync_mode,
                };
                let store = SqliteDirectoryStore::new(&store_config)
                    .map_err(|err| ServerError::Directory(err.to_string()))?;
                Ok(Self::Sqlite(Arc::new(store)))
            }
            DirectoryBackend::Json => {
                let path = required_path(config)?;
                let store = JsonDirectoryStore::new(path)
                    .map_err(|err| ServerError::Directory(err.to_string()))?;
                Ok(Self::Json(Arc::new(store)))
            }
        }
    }

    /// Returns the backend kind.
    #[must_use]
    pub const fn backend(&self) -> DirectoryBackend {
        match self {
            Self::Memory(_) => DirectoryBackend::Memory,
            Self::Sqlite(_) => DirectoryBackend::Sqlite,
            Self::Json(_) => DirectoryBackend::Json,
        }
    }

    /// Returns the subject lookup handle.
    #[must_use]
    pub fn subjects(&self) -> Arc<dyn SubjectStore> {
        match self {
            Self::Memory(store) => store.clone(),
            Self::Sqlite(store) => store.clone(),
            Self::Json(store) => store.clone(),
        }
    }

    /// Returns the classification lookup handle.
    #[must_use]
    pub fn groups(&self) -> Arc<dyn ClassificationSource> {
        match self {
            Self::Memory(store) => store.clone(),
            Self::Sqlite(store) => store.clone(),
            Self::Json(store) => store.clone(),
        }
    }

    /// Upserts the standard groups and demo subjects.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Directory`] when a write fails.
    pub fn seed_demo(&self) -> Result<SeedSummary, ServerError> {
        let groups = standard_classification_groups();
        let subjects = demo_subjects();
        let summary = SeedSummary { groups: groups.len(), subjects: subjects.len() };
        for group in groups {
            match self {
                Self::Memory(store) => store.upsert_group(group).map_err(directory_error)?,
                Self::Sqlite(store) => store.upsert_group(&group).map_err(directory_error)?,
                Self::Json(store) => store.upsert_group(&group).map_err(directory_error)?,
            }
        }
        for subject in subjects {
            match self {
                Self::Memory(store) => store.upsert_subject(subject).map_err(directory_error)?,
                Self::Sqlite(store) => store.upsert_subject(&subject).map_err(directory_error)?,
                Self::Json(store) => store.upsert_subject(&subject).map_err(directory_error)?,
            }
        }
        Ok(summary)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the configured store path or a config error.
fn required_path(config: &DirectoryConfig) -> Result<&std::path::Path, ServerError> {
    config
        .path
        .as_deref()
        .ok_or_else(|| ServerError::Config("directory path is required".to_string()))
}

/// Maps backend write errors through the core store error.
fn directory_error(err: impl Into<StoreError>) -> ServerError {
    ServerError::Directory(err.into().to_string())
}
