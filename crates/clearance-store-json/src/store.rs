// crates/clearance-store-json/src/store.rs
// ============================================================================
// Module: JSON Directory Store
// Description: Classification groups and subjects stored as JSON array files.
// Purpose: Flat-file directory backend with bounded reads and atomic writes.
// Dependencies: clearance-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The store root holds `classification_groups.json` and `subjects.json`,
//! each a JSON array of records. A missing file reads as an empty array.
//! Oversized files, malformed JSON, out-of-range levels, and duplicate keys
//! fail closed with [`JsonStoreError`]. Writes replace the whole file via a
//! temporary file and rename.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use clearance_core::ClassificationGroup;
use clearance_core::ClassificationSource;
use clearance_core::GroupId;
use clearance_core::StoreError;
use clearance_core::Subject;
use clearance_core::SubjectId;
use clearance_core::SubjectStore;
use clearance_core::normalize_username;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File holding classification group records.
pub const GROUPS_FILE_NAME: &str = "classification_groups.json";
/// File holding subject records.
pub const SUBJECTS_FILE_NAME: &str = "subjects.json";
/// Maximum size of one directory file in bytes.
pub const MAX_DIRECTORY_FILE_BYTES: u64 = 8 * 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// JSON store errors.
#[derive(Debug, Error)]
pub enum JsonStoreError {
    /// Filesystem error.
    #[error("json store io error: {0}")]
    Io(String),
    /// File contents could not be decoded.
    #[error("json store corruption: {0}")]
    Corrupt(String),
    /// Caller supplied invalid data.
    #[error("json store invalid data: {0}")]
    Invalid(String),
    /// File exceeded the size limit.
    #[error("json store file too large: {path} exceeds {max_bytes} bytes")]
    TooLarge {
        /// Offending file.
        path: String,
        /// Maximum allowed bytes.
        max_bytes: u64,
    },
    /// Write lock was poisoned.
    #[error("json store lock poisoned")]
    Poisoned,
}

impl From<JsonStoreError> for StoreError {
    fn from(error: JsonStoreError) -> Self {
        match error {
            JsonStoreError::Io(message) => Self::Io(message),
            JsonStoreError::Corrupt(message) => Self::Corrupt(message),
            JsonStoreError::Invalid(message) => Self::Invalid(message),
            error @ JsonStoreError::TooLarge { .. } => Self::Corrupt(error.to_string()),
            JsonStoreError::Poisoned => Self::Store("json store lock poisoned".to_string()),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Flat-file directory store rooted at one directory.
///
/// # Invariants
/// - Group identifiers and subject identifiers are unique within their files.
/// - Active usernames are unique after normalization.
#[derive(Debug, Clone)]
pub struct JsonDirectoryStore {
    /// Directory containing the JSON files.
    root: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Arc<Mutex<()>>,
}

impl JsonDirectoryStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError`] when the root is unusable.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, JsonStoreError> {
        let root = root.into();
        if root.as_os_str().is_empty() || root.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
            return Err(JsonStoreError::Invalid("store root length out of range".to_string()));
        }
        if root.is_file() {
            return Err(JsonStoreError::Invalid("store root must be a directory".to_string()));
        }
        fs::create_dir_all(&root).map_err(|err| JsonStoreError::Io(err.to_string()))?;
        Ok(Self { root, write_lock: Arc::new(Mutex::new(())) })
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Inserts or replaces a classification group.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError`] when the file cannot be read or written.
    pub fn upsert_group(&self, group: &ClassificationGroup) -> Result<(), JsonStoreError> {
        if group.group_id.as_str().is_empty() {
            return Err(JsonStoreError::Invalid("group_id must be non-empty".to_string()));
        }
        let _guard = self.write_guard()?;
        let mut groups = self.load_groups()?;
        groups.retain(|existing| existing.group_id != group.group_id);
        groups.push(group.clone());
        self.write_records(GROUPS_FILE_NAME, &groups)
    }

    /// Inserts or replaces a subject.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError::Invalid`] when the username is empty or owned
    /// by another subject, or [`JsonStoreError`] on I/O failure.
    pub fn upsert_subject(&self, subject: &Subject) -> Result<(), JsonStoreError> {
        let mut subject = subject.clone();
        subject.username = normalize_username(&subject.username);
        if subject.username.is_empty() || subject.subject_id.as_str().is_empty() {
            return Err(JsonStoreError::Invalid(
                "subject_id and username must be non-empty".to_string(),
            ));
        }
        let _guard = self.write_guard()?;
        let mut subjects = self.load_subjects()?;
        if subjects.iter().any(|existing| {
            existing.username == subject.username && existing.subject_id != subject.subject_id
        }) {
            return Err(JsonStoreError::Invalid(format!(
                "username already registered: {}",
                subject.username
            )));
        }
        subjects.retain(|existing| existing.subject_id != subject.subject_id);
        subjects.push(subject);
        self.write_records(SUBJECTS_FILE_NAME, &subjects)
    }

    /// Marks a group inactive; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError`] when the file cannot be read or written.
    pub fn deactivate_group(&self, group_id: &GroupId) -> Result<bool, JsonStoreError> {
        let _guard = self.write_guard()?;
        let mut groups = self.load_groups()?;
        let Some(group) = groups.iter_mut().find(|group| group.group_id == *group_id) else {
            return Ok(false);
        };
        group.active = false;
        self.write_records(GROUPS_FILE_NAME, &groups)?;
        Ok(true)
    }

    /// Marks a subject inactive; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError`] when the file cannot be read or written.
    pub fn deactivate_subject(&self, subject_id: &SubjectId) -> Result<bool, JsonStoreError> {
        let _guard = self.write_guard()?;
        let mut subjects = self.load_subjects()?;
        let Some(subject) = subjects.iter_mut().find(|subject| subject.subject_id == *subject_id)
        else {
            return Ok(false);
        };
        subject.active = false;
        self.write_records(SUBJECTS_FILE_NAME, &subjects)?;
        Ok(true)
    }

    /// Acquires the write lock.
    fn write_guard(&self) -> Result<MutexGuard<'_, ()>, JsonStoreError> {
        self.write_lock.lock().map_err(|_| JsonStoreError::Poisoned)
    }

    /// Loads and checks every group record.
    fn load_groups(&self) -> Result<Vec<ClassificationGroup>, JsonStoreError> {
        let groups: Vec<ClassificationGroup> = self.read_records(GROUPS_FILE_NAME)?;
        let mut seen = BTreeSet::new();
        for group in &groups {
            if !seen.insert(&group.group_id) {
                return Err(JsonStoreError::Corrupt(format!(
                    "duplicate group_id {}",
                    group.group_id
                )));
            }
        }
        Ok(groups)
    }

    /// Loads and checks every subject record, normalizing usernames.
    fn load_subjects(&self) -> Result<Vec<Subject>, JsonStoreError> {
        let mut subjects: Vec<Subject> = self.read_records(SUBJECTS_FILE_NAME)?;
        let mut ids = BTreeSet::new();
        let mut usernames = BTreeSet::new();
        for subject in &mut subjects {
            subject.username = normalize_username(&subject.username);
            if !ids.insert(subject.subject_id.clone()) {
                return Err(JsonStoreError::Corrupt(format!(
                    "duplicate subject_id {}",
                    subject.subject_id
                )));
            }
            if subject.active && !usernames.insert(subject.username.clone()) {
                return Err(JsonStoreError::Corrupt(format!(
                    "duplicate active username {}",
                    subject.username
                )));
            }
        }
        Ok(subjects)
    }

    /// Reads a JSON array file; a missing file is empty.
    fn read_records<T: DeserializeOwned>(&self, file_name: &str) -> Result<Vec<T>, JsonStoreError> {
        let path = self.root.join(file_name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(JsonStoreError::Io(err.to_string())),
        };
        let mut bytes = Vec::new();
        file.take(MAX_DIRECTORY_FILE_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| JsonStoreError::Io(err.to_string()))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_DIRECTORY_FILE_BYTES {
            return Err(JsonStoreError::TooLarge {
                path: path.display().to_string(),
                max_bytes: MAX_DIRECTORY_FILE_BYTES,
            });
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| JsonStoreError::Corrupt(format!("{file_name}: {err}")))
    }

    /// Replaces a JSON array file atomically.
    fn write_records<T: Serialize>(&self, file_name: &str, records: &[T]) -> Result<(), JsonStoreError> {
        let path = self.root.join(file_name);
        let temp_path = self.root.join(format!(".{file_name}.tmp.{}", std::process::id()));
        let payload = serde_json::to_vec_pretty(records)
            .map_err(|err| JsonStoreError::Invalid(err.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|err| JsonStoreError::Io(err.to_string()))?;
        file.write_all(&payload).map_err(|err| JsonStoreError::Io(err.to_string()))?;
        file.sync_all().map_err(|err| JsonStoreError::Io(err.to_string()))?;
        drop(file);
        fs::rename(&temp_path, &path).map_err(|err| {
            let _ = fs::remove_file(&temp_path);
            JsonStoreError::Io(err.to_string())
        })
    }
}

// ============================================================================
// SECTION: Trait Implementations
// ============================================================================

impl ClassificationSource for JsonDirectoryStore {
    fn find_active_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Option<ClassificationGroup>, StoreError> {
        Ok(self
            .load_groups()?
            .into_iter()
            .find(|group| group.active && group.group_id == *group_id))
    }

    fn find_active_groups(
        &self,
        group_ids: &BTreeSet<GroupId>,
    ) -> Result<Vec<ClassificationGroup>, StoreError> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .load_groups()?
            .into_iter()
            .filter(|group| group.active && group_ids.contains(&group.group_id))
            .collect())
    }

    fn list_active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError> {
        Ok(self.load_groups()?.into_iter().filter(|group| group.active).collect())
    }
}

impl SubjectStore for JsonDirectoryStore {
    fn find_by_id(&self, subject_id: &SubjectId) -> Result<Option<Subject>, StoreError> {
        Ok(self
            .load_subjects()?
            .into_iter()
            .find(|subject| subject.active && subject.subject_id == *subject_id))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Subject>, StoreError> {
        Ok(self
            .load_subjects()?
            .into_iter()
            .find(|subject| subject.active && subject.username == username))
    }
}
