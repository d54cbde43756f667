// crates/clearance-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Directory Store
// Description: Classification groups and subjects persisted in SQLite.
// Purpose: Serve directory lookups from current rows with fail-closed decoding.
// Dependencies: clearance-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! The store keeps three tables: `classification_groups`, `subjects`, and
//! `subject_groups` (memberships). Memberships may name groups that have no
//! classification row; those simply contribute nothing. Rows that fail to
//! decode (a level outside 1..=5, an unknown role tag) surface as
//! [`SqliteStoreError::Corrupt`] rather than being skipped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clearance_core::ClassificationGroup;
use clearance_core::ClassificationSource;
use clearance_core::GroupId;
use clearance_core::RoleTag;
use clearance_core::SecurityLevel;
use clearance_core::StoreError;
use clearance_core::Subject;
use clearance_core::SubjectId;
use clearance_core::SubjectStore;
use clearance_core::normalize_username;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use rusqlite::params_from_iter;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum group identifiers bound into one `IN (...)` query.
const MAX_GROUPS_PER_QUERY: usize = 500;
/// Column list shared by the subject lookups.
const SUBJECT_SELECT: &str = "SELECT s.subject_id, s.username, s.display_name, s.role_tag, \
                              s.email, m.group_id FROM subjects s LEFT JOIN subject_groups m \
                              ON m.subject_id = s.subject_id";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` directory store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteDirectoryConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteDirectoryConfig {
    /// Creates a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row failed to decode.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid input or constraint violation.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed directory store.
#[derive(Clone)]
pub struct SqliteDirectoryStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteDirectoryStore {
    /// Opens (creating if needed) an `SQLite` directory store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteDirectoryConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Inserts or replaces a classification group.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_group(&self, group: &ClassificationGroup) -> Result<(), SqliteStoreError> {
        if group.group_id.as_str().is_empty() {
            return Err(SqliteStoreError::Invalid("group_id must be non-empty".to_string()));
        }
        self.lock()?
            .execute(
                "INSERT INTO classification_groups (group_id, level, description, active, \
                 updated_at) VALUES (?1, ?2, ?3, ?4, ?5) ON CONFLICT(group_id) DO UPDATE SET \
                 level = excluded.level, description = excluded.description, active = \
                 excluded.active, updated_at = excluded.updated_at",
                params![
                    group.group_id.as_str(),
                    i64::from(group.level),
                    group.description.as_deref(),
                    group.active,
                    unix_millis()
                ],
            )
            .map_err(write_error)?;
        Ok(())
    }

    /// Inserts or replaces a subject and its memberships.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Invalid`] when the username is empty or
    /// already owned by another subject, or [`SqliteStoreError`] when the
    /// write fails.
    pub fn upsert_subject(&self, subject: &Subject) -> Result<(), SqliteStoreError> {
        let username = normalize_username(&subject.username);
        if username.is_empty() || subject.subject_id.as_str().is_empty() {
            return Err(SqliteStoreError::Invalid(
                "subject_id and username must be non-empty".to_string(),
            ));
        }
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        tx.execute(
            "INSERT INTO subjects (subject_id, username, display_name, role_tag, email, active, \
             updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) ON CONFLICT(subject_id) DO UPDATE \
             SET username = excluded.username, display_name = excluded.display_name, role_tag = \
             excluded.role_tag, email = excluded.email, active = excluded.active, updated_at = \
             excluded.updated_at",
            params![
                subject.subject_id.as_str(),
                username,
                subject.display_name,
                subject.role_tag.as_str(),
                subject.email.as_deref(),
                subject.active,
                unix_millis()
            ],
        )
        .map_err(write_error)?;
        tx.execute(
            "DELETE FROM subject_groups WHERE subject_id = ?1",
            params![subject.subject_id.as_str()],
        )
        .map_err(db_error)?;
        {
            let mut insert = tx
                .prepare("INSERT INTO subject_groups (subject_id, group_id) VALUES (?1, ?2)")
                .map_err(db_error)?;
            for group_id in &subject.group_memberships {
                insert
                    .execute(params![subject.subject_id.as_str(), group_id.as_str()])
                    .map_err(write_error)?;
            }
        }
        tx.commit().map_err(db_error)?;
        drop(guard);
        Ok(())
    }

    /// Marks a group inactive; returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn deactivate_group(&self, group_id: &GroupId) -> Result<bool, SqliteStoreError> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE classification_groups SET active = 0, updated_at = ?2 WHERE group_id = ?1",
                params![group_id.as_str(), unix_millis()],
            )
            .map_err(db_error)?;
        Ok(changed > 0)
    }

    /// Marks a subject inactive; returns whether a row changed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn deactivate_subject(&self, subject_id: &SubjectId) -> Result<bool, SqliteStoreError> {
        let changed = self
            .lock()?
            .execute(
                "UPDATE subjects SET active = 0, updated_at = ?2 WHERE subject_id = ?1",
                params![subject_id.as_str(), unix_millis()],
            )
            .map_err(db_error)?;
        Ok(changed > 0)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads one active group.
    fn load_group(&self, group_id: &GroupId) -> Result<Option<ClassificationGroup>, SqliteStoreError> {
        let row = self
            .lock()?
            .query_row(
                "SELECT group_id, level, description FROM classification_groups WHERE group_id = \
                 ?1 AND active = 1",
                params![group_id.as_str()],
                read_group_row,
            )
            .optional()
            .map_err(db_error)?;
        row.map(decode_group).transpose()
    }

    /// Loads the active groups among `group_ids`.
    fn load_groups(
        &self,
        group_ids: &BTreeSet<GroupId>,
    ) -> Result<Vec<ClassificationGroup>, SqliteStoreError> {
        let ids: Vec<&str> = group_ids.iter().map(GroupId::as_str).collect();
        let guard = self.lock()?;
        let mut groups = Vec::new();
        for chunk in ids.chunks(MAX_GROUPS_PER_QUERY) {
            let placeholders: Vec<String> =
                (1 ..= chunk.len()).map(|index| format!("?{index}")).collect();
            let sql = format!(
                "SELECT group_id, level, description FROM classification_groups WHERE active = 1 \
                 AND group_id IN ({}) ORDER BY group_id",
                placeholders.join(", ")
            );
            let mut statement = guard.prepare(&sql).map_err(db_error)?;
            let rows = statement
                .query_map(params_from_iter(chunk.iter()), read_group_row)
                .map_err(db_error)?;
            for row in rows {
                groups.push(decode_group(row.map_err(db_error)?)?);
            }
        }
        drop(guard);
        Ok(groups)
    }

    /// Loads every active group.
    fn load_all_groups(&self) -> Result<Vec<ClassificationGroup>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT group_id, level, description FROM classification_groups WHERE active = 1 \
                 ORDER BY level, group_id",
            )
            .map_err(db_error)?;
        let rows = statement.query_map(params![], read_group_row).map_err(db_error)?;
        let mut groups = Vec::new();
        for row in rows {
            groups.push(decode_group(row.map_err(db_error)?)?);
        }
        Ok(groups)
    }

    /// Loads one active subject matching `filter_sql` (bound to `?1`).
    fn load_subject(&self, filter_sql: &str, key: &str) -> Result<Option<Subject>, SqliteStoreError> {
        let guard = self.lock()?;
        let sql = format!("{SUBJECT_SELECT} WHERE {filter_sql} AND s.active = 1");
        let mut statement = guard.prepare(&sql).map_err(db_error)?;
        let mut rows = statement.query(params![key]).map_err(db_error)?;
        let mut subject: Option<Subject> = None;
        while let Some(row) = rows.next().map_err(db_error)? {
            if subject.is_none() {
                subject = Some(decode_subject(row)?);
            }
            let group_id: Option<String> = row.get(5).map_err(db_error)?;
            if let (Some(subject), Some(group_id)) = (subject.as_mut(), group_id) {
                subject.group_memberships.insert(GroupId::new(group_id));
            }
        }
        Ok(subject)
    }
}

// ============================================================================
// SECTION: Trait Implementations
// ============================================================================

impl ClassificationSource for SqliteDirectoryStore {
    fn find_active_group(
        &self,
        group_id: &GroupId,
    ) -> Result<Option<ClassificationGroup>, StoreError> {
        self.load_group(group_id).map_err(StoreError::from)
    }

    fn find_active_groups(
        &self,
        group_ids: &BTreeSet<GroupId>,
    ) -> Result<Vec<ClassificationGroup>, StoreError> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.load_groups(group_ids).map_err(StoreError::from)
    }

    fn list_active_groups(&self) -> Result<Vec<ClassificationGroup>, StoreError> {
        self.load_all_groups().map_err(StoreError::from)
    }
}

impl SubjectStore for SqliteDirectoryStore {
    fn find_by_id(&self, subject_id: &SubjectId) -> Result<Option<Subject>, StoreError> {
        self.load_subject("s.subject_id = ?1", subject_id.as_str()).map_err(StoreError::from)
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Subject>, StoreError> {
        self.load_subject("s.username = ?1", username).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Raw classification row as stored.
type GroupRow = (String, i64, Option<String>);

/// Reads a raw classification row.
fn read_group_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

/// Decodes a raw classification row, rejecting out-of-range levels.
fn decode_group((group_id, level, description): GroupRow) -> Result<ClassificationGroup, SqliteStoreError> {
    let level = SecurityLevel::try_from(level)
        .map_err(|err| SqliteStoreError::Corrupt(format!("group {group_id}: {err}")))?;
    Ok(ClassificationGroup { group_id: GroupId::new(group_id), level, description, active: true })
}

/// Decodes the subject columns of a joined subject row.
fn decode_subject(row: &Row<'_>) -> Result<Subject, SqliteStoreError> {
    let subject_id: String = row.get(0).map_err(db_error)?;
    let username: String = row.get(1).map_err(db_error)?;
    let display_name: String = row.get(2).map_err(db_error)?;
    let role_label: String = row.get(3).map_err(db_error)?;
    let email: Option<String> = row.get(4).map_err(db_error)?;
    let role_tag = RoleTag::parse(&role_label).ok_or_else(|| {
        SqliteStoreError::Corrupt(format!("subject {subject_id}: unknown role tag {role_label}"))
    })?;
    Ok(Subject {
        subject_id: SubjectId::new(subject_id),
        username,
        display_name,
        role_tag,
        email,
        group_memberships: BTreeSet::new(),
        active: true,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps an engine error.
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

/// Maps a write error, reporting constraint violations as invalid input.
fn write_error(err: rusqlite::Error) -> SqliteStoreError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            SqliteStoreError::Invalid(message.unwrap_or_else(|| failure.to_string()))
        }
        other => db_error(other),
    }
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteDirectoryConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteDirectoryConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS classification_groups (
                    group_id TEXT PRIMARY KEY,
                    level INTEGER NOT NULL,
                    description TEXT,
                    active INTEGER NOT NULL DEFAULT 1,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS subjects (
                    subject_id TEXT PRIMARY KEY,
                    username TEXT NOT NULL UNIQUE,
                    display_name TEXT NOT NULL,
                    role_tag TEXT NOT NULL,
                    email TEXT,
                    active INTEGER NOT NULL DEFAULT 1,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS subject_groups (
                    subject_id TEXT NOT NULL,
                    group_id TEXT NOT NULL,
                    PRIMARY KEY (subject_id, group_id),
                    FOREIGN KEY (subject_id) REFERENCES subjects(subject_id) ON DELETE CASCADE
                );",
            )
            .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)?;
    Ok(())
}

/// Returns the current unix epoch in milliseconds.
fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
