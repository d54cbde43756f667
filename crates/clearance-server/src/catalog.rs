// crates/clearance-server/src/catalog.rs
// ============================================================================
// Module: Resource Catalog
// Description: Level-protected apps and files served by the portal API.
// Purpose: Provide typed resources with a demo catalog and a JSON loader.
// Dependencies: clearance-core, serde, serde_json
// ============================================================================

//! ## Overview
//! The catalog is loaded once at startup, either from a JSON file of the form
//! `{"apps": [...], "files": [...]}` or from the built-in demo data. Every
//! resource carries `minSecurityLevel` (default 1) and an `isActive` flag;
//! inactive resources are invisible to both listing and fetch-by-id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use clearance_core::ProtectedResource;
use clearance_core::SecurityLevel;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum catalog file size in bytes.
pub const MAX_CATALOG_FILE_BYTES: u64 = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Resources
// ============================================================================

/// Application tile shown on the apps page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppResource {
    /// Stable identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Optional image URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Target link.
    pub link: String,
    /// Icon name.
    #[serde(default)]
    pub icon: String,
    /// Tile color classes.
    #[serde(default)]
    pub color: String,
    /// Category label.
    #[serde(default)]
    pub category: String,
    /// Minimum clearance required.
    #[serde(default)]
    pub min_security_level: SecurityLevel,
    /// Visibility flag.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ProtectedResource for AppResource {
    fn required_level(&self) -> Option<i64> {
        Some(i64::from(self.min_security_level))
    }
}

/// Section a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    /// Extended knowledge section.
    ExtendedKnowledge,
    /// Overlaps section.
    Overlaps,
    /// General section.
    General,
}

impl FileCategory {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtendedKnowledge => "extended-knowledge",
            Self::Overlaps => "overlaps",
            Self::General => "general",
        }
    }
}

/// Geographic area a file applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileArea {
    /// Northern area.
    North,
    /// Central area.
    Center,
    /// Southern area.
    South,
    /// All areas.
    #[default]
    All,
}

impl FileArea {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::Center => "center",
            Self::South => "south",
            Self::All => "all",
        }
    }
}

/// Downloadable file resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResource {
    /// Stable identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Stored file name.
    pub file_name: String,
    /// Size in bytes.
    #[serde(default)]
    pub file_size: u64,
    /// MIME type.
    #[serde(default)]
    pub mime_type: String,
    /// Owning section.
    pub section_category: FileCategory,
    /// Applicable area.
    #[serde(default)]
    pub area: FileArea,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Uploader name.
    #[serde(default = "default_uploader")]
    pub uploaded_by: String,
    /// Download counter.
    #[serde(default)]
    pub downloads: u64,
    /// Minimum clearance required.
    #[serde(default)]
    pub min_security_level: SecurityLevel,
    /// Visibility flag.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl ProtectedResource for FileResource {
    fn required_level(&self) -> Option<i64> {
        Some(i64::from(self.min_security_level))
    }
}

/// Listing filters accepted by the files endpoint.
///
/// Values are matched against wire labels, so an unknown category selects
/// nothing and `area=all` disables the area filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileQuery {
    /// Section category label.
    #[serde(default)]
    pub category: Option<String>,
    /// Area label.
    #[serde(default)]
    pub area: Option<String>,
}

impl FileQuery {
    /// Returns true when `file` passes both filters.
    #[must_use]
    pub fn matches(&self, file: &FileResource) -> bool {
        let category_ok =
            self.category.as_deref().is_none_or(|label| label == file.section_category.as_str());
        let area_ok = self
            .area
            .as_deref()
            .is_none_or(|label| label == FileArea::All.as_str() || label == file.area.as_str());
        category_ok && area_ok
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Immutable set of protected resources.
///
/// # Invariants
/// - App ids are unique and non-empty; file ids likewise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCatalog {
    /// Application tiles.
    #[serde(default)]
    pub apps: Vec<AppResource>,
    /// File resources.
    #[serde(default)]
    pub files: Vec<FileResource>,
}

impl ResourceCatalog {
    /// Loads and validates a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the file is unreadable, oversized,
    /// malformed, or has duplicate ids.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|err| CatalogError::Io(err.to_string()))?;
        let mut bytes = Vec::new();
        file.take(MAX_CATALOG_FILE_BYTES + 1)
            .read_to_end(&mut bytes)
            .map_err(|err| CatalogError::Io(err.to_string()))?;
        if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > MAX_CATALOG_FILE_BYTES {
            return Err(CatalogError::TooLarge { max_bytes: MAX_CATALOG_FILE_BYTES });
        }
        let catalog: Self =
            serde_json::from_slice(&bytes).map_err(|err| CatalogError::Parse(err.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Writes the catalog as pretty JSON via a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] when the write fails.
    pub fn write_atomic(&self, path: &Path) -> Result<(), CatalogError> {
        let bytes =
            serde_json::to_vec_pretty(self).map_err(|err| CatalogError::Parse(err.to_string()))?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| CatalogError::Io(err.to_string()))?;
        }
        let temp_path = path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|err| CatalogError::Io(err.to_string()))?;
        file.write_all(&bytes).map_err(|err| CatalogError::Io(err.to_string()))?;
        file.sync_all().map_err(|err| CatalogError::Io(err.to_string()))?;
        drop(file);
        fs::rename(&temp_path, path).map_err(|err| CatalogError::Io(err.to_string()))
    }

    /// Checks id uniqueness across each resource kind.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] on empty or duplicate ids.
    pub fn validate(&self) -> Result<(), CatalogError> {
        ensure_unique_ids("app", self.apps.iter().map(|app| app.id.as_str()))?;
        ensure_unique_ids("file", self.files.iter().map(|file| file.id.as_str()))
    }

    /// Returns active apps in catalog order.
    #[must_use]
    pub fn active_apps(&self) -> Vec<&AppResource> {
        self.apps.iter().filter(|app| app.is_active).collect()
    }

    /// Returns an active app by id.
    #[must_use]
    pub fn find_app(&self, id: &str) -> Option<&AppResource> {
        self.apps.iter().find(|app| app.is_active && app.id == id)
    }

    /// Returns active files passing `query`, in catalog order.
    #[must_use]
    pub fn active_files(&self, query: &FileQuery) -> Vec<&FileResource> {
        self.files.iter().filter(|file| file.is_active && query.matches(file)).collect()
    }

    /// Returns an active file by id.
    #[must_use]
    pub fn find_file(&self, id: &str) -> Option<&FileResource> {
        self.files.iter().find(|file| file.is_active && file.id == id)
    }

    /// Returns the built-in demo catalog.
    #[must_use]
    pub fn demo() -> Self {
        Self { apps: demo_apps(), files: demo_files() }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Filesystem failure.
    #[error("catalog io error: {0}")]
    Io(String),
    /// JSON decoding failure.
    #[error("catalog parse error: {0}")]
    Parse(String),
    /// Structurally valid but inconsistent catalog.
    #[error("invalid catalog: {0}")]
    Invalid(String),
    /// File exceeds the size limit.
    #[error("catalog file exceeds {max_bytes} bytes")]
    TooLarge {
        /// Maximum accepted size.
        max_bytes: u64,
    },
}

// ============================================================================
// SECTION: Demo Data
// ============================================================================

/// Builds a demo app entry.
fn app(id: &str, title: &str, link: &str, icon: &str, category: &str, level: u8) -> AppResource {
    AppResource {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        image: None,
        link: link.to_string(),
        icon: icon.to_string(),
        color: String::new(),
        category: category.to_string(),
        min_security_level: SecurityLevel::new(level).unwrap_or(SecurityLevel::CEILING),
        is_active: true,
    }
}

/// Demo apps spanning levels 1, 2, 3, and 5.
fn demo_apps() -> Vec<AppResource> {
    vec![
        AppResource {
            description: "Web search for every user".to_string(),
            color: "from-blue-500 to-cyan-600".to_string(),
            ..app("app-google", "Google", "https://www.google.com", "Search", "productivity", 1)
        },
        AppResource {
            description: "Human resources portal for managers".to_string(),
            color: "from-green-500 to-emerald-600".to_string(),
            ..app("app-hr-portal", "HR Portal", "https://hr.example.com", "Users", "hr", 3)
        },
        AppResource {
            description: "Top secret material".to_string(),
            color: "from-red-500 to-rose-600".to_string(),
            ..app(
                "app-nuclear-codes",
                "Nuclear Codes",
                "https://classified.example.com",
                "ShieldAlert",
                "other",
                5,
            )
        },
        AppResource {
            description: "Employee dashboard".to_string(),
            color: "from-purple-500 to-violet-600".to_string(),
            ..app(
                "app-employee-dashboard",
                "Employee Dashboard",
                "https://dashboard.example.com",
                "LayoutDashboard",
                "productivity",
                2,
            )
        },
        AppResource {
            description: "Data analysis hub".to_string(),
            color: "from-orange-500 to-amber-600".to_string(),
            ..app(
                "app-analytics-hub",
                "Analytics Hub",
                "https://analytics.example.com",
                "BarChart3",
                "analytics",
                3,
            )
        },
        AppResource {
            description: "Public news feed".to_string(),
            color: "from-indigo-500 to-blue-600".to_string(),
            ..app(
                "app-public-news",
                "Public News",
                "https://news.example.com",
                "Newspaper",
                "communication",
                1,
            )
        },
    ]
}

/// Builds a demo file entry.
fn file(
    id: &str,
    title: &str,
    file_name: &str,
    section_category: FileCategory,
    area: FileArea,
    level: u8,
) -> FileResource {
    FileResource {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        file_name: file_name.to_string(),
        file_size: 0,
        mime_type: "application/pdf".to_string(),
        section_category,
        area,
        tags: Vec::new(),
        uploaded_by: default_uploader(),
        downloads: 0,
        min_security_level: SecurityLevel::new(level).unwrap_or(SecurityLevel::CEILING),
        is_active: true,
    }
}

/// Demo files spanning every level and section.
fn demo_files() -> Vec<FileResource> {
    vec![
        file(
            "file-onboarding",
            "Onboarding Guide",
            "onboarding.pdf",
            FileCategory::General,
            FileArea::All,
            1,
        ),
        file(
            "file-north-overlap",
            "Northern Overlap Map",
            "north-overlap.pdf",
            FileCategory::Overlaps,
            FileArea::North,
            2,
        ),
        file(
            "file-budget-review",
            "Department Budget Review",
            "budget-review.pdf",
            FileCategory::ExtendedKnowledge,
            FileArea::Center,
            3,
        ),
        file(
            "file-south-brief",
            "Southern Operations Brief",
            "south-brief.pdf",
            FileCategory::Overlaps,
            FileArea::South,
            4,
        ),
        file(
            "file-continuity-plan",
            "Continuity Plan",
            "continuity-plan.pdf",
            FileCategory::ExtendedKnowledge,
            FileArea::All,
            5,
        ),
    ]
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects empty or repeated ids.
fn ensure_unique_ids<'a>(
    kind: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(CatalogError::Invalid(format!("{kind} id must be non-empty")));
        }
        if !seen.insert(id) {
            return Err(CatalogError::Invalid(format!("duplicate {kind} id: {id}")));
        }
    }
    Ok(())
}

/// Resources are visible unless deactivated.
const fn default_active() -> bool {
    true
}

/// Default uploader name.
fn default_uploader() -> String {
    "system".to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use clearance_core::filter_by_level;

    use super::*;

    #[test]
    fn demo_apps_unlock_progressively() {
        let catalog = ResourceCatalog::demo();
        let visible: Vec<usize> = [1, 2, 3, 4, 5]
            .into_iter()
            .map(|value| {
                let level = SecurityLevel::new(value).unwrap();
                filter_by_level(level, catalog.active_apps()).len()
            })
            .collect();
        assert_eq!(visible, vec![2, 3, 5, 5, 6]);
    }

    #[test]
    fn file_query_filters_by_category_and_area() {
        let catalog = ResourceCatalog::demo();
        let overlaps = FileQuery { category: Some("overlaps".to_string()), area: None };
        assert_eq!(catalog.active_files(&overlaps).len(), 2);
        let north = FileQuery { category: Some("overlaps".to_string()), area: Some("north".into()) };
        assert_eq!(catalog.active_files(&north).len(), 1);
        let all = FileQuery { category: None, area: Some("all".to_string()) };
        assert_eq!(catalog.active_files(&all).len(), catalog.files.len());
        let unknown = FileQuery { category: Some("reports".to_string()), area: None };
        assert!(catalog.active_files(&unknown).is_empty());
    }

    #[test]
    fn inactive_resources_are_not_found() {
        let mut catalog = ResourceCatalog::demo();
        catalog.apps[0].is_active = false;
        assert!(catalog.find_app("app-google").is_none());
        assert_eq!(catalog.active_apps().len(), 5);
    }

    #[test]
    fn load_applies_defaults_and_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, r#"{"apps":[{"id":"a","title":"A","link":"https://a"}]}"#).unwrap();
        let catalog = ResourceCatalog::load(&path).unwrap();
        assert_eq!(catalog.apps[0].min_security_level, SecurityLevel::FLOOR);
        assert!(catalog.apps[0].is_active);

        let duplicate = r#"{"apps":[{"id":"a","title":"A","link":"l"},{"id":"a","title":"B","link":"l"}]}"#;
        fs::write(&path, duplicate).unwrap();
        assert!(matches!(ResourceCatalog::load(&path), Err(CatalogError::Invalid(_))));

        fs::write(&path, r#"{"apps":[{"id":"a","title":"A","link":"l","minSecurityLevel":9}]}"#)
            .unwrap();
        assert!(matches!(ResourceCatalog::load(&path), Err(CatalogError::Parse(_))));
    }

    #[test]
    fn written_catalog_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("catalog.json");
        ResourceCatalog::demo().write_atomic(&path).unwrap();
        assert_eq!(ResourceCatalog::load(&path).unwrap(), ResourceCatalog::demo());
    }
}
