use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::metadata::AppMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub slug: String,
    pub idp_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    /// Revision number of the newest published version. None until first publish.
    pub latest_revision: Option<i64>,
    /// Revision number of the single mutable draft version.
    pub draft_revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub slug: String,
    pub idp_user_id: String,
    pub git_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    #[serde(skip)]
    pub id: i64,
    pub project_slug: String,
    pub revision: i64,
    pub app_metadata: AppMetadata,
    /// Set exactly once; a version with this non-null is immutable forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One file of one version. Rows are append-only: deletion sets `deleted_at`
/// and re-upload of the same (dir, name, ext) tuple overwrites the live row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub version_id: i64,
    pub dir: String,
    pub name: String,
    pub ext: String,
    pub mimetype: String,
    pub size_of_content: i64,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Path as uploaded, relative to the version root.
    #[must_use]
    pub fn full_path(&self) -> String {
        if self.dir.is_empty() {
            format!("{}{}", self.name, self.ext)
        } else {
            format!("{}/{}{}", self.dir, self.name, self.ext)
        }
    }
}

/// What an upload hands to the store once the bytes are in the content store.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub mimetype: String,
    pub size_of_content: i64,
    pub sha256: String,
    pub image_width: Option<i64>,
    pub image_height: Option<i64>,
}

/// One row of the public listing, built from a project's latest published version.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub slug: String,
    pub idp_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_map: Option<super::metadata::IconMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    pub revision: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub installs: i64,
}

/// Catalogue-wide counters for the public stats endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HubStats {
    pub apps: i64,
    pub app_authors: i64,
    pub badges: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredBadge {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// What a badge reports back about an installed version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Install,
    Launch,
    Crash,
}

impl ReportKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Install => "install",
            ReportKind::Launch => "launch",
            ReportKind::Crash => "crash",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "install" => Ok(ReportKind::Install),
            "launch" => Ok(ReportKind::Launch),
            "crash" => Ok(ReportKind::Crash),
            _ => Err(()),
        }
    }
}
