pub mod path;
mod schema;
mod sqlite;

pub use path::FilePath;
pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::*;

/// Sort order for project listings, always descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Last update of the latest published version.
    #[default]
    Updated,
    /// Publish date of the latest published version.
    Published,
    /// Distinct-install aggregate (see `Store::refresh_install_counts`).
    Installs,
}

/// Filters for the public listing. Only latest *published* versions are ever
/// considered; an explicit slug list additionally bypasses the hidden-app
/// exclusion since it is a direct lookup, not a browse.
#[derive(Debug, Clone, Default)]
pub struct SummaryFilter {
    pub slugs: Option<Vec<String>>,
    pub badges: Vec<String>,
    pub categories: Vec<String>,
    pub search: Option<String>,
    pub user_id: Option<String>,
    pub page_start: Option<i64>,
    pub page_length: Option<i64>,
    pub sort: SortKey,
}

/// Checks a project slug against `^[a-z][a-z_0-9]{2,100}$`.
pub fn validate_slug(slug: &str) -> Result<()> {
    let mut chars = slug.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase());
    let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    let rest_len = slug.len().saturating_sub(1);

    if !first_ok || !rest_ok || !(2..=100).contains(&rest_len) {
        return Err(Error::BadRequest(format!(
            "Project slug '{slug}' is not valid. It must match ^[a-z][a-z_0-9]{{2,100}}$"
        )));
    }
    Ok(())
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Project operations
    fn insert_project(&self, project: &NewProject) -> Result<()>;
    fn get_project(&self, slug: &str) -> Result<Option<Project>>;
    fn update_project_git_url(&self, slug: &str, git_url: &str) -> Result<()>;
    fn delete_project(&self, slug: &str) -> Result<()>;

    // Revision resolution. `Draft` follows the draft pointer, `Latest` the
    // latest pointer (not-found before first publish), and an explicit number
    // only matches a published row. Soft-deleted projects never resolve.
    fn resolve_version(&self, slug: &str, selector: RevisionSelector) -> Result<Option<Version>>;
    fn latest_revisions(&self, slugs: Option<&[String]>) -> Result<Vec<(String, i64)>>;

    // The publish transaction: freeze the draft, open its successor with the
    // same metadata and file set, repoint the project. All-or-nothing.
    fn publish_version(&self, slug: &str, clock_override: Option<DateTime<Utc>>) -> Result<()>;

    // Draft mutation
    fn update_draft_metadata(&self, slug: &str, metadata: &AppMetadata) -> Result<()>;
    fn upsert_draft_file(&self, slug: &str, path: &FilePath, upload: &UploadedFile) -> Result<()>;
    fn delete_draft_file(&self, slug: &str, path: &FilePath) -> Result<()>;

    // File metadata reads (soft-deleted rows are invisible)
    fn get_file_metadata(
        &self,
        slug: &str,
        selector: RevisionSelector,
        path: &FilePath,
    ) -> Result<Option<FileRecord>>;
    fn list_version_files(&self, version_id: i64) -> Result<Vec<FileRecord>>;

    // Listing
    fn project_summaries(&self, filter: &SummaryFilter) -> Result<Vec<ProjectSummary>>;

    // Badge registry + stats
    fn register_badge(&self, id: &str, mac: Option<&str>) -> Result<()>;
    fn get_stats(&self) -> Result<HubStats>;

    // Usage reporting. The aggregate rebuild is a collaborator contract: the
    // engine only reads project_install_reports, callers decide the cadence.
    fn record_version_report(&self, badge_id: &str, version_id: i64, kind: ReportKind)
    -> Result<()>;
    fn refresh_install_counts(&self) -> Result<()>;

    fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("codecraft").is_ok());
        assert!(validate_slug("app_2").is_ok());
        assert!(validate_slug("abc").is_ok());

        assert!(validate_slug("ab").is_err());
        assert!(validate_slug("2fast").is_err());
        assert!(validate_slug("_app").is_err());
        assert!(validate_slug("CodeCraft").is_err());
        assert!(validate_slug("has-dash").is_err());
        assert!(validate_slug(&"a".repeat(102)).is_err());
        assert!(validate_slug(&"a".repeat(101)).is_ok());
    }
}
