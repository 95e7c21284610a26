use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::SortKey;
use crate::types::{AppMetadata, FileRecord, IconMap, Project, ProjectSummary, RevisionSelector, Version};

const ONE_KILO: f64 = 1024.0;

#[derive(Debug, Default, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(default)]
    pub git_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub git_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    #[serde(default)]
    pub page_start: Option<i64>,
    #[serde(default)]
    pub page_length: Option<i64>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Comma separated list of project slugs to look up directly.
    #[serde(default)]
    pub slugs: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<SortKey>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LatestRevisionsParams {
    #[serde(default)]
    pub slugs: Option<String>,
}

/// Who is pinging or reporting: badges self-identify with an id and
/// optionally their mac address.
#[derive(Debug, Default, Deserialize)]
pub struct BadgeIdentifiers {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrashReportBody {
    #[serde(default)]
    pub reason: Option<String>,
}

pub fn split_csv(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Download URL for a file of one version, relative when no public base URL is
/// configured. Revision-addressed URLs are stable forever.
#[must_use]
pub fn file_download_url(
    base_url: Option<&str>,
    slug: &str,
    selector: RevisionSelector,
    full_path: &str,
) -> String {
    format!(
        "{}/api/v3/projects/{slug}/{selector}/files/{}",
        base_url.unwrap_or_default(),
        urlencoding::encode(full_path)
    )
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub full_path: String,
    pub url: String,
    pub mimetype: String,
    pub size_of_content: i64,
    pub size_formatted: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileResponse {
    #[must_use]
    pub fn from_record(
        file: &FileRecord,
        slug: &str,
        selector: RevisionSelector,
        base_url: Option<&str>,
    ) -> Self {
        let full_path = file.full_path();
        Self {
            url: file_download_url(base_url, slug, selector, &full_path),
            full_path,
            mimetype: file.mimetype.clone(),
            size_of_content: file.size_of_content,
            size_formatted: format!("{:.2}KB", file.size_of_content as f64 / ONE_KILO),
            sha256: file.sha256.clone(),
            image_width: file.image_width,
            image_height: file.image_height,
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub revision: i64,
    pub app_metadata: AppMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub files: Vec<FileResponse>,
}

impl VersionResponse {
    /// Files of a published version are addressed by their revision number so
    /// the URLs stay valid after the next publish; draft files by the alias.
    #[must_use]
    pub fn build(version: &Version, files: &[FileRecord], base_url: Option<&str>) -> Self {
        let selector = if version.published_at.is_some() {
            RevisionSelector::Revision(version.revision)
        } else {
            RevisionSelector::Draft
        };

        Self {
            revision: version.revision,
            app_metadata: version.app_metadata.clone(),
            published_at: version.published_at,
            files: files
                .iter()
                .map(|f| FileResponse::from_record(f, &version.project_slug, selector, base_url))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailsResponse {
    pub slug: String,
    pub idp_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: VersionResponse,
}

impl ProjectDetailsResponse {
    #[must_use]
    pub fn build(
        project: &Project,
        version: &Version,
        files: &[FileRecord],
        base_url: Option<&str>,
    ) -> Self {
        Self {
            slug: project.slug.clone(),
            idp_user_id: project.idp_user_id.clone(),
            git_url: project.git_url.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
            version: VersionResponse::build(version, files, base_url),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FullPathAndUrl {
    pub full_path: String,
    pub url: String,
}

/// Icon map enriched with download URLs, keyed by pixel size.
#[derive(Debug, Default, Serialize)]
pub struct IconMapWithUrls {
    #[serde(rename = "8x8", skip_serializing_if = "Option::is_none")]
    pub size_8x8: Option<FullPathAndUrl>,
    #[serde(rename = "16x16", skip_serializing_if = "Option::is_none")]
    pub size_16x16: Option<FullPathAndUrl>,
    #[serde(rename = "32x32", skip_serializing_if = "Option::is_none")]
    pub size_32x32: Option<FullPathAndUrl>,
    #[serde(rename = "64x64", skip_serializing_if = "Option::is_none")]
    pub size_64x64: Option<FullPathAndUrl>,
}

impl IconMapWithUrls {
    fn build(
        icon_map: &IconMap,
        slug: &str,
        selector: RevisionSelector,
        base_url: Option<&str>,
    ) -> Self {
        let entry = |path: &Option<String>| {
            path.as_ref().map(|full_path| FullPathAndUrl {
                full_path: full_path.clone(),
                url: file_download_url(base_url, slug, selector, full_path),
            })
        };

        Self {
            size_8x8: entry(&icon_map.size_8x8),
            size_16x16: entry(&icon_map.size_16x16),
            size_32x32: entry(&icon_map.size_32x32),
            size_64x64: entry(&icon_map.size_64x64),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectSummaryResponse {
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
    pub icon_map: Option<IconMapWithUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    pub revision: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub installs: i64,
}

impl ProjectSummaryResponse {
    #[must_use]
    pub fn from_summary(summary: ProjectSummary, base_url: Option<&str>) -> Self {
        let selector = RevisionSelector::Revision(summary.revision);
        let icon_map = summary
            .icon_map
            .as_ref()
            .map(|m| IconMapWithUrls::build(m, &summary.slug, selector, base_url));

        Self {
            icon_map,
            slug: summary.slug,
            idp_user_id: summary.idp_user_id,
            git_url: summary.git_url,
            name: summary.name,
            description: summary.description,
            license_type: summary.license_type,
            categories: summary.categories,
            badges: summary.badges,
            hidden: summary.hidden,
            revision: summary.revision,
            published_at: summary.published_at,
            installs: summary.installs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_download_url_encodes_path() {
        let url = file_download_url(
            Some("https://hub.example.com"),
            "codecraft",
            RevisionSelector::Revision(0),
            "assets/icon 5.png",
        );
        assert_eq!(
            url,
            "https://hub.example.com/api/v3/projects/codecraft/rev0/files/assets%2Ficon%205.png"
        );

        let relative =
            file_download_url(None, "codecraft", RevisionSelector::Draft, "main.py");
        assert_eq!(relative, "/api/v3/projects/codecraft/draft/files/main.py");
    }

    #[test]
    fn test_split_csv() {
        assert_eq!(split_csv("a,b , c"), vec!["a", "b", "c"]);
        assert!(split_csv("").is_empty());
        assert_eq!(split_csv("solo"), vec!["solo"]);
    }
}
