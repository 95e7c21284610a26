use serde::{Deserialize, Serialize};

/// The `metadata.json` document of an app, stored as the `app_metadata` column
/// of a version row.
///
/// Every field is optional; a freshly created project starts with only `name`
/// set. The struct (rather than an open map) is the validation boundary:
/// unknown icon sizes and mistyped fields are rejected when the document is
/// parsed at the store or API edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    /// Semantic version declared by the creator, independent of revision numbers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Entry-point executable the badge launches after install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    /// Badge models this app is known to run on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_map: Option<IconMap>,
    /// Hidden apps are omitted from public listings but stay directly addressable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl AppMetadata {
    /// Initial metadata for a new project's first draft.
    #[must_use]
    pub fn for_new_project(slug: &str) -> Self {
        Self {
            name: Some(slug.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden == Some(true)
    }
}

/// Icon paths by pixel size. Keys are fixed; anything else fails to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IconMap {
    #[serde(rename = "8x8", skip_serializing_if = "Option::is_none")]
    pub size_8x8: Option<String>,
    #[serde(rename = "16x16", skip_serializing_if = "Option::is_none")]
    pub size_16x16: Option<String>,
    #[serde(rename = "32x32", skip_serializing_if = "Option::is_none")]
    pub size_32x32: Option<String>,
    #[serde(rename = "64x64", skip_serializing_if = "Option::is_none")]
    pub size_64x64: Option<String>,
}

impl IconMap {
    /// Entries as (size label, file path) pairs, in ascending size order.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("8x8", self.size_8x8.as_deref()),
            ("16x16", self.size_16x16.as_deref()),
            ("32x32", self.size_32x32.as_deref()),
            ("64x64", self.size_64x64.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, path)| path.map(|p| (label, p)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_metadata() {
        let metadata = AppMetadata::for_new_project("flappy_bird");
        assert_eq!(metadata.name.as_deref(), Some("flappy_bird"));
        assert!(metadata.categories.is_none());
        assert!(!metadata.is_hidden());
    }

    #[test]
    fn test_icon_map_serde_uses_size_keys() {
        let metadata: AppMetadata = serde_json::from_str(
            r#"{"name":"App","icon_map":{"64x64":"icon.png"},"hidden":true}"#,
        )
        .unwrap();
        let icon_map = metadata.icon_map.unwrap();
        assert_eq!(icon_map.size_64x64.as_deref(), Some("icon.png"));
        assert_eq!(icon_map.entries(), vec![("64x64", "icon.png")]);
        assert!(metadata.hidden == Some(true));

        let json = serde_json::to_string(&AppMetadata {
            icon_map: Some(icon_map),
            ..Default::default()
        })
        .unwrap();
        assert!(json.contains(r#""64x64":"icon.png""#));
        assert!(!json.contains("size_64x64"));
    }

    #[test]
    fn test_skips_unset_fields() {
        let json = serde_json::to_string(&AppMetadata::for_new_project("app")).unwrap();
        assert_eq!(json, r#"{"name":"app"}"#);
    }
}
