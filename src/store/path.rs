use crate::error::{Error, Result};

/// A validated file path split into the (dir, name, ext) triple the `files`
/// table is keyed on. `dir` carries no leading or trailing slash and is empty
/// for top-level files; `ext` includes its leading dot or is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePath {
    pub dir: String,
    pub name: String,
    pub ext: String,
}

impl FilePath {
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path
            .trim()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if segments.is_empty() {
            return Err(Error::BadRequest("File path cannot be empty".to_string()));
        }

        for segment in &segments {
            validate_segment(segment)?;
        }

        let (basename, dirs) = segments.split_last().expect("segments is non-empty");
        let (name, ext) = split_extension(basename);

        Ok(Self {
            dir: dirs.join("/"),
            name: name.to_string(),
            ext: ext.to_string(),
        })
    }

    #[must_use]
    pub fn full_path(&self) -> String {
        if self.dir.is_empty() {
            format!("{}{}", self.name, self.ext)
        } else {
            format!("{}/{}{}", self.dir, self.name, self.ext)
        }
    }
}

/// Splits `icon.png` into `("icon", ".png")`. A leading dot is part of the
/// name, so `.gitignore` has no extension.
fn split_extension(basename: &str) -> (&str, &str) {
    match basename.rfind('.') {
        Some(idx) if idx > 0 => basename.split_at(idx),
        _ => (basename, ""),
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment == "." || segment == ".." {
        return Err(Error::BadRequest(
            "File path cannot contain relative segments".to_string(),
        ));
    }

    if segment.len() > 255 {
        return Err(Error::BadRequest(
            "File path segment cannot exceed 255 characters".to_string(),
        ));
    }

    const INVALID_CHARS: &[char] = &['\0', '\n', '\r', '\\'];
    if segment.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(Error::BadRequest(
            "File path segment contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_top_level_file() {
        let path = FilePath::parse("metadata.json").unwrap();
        assert_eq!(path.dir, "");
        assert_eq!(path.name, "metadata");
        assert_eq!(path.ext, ".json");
        assert_eq!(path.full_path(), "metadata.json");
    }

    #[test]
    fn test_parse_nested_file() {
        let path = FilePath::parse("assets/sprites/player.png").unwrap();
        assert_eq!(path.dir, "assets/sprites");
        assert_eq!(path.name, "player");
        assert_eq!(path.ext, ".png");
        assert_eq!(path.full_path(), "assets/sprites/player.png");
    }

    #[test]
    fn test_parse_normalizes_slashes() {
        let path = FilePath::parse("//src//__init__.py").unwrap();
        assert_eq!(path.dir, "src");
        assert_eq!(path.full_path(), "src/__init__.py");
    }

    #[test]
    fn test_parse_dotfile_has_no_extension() {
        let path = FilePath::parse(".gitignore").unwrap();
        assert_eq!(path.name, ".gitignore");
        assert_eq!(path.ext, "");
    }

    #[test]
    fn test_parse_no_extension() {
        let path = FilePath::parse("bin/launcher").unwrap();
        assert_eq!(path.name, "launcher");
        assert_eq!(path.ext, "");
    }

    #[test]
    fn test_parse_rejects_traversal_and_empty() {
        assert!(FilePath::parse("../etc/passwd").is_err());
        assert!(FilePath::parse("a/./b").is_err());
        assert!(FilePath::parse("").is_err());
        assert!(FilePath::parse("//").is_err());
    }
}
