use std::fmt;
use std::str::FromStr;

/// How a caller addresses one version of a project.
///
/// The two aliases and explicit revision numbers deliberately have asymmetric
/// visibility: the draft is reachable only through the literal `draft` alias,
/// and numbered revisions resolve only once published. Guessing the draft's
/// revision number must never expose unpublished content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionSelector {
    Draft,
    Latest,
    Revision(i64),
}

impl RevisionSelector {
    #[must_use]
    pub fn is_draft(self) -> bool {
        matches!(self, RevisionSelector::Draft)
    }
}

impl FromStr for RevisionSelector {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RevisionSelector::Draft),
            "latest" => Ok(RevisionSelector::Latest),
            _ => {
                let number = s.strip_prefix("rev").ok_or(())?;
                // Reject "rev-1", "rev+1", "rev01" style spellings; the path
                // segment must round-trip through Display.
                if number.is_empty()
                    || !number.chars().all(|c| c.is_ascii_digit())
                    || (number.len() > 1 && number.starts_with('0'))
                {
                    return Err(());
                }
                number.parse().map(RevisionSelector::Revision).map_err(|_| ())
            }
        }
    }
}

impl fmt::Display for RevisionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionSelector::Draft => write!(f, "draft"),
            RevisionSelector::Latest => write!(f, "latest"),
            RevisionSelector::Revision(n) => write!(f, "rev{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("draft".parse(), Ok(RevisionSelector::Draft));
        assert_eq!("latest".parse(), Ok(RevisionSelector::Latest));
    }

    #[test]
    fn test_parse_revision_numbers() {
        assert_eq!("rev0".parse(), Ok(RevisionSelector::Revision(0)));
        assert_eq!("rev17".parse(), Ok(RevisionSelector::Revision(17)));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(RevisionSelector::from_str("rev").is_err());
        assert!(RevisionSelector::from_str("rev-1").is_err());
        assert!(RevisionSelector::from_str("rev01").is_err());
        assert!(RevisionSelector::from_str("rev1x").is_err());
        assert!(RevisionSelector::from_str("0").is_err());
        assert!(RevisionSelector::from_str("DRAFT").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for s in ["draft", "latest", "rev0", "rev42"] {
            let selector: RevisionSelector = s.parse().unwrap();
            assert_eq!(selector.to_string(), s);
        }
    }
}
