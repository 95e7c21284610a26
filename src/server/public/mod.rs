pub mod files;
pub mod other;
pub mod projects;
pub mod reports;
pub mod summaries;

use crate::server::response::{ApiError, NOT_FOUND_MESSAGE};
use crate::types::RevisionSelector;

/// Parses the `{revision}` path segment. An unparseable segment is a 404, not
/// a 400: `rev999` and `revxyz` are equally "no such revision" to callers.
pub(super) fn parse_selector(raw: &str) -> Result<RevisionSelector, ApiError> {
    raw.parse()
        .map_err(|()| ApiError::not_found(NOT_FOUND_MESSAGE))
}
