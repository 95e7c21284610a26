use crate::server::response::ApiError;

pub const MAX_SEARCH_LEN: usize = 50;

/// Uploads larger than this are rejected at the body-limit layer.
pub const MAX_UPLOAD_FILE_SIZE_BYTES: usize = 32 * 1024 * 1024;

pub fn validate_search(search: &str) -> Result<(), ApiError> {
    if search.chars().count() > MAX_SEARCH_LEN {
        return Err(ApiError::bad_request(format!(
            "Search string cannot exceed {MAX_SEARCH_LEN} characters"
        )));
    }
    Ok(())
}
