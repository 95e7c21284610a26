use crate::server::response::{ApiError, NOT_FOUND_MESSAGE, StoreOptionExt};
use crate::store::Store;
use crate::types::Project;

/// Loads a live project and checks that the caller owns it.
pub fn require_project_owner(
    store: &dyn Store,
    slug: &str,
    idp_user_id: &str,
) -> Result<Project, ApiError> {
    let project = store.get_project(slug)?.or_not_found(NOT_FOUND_MESSAGE)?;
    ensure_owner(&project, Some(idp_user_id))?;
    Ok(project)
}

/// Draft content is private: anonymous callers get 401, strangers 403.
pub fn ensure_owner(project: &Project, user: Option<&str>) -> Result<(), ApiError> {
    match user {
        None => Err(ApiError::unauthorized("Authentication required")),
        Some(user) if user == project.idp_user_id => Ok(()),
        Some(_) => Err(ApiError::forbidden("Not the project owner")),
    }
}
