mod metadata;
mod models;
mod revision;

pub use metadata::{AppMetadata, IconMap};
pub use models::*;
pub use revision::RevisionSelector;
