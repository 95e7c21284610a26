pub mod access;
pub mod creator;
pub mod dto;
pub mod public;
pub mod response;
mod router;
pub mod validation;

pub use router::{AppState, create_router};
