mod server;

pub use server::{DEFAULT_BADGES, DEFAULT_CATEGORIES, ServerConfig};
