//! # Hatchery
//!
//! A catalogue server for badge applications, usable both as a standalone
//! binary and as a library.
//!
//! Projects have one mutable draft at a time; publishing freezes it into an
//! immutable numbered revision and opens a successor draft with the same
//! metadata and file set. File bytes live in a content-addressed store keyed
//! by SHA-256, so identical content is stored once across all revisions.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! hatchery = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use hatchery::config::ServerConfig;
//! use hatchery::content::ContentStore;
//! use hatchery::server::{AppState, create_router};
//! use hatchery::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//!     content: Arc::new(ContentStore::new(&config.data_dir)),
//!     base_url: None,
//!     badges: config.badges,
//!     categories: config.categories,
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Enables the server binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod server;
pub mod store;
pub mod types;
