mod storage;

pub use storage::{ContentStore, ContentStoreError, sha256_hex};
