//! File storage for uploaded images using Apache OpenDAL.
//!
//! Files live under `<public root>/uploads` with generated names and are
//! addressed by clients through logical paths:
//!
//! Uploads are written under `<public root>/.uploads-staging` and renamed into
//! place once complete, so a partially written file is never served.
//!
//! ```text
//! store("photo.png", bytes)   -> /uploads/<uuid>.png   (writes <public root>/uploads/<uuid>.png)
//! delete("/uploads/<uuid>.png") -> DeleteTask           (unlinks on a background task)
//! ```

mod config;
mod delete;
mod error;
mod service;

pub use config::{STAGING_DIR, StorageConfig, UPLOADS_DIR};
pub use delete::{DeleteOutcome, DeleteTask};
pub use error::StorageError;
pub use service::{StorageService, StoredFile};
