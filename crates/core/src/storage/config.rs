//! Storage configuration types.

use std::path::{Path, PathBuf};

/// Directory under the public root that holds uploaded files.
pub const UPLOADS_DIR: &str = "uploads";

/// Directory under the public root that holds uploads still being written.
/// Finished files are renamed into [`UPLOADS_DIR`].
pub const STAGING_DIR: &str = ".uploads-staging";

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Public web root (static content directory), if one is configured.
    pub web_root: Option<PathBuf>,
    /// Application content root, used when no web root is configured.
    pub content_root: PathBuf,
}

impl StorageConfig {
    /// Create a config that stores files under `content_root/uploads`.
    #[must_use]
    pub fn new(content_root: impl Into<PathBuf>) -> Self {
        Self {
            web_root: None,
            content_root: content_root.into(),
        }
    }

    /// Set the public web root.
    #[must_use]
    pub fn with_web_root(mut self, web_root: impl Into<PathBuf>) -> Self {
        self.web_root = Some(web_root.into());
        self
    }

    /// The public root: web root if configured, otherwise content root.
    #[must_use]
    pub fn public_root(&self) -> &Path {
        self.web_root.as_deref().unwrap_or(&self.content_root)
    }

    /// The directory uploaded files are written to.
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.public_root().join(UPLOADS_DIR)
    }

    /// The directory in-flight uploads are written to before they become
    /// visible under [`Self::uploads_dir`].
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.public_root().join(STAGING_DIR)
    }
}
