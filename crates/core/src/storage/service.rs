//! Storage service implementation using Apache OpenDAL.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use opendal::{ErrorKind, Operator, services};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::{StorageConfig, UPLOADS_DIR};
use super::delete::{DeleteOutcome, DeleteTask};
use super::error::StorageError;

/// A file written by [`StorageService::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Generated file name: `<uuid>` plus the original extension.
    pub generated_name: String,
    /// Web-relative path returned to clients, `/uploads/<generated_name>`.
    pub logical_path: String,
    /// Location of the file on disk.
    pub physical_path: PathBuf,
    /// Number of bytes written.
    pub size: u64,
}

/// Storage service for uploaded files.
#[derive(Debug, Clone)]
pub struct StorageService {
    operator: Operator,
    uploads_dir: PathBuf,
}

impl StorageService {
    /// Prepares the uploads directory and builds the service.
    ///
    /// The directory is created here, once, if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the storage
    /// backend cannot be initialized.
    pub async fn init(config: &StorageConfig) -> Result<Self, StorageError> {
        let uploads_dir = config.uploads_dir();
        tokio::fs::create_dir_all(&uploads_dir).await.map_err(|e| {
            StorageError::configuration(format!(
                "cannot create {}: {e}",
                uploads_dir.display()
            ))
        })?;

        let root = uploads_dir
            .to_str()
            .ok_or_else(|| StorageError::configuration("invalid path"))?;
        let staging_dir = config.staging_dir();
        let staging = staging_dir
            .to_str()
            .ok_or_else(|| StorageError::configuration("invalid staging path"))?;

        // Writes land in the staging dir and are renamed into the root on close.
        let builder = services::Fs::default().root(root).atomic_write_dir(staging);
        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();

        info!(
            root = %uploads_dir.display(),
            staging = %staging_dir.display(),
            "File storage ready"
        );
        Ok(Self {
            operator,
            uploads_dir,
        })
    }

    /// The directory uploaded files are written to.
    #[must_use]
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Generates a collision-resistant file name keeping the original extension.
    #[must_use]
    pub fn generate_name(original_name: &str) -> String {
        let id = Uuid::new_v4();
        match extension_of(original_name) {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        }
    }

    /// Writes an upload stream to a new file.
    ///
    /// Returns `Ok(None)` without creating anything when the stream yields no
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream fails or the file cannot be written.
    /// Nothing appears under the uploads directory until the whole stream
    /// has been written, and a failed upload leaves no file behind.
    pub async fn store<S, E>(
        &self,
        content: S,
        original_name: &str,
    ) -> Result<Option<StoredFile>, StorageError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let mut content = std::pin::pin!(content);

        // Skip leading empty chunks so an empty upload never touches the disk.
        let first = loop {
            match content.next().await {
                Some(Ok(chunk)) if chunk.is_empty() => {}
                Some(Ok(chunk)) => break chunk,
                Some(Err(e)) => return Err(StorageError::stream(e)),
                None => {
                    debug!(original_name, "Empty upload, nothing stored");
                    return Ok(None);
                }
            }
        };

        let generated_name = Self::generate_name(original_name);
        let mut writer = self.operator.writer(&generated_name).await?;

        let written: Result<u64, StorageError> = async {
            let mut size = first.len() as u64;
            writer.write(first).await?;
            while let Some(chunk) = content.next().await {
                let chunk = chunk.map_err(StorageError::stream)?;
                size += chunk.len() as u64;
                writer.write(chunk).await?;
            }
            writer.close().await?;
            Ok(size)
        }
        .await;

        let size = match written {
            Ok(size) => size,
            Err(e) => {
                warn!(key = %generated_name, error = %e, "Upload failed, discarding partial file");
                self.discard(&mut writer, &generated_name).await;
                return Err(e);
            }
        };

        let stored = StoredFile {
            logical_path: format!("/{UPLOADS_DIR}/{generated_name}"),
            physical_path: self.uploads_dir.join(&generated_name),
            generated_name,
            size,
        };
        info!(path = %stored.logical_path, size, "File stored");
        Ok(Some(stored))
    }

    /// Writes an in-memory buffer to a new file. See [`Self::store`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn store_bytes(
        &self,
        content: impl Into<Bytes>,
        original_name: &str,
    ) -> Result<Option<StoredFile>, StorageError> {
        let chunk: Result<Bytes, std::convert::Infallible> = Ok(content.into());
        self.store(futures::stream::iter([chunk]), original_name)
            .await
    }

    /// Maps a logical path (`/uploads/<name>`) to its location on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not name a file directly inside the
    /// uploads directory.
    pub fn resolve(&self, logical_path: &str) -> Result<PathBuf, StorageError> {
        storage_key(logical_path).map(|key| self.uploads_dir.join(key))
    }

    /// Deletes a previously stored file on a background task.
    ///
    /// Never fails: every problem ends up in the returned [`DeleteOutcome`]
    /// and in the log. Must be called from within a Tokio runtime.
    pub fn delete(&self, logical_path: &str) -> DeleteTask {
        if logical_path.is_empty() {
            return DeleteTask::ready(logical_path, DeleteOutcome::Skipped);
        }

        let key = match storage_key(logical_path) {
            Ok(key) => key.to_owned(),
            Err(e) => {
                let outcome = DeleteOutcome::Failed {
                    logical_path: logical_path.to_owned(),
                    reason: e.to_string(),
                };
                outcome.log();
                return DeleteTask::ready(logical_path, outcome);
            }
        };

        let operator = self.operator.clone();
        let path = self.uploads_dir.join(&key);
        let logical = logical_path.to_owned();
        let handle = tokio::spawn(async move {
            let outcome = remove(&operator, &key, path, logical).await;
            outcome.log();
            outcome
        });

        DeleteTask::running(logical_path, handle)
    }

    async fn discard(&self, writer: &mut opendal::Writer, key: &str) {
        if let Err(e) = writer.abort().await {
            warn!(key, error = %e, "Failed to abort partial upload");
        }
        if let Err(e) = self.operator.delete(key).await {
            warn!(key, error = %e, "Failed to remove partial upload");
        }
    }
}

async fn remove(operator: &Operator, key: &str, path: PathBuf, logical_path: String) -> DeleteOutcome {
    match operator.stat(key).await {
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return DeleteOutcome::NotFound { path },
        Err(e) => {
            return DeleteOutcome::Failed {
                logical_path,
                reason: e.to_string(),
            };
        }
    }

    match operator.delete(key).await {
        Ok(()) => DeleteOutcome::Deleted { path },
        Err(e) => DeleteOutcome::Failed {
            logical_path,
            reason: e.to_string(),
        },
    }
}

/// Extension of the final path component, without the dot.
fn extension_of(original_name: &str) -> Option<&str> {
    let file_name = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);

    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Storage key (file name) for a logical path.
fn storage_key(logical_path: &str) -> Result<&str, StorageError> {
    let name = logical_path
        .trim_start_matches('/')
        .strip_prefix(UPLOADS_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| StorageError::invalid_path(logical_path))?;

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::invalid_path(logical_path));
    }
    Ok(name)
}
