//! Integration tests for local file storage.

use std::convert::Infallible;

use bytes::Bytes;
use pitsa_core::storage::{
    DeleteOutcome, STAGING_DIR, StorageConfig, StorageError, StorageService,
};
use tempfile::TempDir;

async fn create_service() -> (TempDir, StorageService) {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = StorageService::init(&StorageConfig::new(dir.path()))
        .await
        .expect("storage should initialize");
    (dir, service)
}

fn uploaded_files(service: &StorageService) -> usize {
    std::fs::read_dir(service.uploads_dir())
        .expect("uploads dir exists")
        .count()
}

fn staged_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path().join(STAGING_DIR))
        .expect("staging dir exists")
        .count()
}

#[tokio::test]
async fn test_init_creates_uploads_dir() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = StorageConfig::new(dir.path()).with_web_root(dir.path().join("wwwroot"));

    let service = StorageService::init(&config).await.expect("init");

    assert!(dir.path().join("wwwroot/uploads").is_dir());
    assert!(dir.path().join("wwwroot").join(STAGING_DIR).is_dir());
    assert_eq!(service.uploads_dir(), dir.path().join("wwwroot/uploads"));

    // Idempotent on an existing directory.
    StorageService::init(&config).await.expect("second init");
}

#[tokio::test]
async fn test_store_delete_end_to_end() {
    let (_dir, service) = create_service().await;

    let stored = service
        .store_bytes("abc", "photo.png")
        .await
        .expect("store")
        .expect("non-empty upload is stored");

    let name = stored
        .logical_path
        .strip_prefix("/uploads/")
        .expect("logical path prefix");
    let id = name.strip_suffix(".png").expect("extension kept");
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(stored.size, 3);

    let physical = service.resolve(&stored.logical_path).expect("resolve");
    assert_eq!(physical, stored.physical_path);
    assert_eq!(std::fs::read(&physical).expect("read back"), b"abc");

    let outcome = service.delete(&stored.logical_path).wait().await;
    assert_eq!(outcome, DeleteOutcome::Deleted { path: physical.clone() });
    assert!(!physical.exists());

    let outcome = service.delete(&stored.logical_path).wait().await;
    assert_eq!(outcome, DeleteOutcome::NotFound { path: physical });
}

#[tokio::test]
async fn test_store_preserves_extension_case() {
    let (_dir, service) = create_service().await;

    let stored = service
        .store_bytes("x", "Pepperoni.JPEG")
        .await
        .expect("store")
        .expect("stored");

    assert!(stored.logical_path.ends_with(".JPEG"));
    assert!(stored.generated_name.ends_with(".JPEG"));
}

#[tokio::test]
async fn test_store_empty_creates_nothing() {
    let (_dir, service) = create_service().await;

    let stored = service.store_bytes(Bytes::new(), "empty.png").await.expect("store");
    assert!(stored.is_none());

    let no_chunks = futures::stream::empty::<Result<Bytes, Infallible>>();
    let stored = service.store(no_chunks, "empty.png").await.expect("store");
    assert!(stored.is_none());

    let empty_chunks = futures::stream::iter([
        Ok::<_, Infallible>(Bytes::new()),
        Ok(Bytes::new()),
    ]);
    let stored = service.store(empty_chunks, "empty.png").await.expect("store");
    assert!(stored.is_none());

    assert_eq!(uploaded_files(&service), 0);
}

#[tokio::test]
async fn test_store_multi_chunk_stream() {
    let (_dir, service) = create_service().await;

    let chunks = futures::stream::iter([
        Ok::<_, Infallible>(Bytes::from_static(b"piz")),
        Ok(Bytes::new()),
        Ok(Bytes::from_static(b"za")),
    ]);
    let stored = service
        .store(chunks, "menu.txt")
        .await
        .expect("store")
        .expect("stored");

    assert_eq!(stored.size, 5);
    assert_eq!(
        std::fs::read(&stored.physical_path).expect("read back"),
        b"pizza"
    );
}

#[tokio::test]
async fn test_store_stream_error_propagates() {
    let (dir, service) = create_service().await;

    let chunks = futures::stream::iter([
        Ok(Bytes::from_static(b"partial")),
        Err("connection reset"),
    ]);
    let err = service
        .store(chunks, "broken.png")
        .await
        .expect_err("stream failure surfaces");

    assert!(matches!(err, StorageError::Stream(ref source) if source.to_string() == "connection reset"));
    assert_eq!(uploaded_files(&service), 0);
    assert_eq!(staged_files(&dir), 0);
}

#[tokio::test]
async fn test_upload_in_progress_is_not_visible() {
    let (dir, service) = create_service().await;
    let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Bytes, Infallible>>();
    tx.unbounded_send(Ok(Bytes::from_static(b"half")))
        .expect("send first chunk");

    let upload = tokio::spawn({
        let service = service.clone();
        async move { service.store(rx, "slow.png").await }
    });

    // The stream stays open, so the write is still in flight.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(uploaded_files(&service), 0);

    tx.unbounded_send(Ok(Bytes::from_static(b"-baked")))
        .expect("send last chunk");
    drop(tx);

    let stored = upload
        .await
        .expect("upload task")
        .expect("store")
        .expect("stored");
    assert_eq!(uploaded_files(&service), 1);
    assert_eq!(staged_files(&dir), 0);
    assert_eq!(
        std::fs::read(&stored.physical_path).expect("read back"),
        b"half-baked"
    );
}

#[tokio::test]
async fn test_concurrent_stores_do_not_collide() {
    let (_dir, service) = create_service().await;

    let (first, second) = tokio::join!(
        service.store_bytes("first", "same.png"),
        service.store_bytes("second", "same.png"),
    );
    let first = first.expect("store").expect("stored");
    let second = second.expect("store").expect("stored");

    assert_ne!(first.generated_name, second.generated_name);
    assert_eq!(std::fs::read(&first.physical_path).expect("read"), b"first");
    assert_eq!(std::fs::read(&second.physical_path).expect("read"), b"second");
}

#[tokio::test]
async fn test_delete_empty_is_noop() {
    let (_dir, service) = create_service().await;

    assert_eq!(service.delete("").wait().await, DeleteOutcome::Skipped);
}

#[tokio::test]
async fn test_delete_missing_file_reports_not_found() {
    let (_dir, service) = create_service().await;

    let outcome = service.delete("/uploads/never-stored.png").wait().await;
    assert_eq!(
        outcome,
        DeleteOutcome::NotFound {
            path: service.uploads_dir().join("never-stored.png")
        }
    );
}

#[tokio::test]
async fn test_delete_outside_uploads_is_suppressed() {
    let (dir, service) = create_service().await;
    let secret = dir.path().join("secret.txt");
    std::fs::write(&secret, "keep").expect("write");

    let outcome = service.delete("/uploads/../secret.txt").wait().await;

    assert!(matches!(outcome, DeleteOutcome::Failed { ref logical_path, .. } if logical_path == "/uploads/../secret.txt"));
    assert!(secret.exists());
}

#[tokio::test]
async fn test_delete_removes_only_target() {
    let (_dir, service) = create_service().await;

    let keep = service.store_bytes("keep", "a.png").await.expect("store").expect("stored");
    let drop = service.store_bytes("drop", "b.png").await.expect("store").expect("stored");

    let outcome = service.delete(&drop.logical_path).wait().await;

    assert!(outcome.is_deleted());
    assert!(!drop.physical_path.exists());
    assert!(keep.physical_path.exists());
}

#[tokio::test]
async fn test_detached_delete_completes() {
    let (_dir, service) = create_service().await;
    let stored = service.store_bytes("bye", "c.png").await.expect("store").expect("stored");

    service.delete(&stored.logical_path).detach();

    for _ in 0..50 {
        if !stored.physical_path.exists() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("detached delete did not remove the file");
}
