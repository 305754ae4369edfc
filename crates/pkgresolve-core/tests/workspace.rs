//! Exercises [`pkgresolve_core::repository::EphemeralArtifactRepository`] directly: the
//! get-or-evict contract around a vanished backing file, and teardown on `close()`.

use pkgresolve_core::repository::{ArtifactRepository, EphemeralArtifactRepository};
use pkgresolve_core::types::{ArtifactKey, ArtifactRecord, ArtifactSource, IndexMetadataKey};

fn demo_key() -> ArtifactKey {
    ArtifactKey::IndexMetadata(IndexMetadataKey {
        project: "demo".parse().unwrap(),
        index_base: "file:///fake-index".to_string(),
    })
}

#[tokio::test]
async fn get_returns_none_for_a_key_never_put() {
    let repo = EphemeralArtifactRepository::new().unwrap();
    assert!(repo.get(&demo_key()).await.is_none());
}

#[tokio::test]
async fn put_then_get_round_trips_the_record() {
    let repo = EphemeralArtifactRepository::new().unwrap();
    let key = demo_key();
    let destination = repo.allocate_destination_uri(&key).unwrap();
    std::fs::write(destination.strip_prefix("file://").unwrap(), b"{}").unwrap();

    let record = ArtifactRecord::new(destination.clone(), "fixture://demo", ArtifactSource::Other);
    repo.put(key.clone(), record).await;

    let fetched = repo.get(&key).await.unwrap();
    assert_eq!(fetched.destination_uri, destination);
}

#[tokio::test]
async fn a_manually_deleted_backing_file_is_evicted_on_next_get() {
    let repo = EphemeralArtifactRepository::new().unwrap();
    let key = demo_key();
    let destination = repo.allocate_destination_uri(&key).unwrap();
    let path = destination.strip_prefix("file://").unwrap();
    std::fs::write(path, b"{}").unwrap();
    repo.put(key.clone(), ArtifactRecord::new(destination, "fixture://demo", ArtifactSource::Other))
        .await;

    std::fs::remove_file(path).unwrap();

    assert!(repo.get(&key).await.is_none(), "a record whose file vanished must be evicted, not returned stale");
    assert!(repo.get(&key).await.is_none(), "eviction must persist across repeated gets");
}

#[tokio::test]
async fn after_close_every_previously_stored_key_returns_none() {
    let repo = EphemeralArtifactRepository::new().unwrap();
    let key = demo_key();
    let destination = repo.allocate_destination_uri(&key).unwrap();
    std::fs::write(destination.strip_prefix("file://").unwrap(), b"{}").unwrap();
    repo.put(key.clone(), ArtifactRecord::new(destination, "fixture://demo", ArtifactSource::Other))
        .await;
    assert!(repo.get(&key).await.is_some());

    repo.close().await;

    assert!(repo.get(&key).await.is_none());
}

#[tokio::test]
async fn delete_removes_the_backing_file_under_the_workspace_root() {
    let repo = EphemeralArtifactRepository::new().unwrap();
    let key = demo_key();
    let destination = repo.allocate_destination_uri(&key).unwrap();
    let path = destination.strip_prefix("file://").unwrap().to_string();
    std::fs::write(&path, b"{}").unwrap();
    repo.put(key.clone(), ArtifactRecord::new(destination, "fixture://demo", ArtifactSource::Other))
        .await;

    repo.delete(&key).await;

    assert!(!std::path::Path::new(&path).exists());
    assert!(repo.get(&key).await.is_none());
}
