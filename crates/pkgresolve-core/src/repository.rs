//! The ephemeral, in-memory-indexed artifact repository backing one resolution run's workspace.

use crate::error::RepositoryError;
use crate::types::ArtifactKey;
use crate::types::ArtifactRecord;
use data_encoding::HEXLOWER;
use parking_lot::RwLock;
use rattler_digest::{compute_bytes_digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Storage for materialized artifacts, scoped to one resolution run.
#[async_trait::async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Returns the record for `key`, if one is present and its backing file (when `file://`)
    /// still exists. A record whose file vanished is evicted and `None` is returned.
    async fn get(&self, key: &ArtifactKey) -> Option<ArtifactRecord>;
    /// Unconditionally inserts or overwrites the record for `key`.
    async fn put(&self, key: ArtifactKey, record: ArtifactRecord);
    /// Removes the entry for `key`, best-effort unlinking its backing file if it lies under the
    /// workspace root.
    async fn delete(&self, key: &ArtifactKey);
    /// Allocates (and prepares the parent directories of) a deterministic destination URI for
    /// `key`, per the workspace layout convention.
    fn allocate_destination_uri(&self, key: &ArtifactKey) -> Result<String, RepositoryError>;
    /// Clears the index and removes the workspace root.
    async fn close(&self);
}

/// `safe(s)`: strip, collapse characters outside `[A-Za-z0-9._-]` to `_`, truncate to 160 chars,
/// replace an empty result with `_`.
pub fn safe(s: &str) -> String {
    let trimmed = s.trim();
    let collapsed: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let truncated: String = collapsed.chars().take(160).collect();
    if truncated.is_empty() {
        "_".to_string()
    } else {
        truncated
    }
}

/// `hash16(s)`: the first 16 hex characters of `sha256(utf8(s))`.
pub fn hash16(s: &str) -> String {
    let digest = compute_bytes_digest::<Sha256>(s.as_bytes());
    HEXLOWER.encode(digest.as_ref())[..16].to_string()
}

/// The default, filesystem-backed, in-process repository implementation: an index map guarded by
/// a lock, paired with an owned [`TempDir`] that is removed on `close()` (and, as a backstop, on
/// `Drop`, so a panic mid-run cannot leak the workspace).
pub struct EphemeralArtifactRepository {
    index: RwLock<HashMap<ArtifactKey, ArtifactRecord>>,
    workspace: TempDir,
}

impl EphemeralArtifactRepository {
    /// Creates a fresh, empty repository backed by a new temporary directory.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            index: RwLock::new(HashMap::new()),
            workspace: tempfile::tempdir()?,
        })
    }

    fn workspace_root(&self) -> &Path {
        self.workspace.path()
    }

    fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        let relative = match key {
            ArtifactKey::IndexMetadata(k) => format!(
                "index_metadata/{}/{}.json",
                hash16(&k.index_base),
                safe(k.project.as_str())
            ),
            ArtifactKey::CoreMetadata(k) => format!(
                "core_metadata/{}/{}/{}/{}.metadata",
                safe(k.name.as_str()),
                safe(&k.version),
                safe(&k.tag),
                hash16(&k.file_url)
            ),
            ArtifactKey::Wheel(k) => format!(
                "wheels/{}/{}/{}/{}.whl",
                safe(k.name.as_str()),
                safe(&k.version),
                safe(&k.tag),
                hash16(&format!("{}-{}-{}", k.name.as_str(), k.version, k.tag))
            ),
        };
        self.workspace_root().join(relative)
    }

    fn file_path_from_uri(&self, uri: &str) -> Option<PathBuf> {
        uri.strip_prefix("file://").map(PathBuf::from)
    }
}

#[async_trait::async_trait]
impl ArtifactRepository for EphemeralArtifactRepository {
    async fn get(&self, key: &ArtifactKey) -> Option<ArtifactRecord> {
        let existing = self.index.read().get(key).cloned();
        let Some(record) = existing else {
            return None;
        };
        if let Some(path) = self.file_path_from_uri(&record.destination_uri) {
            if !path.exists() {
                self.index.write().remove(key);
                return None;
            }
        }
        Some(record)
    }

    async fn put(&self, key: ArtifactKey, record: ArtifactRecord) {
        self.index.write().insert(key, record);
    }

    async fn delete(&self, key: &ArtifactKey) {
        if let Some(record) = self.index.write().remove(key) {
            if let Some(path) = self.file_path_from_uri(&record.destination_uri) {
                if path.starts_with(self.workspace_root()) {
                    let _ = std::fs::remove_file(path);
                }
            }
        }
    }

    fn allocate_destination_uri(&self, key: &ArtifactKey) -> Result<String, RepositoryError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(format!("file://{}", path.display()))
    }

    async fn close(&self) {
        self.index.write().clear();
    }
}
