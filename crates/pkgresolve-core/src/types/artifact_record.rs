//! The record an acquisition strategy hands back once it has materialized an artifact.

use std::collections::BTreeMap;
use std::time::SystemTime;

/// Which kind of strategy produced an [`ArtifactRecord`]; used for logging and for deciding
/// whether a record may be reused by a later, lower-precedence strategy in the same chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ArtifactSource {
    HttpPep691,
    HttpPep658,
    HttpWheel,
    DirectUriWheel,
    DirectUriCoreMetadata,
    WheelExtractedCoreMetadata,
    Other,
}

/// The outcome of successfully resolving one artifact: where it ended up in the workspace, where
/// it came from, and whatever verification data was collected along the way.
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    /// Location inside the ephemeral workspace this artifact was written to.
    pub destination_uri: String,
    /// Where the bytes were actually fetched from (an index URL, a direct URL, ...).
    pub origin_uri: String,
    /// Which strategy kind produced this record.
    pub source: ArtifactSource,
    /// Verified sha256 digest, hex encoded, when one was checked.
    pub content_sha256: Option<String>,
    /// Size in bytes, when known.
    pub size: Option<u64>,
    /// When this record was materialized.
    pub created_at: Option<SystemTime>,
    /// All digests collected for this artifact, keyed by algorithm name (`"sha256"`, ...).
    pub content_hashes: BTreeMap<String, String>,
}

impl ArtifactRecord {
    /// Builds a minimal record with no hash data yet collected.
    pub fn new(destination_uri: impl Into<String>, origin_uri: impl Into<String>, source: ArtifactSource) -> Self {
        Self {
            destination_uri: destination_uri.into(),
            origin_uri: origin_uri.into(),
            source,
            content_sha256: None,
            size: None,
            created_at: None,
            content_hashes: BTreeMap::new(),
        }
    }

    /// Records a digest under `algorithm`, also populating `content_sha256` as a convenience when
    /// `algorithm == "sha256"`.
    pub fn with_hash(mut self, algorithm: impl Into<String>, hex: impl Into<String>) -> Self {
        let algorithm = algorithm.into();
        let hex = hex.into();
        if algorithm == "sha256" {
            self.content_sha256 = Some(hex.clone());
        }
        self.content_hashes.insert(algorithm, hex);
        self
    }

    /// Records the artifact's byte size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}
