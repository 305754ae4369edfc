//! Strategies that read wheel bytes or core metadata directly from a local `file://` (or bare
//! path) URI, bypassing HTTP entirely. These run ahead of the HTTP strategies in the default
//! chain ordering (precedence 40 vs. 50) so a direct URI wins whenever one is present.

use crate::strategy::{Criticality, CoreMetadataStrategy, Strategy, StrategyOutcome, WheelFileStrategy};
use crate::types::{ArtifactRecord, ArtifactSource, CoreMetadataKey, WheelKey};
use async_trait::async_trait;
use data_encoding::HEXLOWER;
use rattler_digest::{compute_bytes_digest, Sha256};
use serde::Deserialize;

fn local_path_from_uri(uri: &str) -> Option<std::path::PathBuf> {
    if let Some(rest) = uri.strip_prefix("file://") {
        return Some(std::path::PathBuf::from(rest));
    }
    if uri.contains("://") {
        return None;
    }
    Some(std::path::PathBuf::from(uri))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct DirectUriWheelConfig {
    #[allow(dead_code)]
    pub(crate) chunk_bytes: Option<u64>,
}

/// Copies a wheel's bytes from a local path (or `file://` URI) straight into the workspace.
pub struct DirectUriWheelFileStrategy {
    instance_id: String,
    precedence: u32,
    criticality: Criticality,
}

impl DirectUriWheelFileStrategy {
    /// Builds an instance from its planned attributes. Ctor args (`chunk_bytes`) are accepted for
    /// parity with the chunked-copy knob but are not otherwise observable: `tokio::fs::copy`
    /// always streams in whatever chunk size the OS gives it.
    pub fn new(
        instance_id: &str,
        precedence: u32,
        criticality: Criticality,
        _cfg: DirectUriWheelConfig,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            precedence,
            criticality,
        }
    }
}

impl Strategy for DirectUriWheelFileStrategy {
    fn name(&self) -> &str {
        &self.instance_id
    }
    fn criticality(&self) -> Criticality {
        self.criticality
    }
    fn precedence(&self) -> u32 {
        self.precedence
    }
}

#[async_trait]
impl WheelFileStrategy for DirectUriWheelFileStrategy {
    async fn resolve(&self, key: &WheelKey, destination_uri: &str) -> StrategyOutcome {
        let Some(origin_uri) = key.origin_uri() else {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(
                "wheel key has no origin_uri yet",
            ));
        };
        let Some(src_path) = local_path_from_uri(origin_uri) else {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(
                "origin_uri is not a local path",
            ));
        };
        let Some(dest_path) = destination_uri.strip_prefix("file://") else {
            return StrategyOutcome::Failed(format!(
                "unsupported destination scheme: {destination_uri}"
            ));
        };

        if !src_path.exists() {
            return StrategyOutcome::Failed(format!("source wheel not found: {}", src_path.display()));
        }
        if let Err(e) = tokio::fs::copy(&src_path, dest_path).await {
            return StrategyOutcome::Failed(format!("copying {}: {e}", src_path.display()));
        }

        let bytes = match tokio::fs::read(dest_path).await {
            Ok(b) => b,
            Err(e) => return StrategyOutcome::Failed(format!("re-reading copied wheel: {e}")),
        };
        let digest = compute_bytes_digest::<Sha256>(&bytes);
        let sha256_hex = HEXLOWER.encode(digest.as_ref());

        StrategyOutcome::Resolved(
            ArtifactRecord::new(destination_uri, origin_uri.to_string(), ArtifactSource::DirectUriWheel)
                .with_hash("sha256", sha256_hex)
                .with_size(bytes.len() as u64),
        )
    }
}

/// Extracts `*.dist-info/METADATA` directly out of a wheel that already lives at a local path,
/// for the case where `CoreMetadataKey::file_url` names a local wheel rather than an HTTP one.
pub struct DirectUriCoreMetadataStrategy {
    instance_id: String,
    precedence: u32,
    criticality: Criticality,
}

impl DirectUriCoreMetadataStrategy {
    /// Builds an instance from its planned attributes. Takes no ctor args.
    pub fn new(instance_id: &str, precedence: u32, criticality: Criticality) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            precedence,
            criticality,
        }
    }
}

impl Strategy for DirectUriCoreMetadataStrategy {
    fn name(&self) -> &str {
        &self.instance_id
    }
    fn criticality(&self) -> Criticality {
        self.criticality
    }
    fn precedence(&self) -> u32 {
        self.precedence
    }
}

#[async_trait]
impl CoreMetadataStrategy for DirectUriCoreMetadataStrategy {
    async fn resolve(&self, key: &CoreMetadataKey, destination_uri: &str) -> StrategyOutcome {
        let Some(wheel_path) = local_path_from_uri(&key.file_url) else {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(
                "file_url is not a local path",
            ));
        };
        if !wheel_path.is_file() {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(format!(
                "{} is not a local file",
                wheel_path.display()
            )));
        }
        let Some(dest_path) = destination_uri.strip_prefix("file://") else {
            return StrategyOutcome::Failed(format!(
                "unsupported destination scheme: {destination_uri}"
            ));
        };

        match super::wheel_extracted::extract_dist_info_metadata(&wheel_path) {
            Ok(metadata_bytes) => {
                if let Err(e) = tokio::fs::write(dest_path, &metadata_bytes).await {
                    return StrategyOutcome::Failed(format!("writing {dest_path}: {e}"));
                }
                let digest = compute_bytes_digest::<Sha256>(&metadata_bytes);
                let sha256_hex = HEXLOWER.encode(digest.as_ref());
                StrategyOutcome::Resolved(
                    ArtifactRecord::new(
                        destination_uri,
                        key.file_url.clone(),
                        ArtifactSource::DirectUriCoreMetadata,
                    )
                    .with_hash("sha256", sha256_hex)
                    .with_size(metadata_bytes.len() as u64),
                )
            }
            Err(e) => StrategyOutcome::Failed(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn recognizes_file_uri_and_bare_path() {
        assert_eq!(
            local_path_from_uri("file:///tmp/foo.whl"),
            Some(std::path::PathBuf::from("/tmp/foo.whl"))
        );
        assert_eq!(
            local_path_from_uri("/tmp/foo.whl"),
            Some(std::path::PathBuf::from("/tmp/foo.whl"))
        );
        assert_eq!(local_path_from_uri("https://example.com/foo.whl"), None);
    }
}
