//! Fallback core-metadata strategy: materializes the wheel itself (via an injected
//! [`WheelFileStrategy`]) into a scratch location, then extracts its `*.dist-info/METADATA`
//! member. Used when an index has no PEP 658 sidecar to offer.

use crate::strategy::{Criticality, CoreMetadataStrategy, Strategy, StrategyOutcome, WheelFileStrategy};
use crate::types::{ArtifactRecord, ArtifactSource, CoreMetadataKey, WheelKey};
use async_trait::async_trait;
use data_encoding::HEXLOWER;
use rattler_digest::{compute_bytes_digest, Sha256};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

/// Finds the lexicographically-first `*.dist-info/METADATA` member in a wheel and returns its
/// bytes. Deterministic pick mirrors the source implementation this is grounded on.
pub fn extract_dist_info_metadata(wheel_path: &std::path::Path) -> Result<Vec<u8>, String> {
    let file = std::fs::File::open(wheel_path).map_err(|e| format!("opening {}: {e}", wheel_path.display()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| format!("reading wheel zip: {e}"))?;

    let mut candidates: Vec<String> = archive
        .file_names()
        .filter(|name| name.ends_with(".dist-info/METADATA"))
        .map(ToString::to_string)
        .collect();
    candidates.sort();

    let member = candidates
        .into_iter()
        .next()
        .ok_or_else(|| "wheel does not contain any *.dist-info/METADATA entry".to_string())?;

    let mut entry = archive
        .by_name(&member)
        .map_err(|e| format!("reading {member}: {e}"))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| format!("reading {member}: {e}"))?;
    Ok(bytes)
}

/// Materializes the wheel file into a throwaway temp directory, then extracts its core metadata.
pub struct WheelExtractedCoreMetadataStrategy {
    instance_id: String,
    precedence: u32,
    criticality: Criticality,
    wheel_strategy: Arc<dyn WheelFileStrategy>,
    wheel_timeout: Duration,
}

impl WheelExtractedCoreMetadataStrategy {
    /// Builds an instance. `wheel_strategy` is the dependency resolved from this plan's
    /// `StrategyRef`; `wheel_timeout_s` bounds how long the wheel materialization step may run.
    pub fn new(
        instance_id: &str,
        precedence: u32,
        criticality: Criticality,
        wheel_strategy: Arc<dyn WheelFileStrategy>,
        wheel_timeout_s: f64,
    ) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            precedence,
            criticality,
            wheel_strategy,
            wheel_timeout: Duration::from_secs_f64(wheel_timeout_s),
        }
    }
}

impl Strategy for WheelExtractedCoreMetadataStrategy {
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
impl CoreMetadataStrategy for WheelExtractedCoreMetadataStrategy {
    async fn resolve(&self, key: &CoreMetadataKey, destination_uri: &str) -> StrategyOutcome {
        let Some(dest_path) = destination_uri.strip_prefix("file://") else {
            return StrategyOutcome::Failed(format!(
                "unsupported destination scheme: {destination_uri}"
            ));
        };

        let scratch = match tempfile::Builder::new().prefix("pkgresolve-wheel-extract-").tempdir() {
            Ok(d) => d,
            Err(e) => return StrategyOutcome::Failed(format!("creating scratch dir: {e}")),
        };
        let wheel_path = scratch.path().join("artifact.whl");
        let wheel_uri = format!("file://{}", wheel_path.display());

        let wheel_key = WheelKey::new(key.name.clone(), key.version.clone(), key.tag.clone());
        if let Err(e) = wheel_key.set_origin_uri(key.file_url.clone()) {
            return StrategyOutcome::Failed(e.to_string());
        }

        let wheel_outcome = tokio::time::timeout(
            self.wheel_timeout,
            self.wheel_strategy.resolve(&wheel_key, &wheel_uri),
        )
        .await;

        match wheel_outcome {
            Err(_) => return StrategyOutcome::Failed("timed out materializing wheel for metadata extraction".into()),
            Ok(StrategyOutcome::Failed(message)) => {
                return StrategyOutcome::Failed(format!("delegate wheel strategy failed: {message}"))
            }
            Ok(StrategyOutcome::NotApplicable(reason)) => {
                return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(format!(
                    "delegate wheel strategy does not apply: {reason}"
                )))
            }
            Ok(StrategyOutcome::Resolved(_)) => {}
        }

        let metadata_bytes = match extract_dist_info_metadata(&wheel_path) {
            Ok(bytes) => bytes,
            Err(e) => return StrategyOutcome::Failed(e),
        };

        if let Err(e) = tokio::fs::write(dest_path, &metadata_bytes).await {
            return StrategyOutcome::Failed(format!("writing {dest_path}: {e}"));
        }

        let digest = compute_bytes_digest::<Sha256>(&metadata_bytes);
        let sha256_hex = HEXLOWER.encode(digest.as_ref());
        StrategyOutcome::Resolved(
            ArtifactRecord::new(
                destination_uri,
                key.file_url.clone(),
                ArtifactSource::WheelExtractedCoreMetadata,
            )
            .with_hash("sha256", sha256_hex)
            .with_size(metadata_bytes.len() as u64),
        )
    }
}
