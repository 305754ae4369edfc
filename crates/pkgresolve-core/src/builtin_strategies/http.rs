//! Strategies that fetch artifacts straight from an HTTP simple index: PEP 691 project listings,
//! PEP 658 core-metadata sidecars, and wheel files themselves.

use crate::strategy::{
    Criticality, IndexMetadataStrategy, Strategy, StrategyOutcome, CoreMetadataStrategy,
    WheelFileStrategy,
};
use crate::types::{CoreMetadataKey, HashAlgorithm, IndexMetadataKey, WheelKey};
use async_trait::async_trait;
use data_encoding::HEXLOWER;
use rattler_digest::{compute_bytes_digest, Sha256};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_USER_AGENT: &str = "pkgresolve-core/0";

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct CommonHttpConfig {
    pub(crate) timeout_s: Option<f64>,
    pub(crate) user_agent: Option<String>,
}

fn build_client(cfg: &CommonHttpConfig) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs_f64(cfg.timeout_s.unwrap_or(30.0)))
        .user_agent(cfg.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()))
        .build()
        .map_err(|e| e.to_string())
}

/// Fetches a project's PEP 691 `application/vnd.pypi.simple.v1+json` listing over HTTP.
pub struct Pep691IndexMetadataHttpStrategy {
    instance_id: String,
    precedence: u32,
    criticality: Criticality,
    client: reqwest::Client,
}

impl Pep691IndexMetadataHttpStrategy {
    /// Builds an instance from its planned attributes and ctor args (`timeout_s`, `user_agent`).
    pub fn new(
        instance_id: &str,
        precedence: u32,
        criticality: Criticality,
        cfg: CommonHttpConfig,
    ) -> Result<Self, String> {
        Ok(Self {
            instance_id: instance_id.to_string(),
            precedence,
            criticality,
            client: build_client(&cfg)?,
        })
    }
}

impl Strategy for Pep691IndexMetadataHttpStrategy {
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
impl IndexMetadataStrategy for Pep691IndexMetadataHttpStrategy {
    async fn resolve(&self, key: &IndexMetadataKey, destination_uri: &str) -> StrategyOutcome {
        let url = format!(
            "{}/{}/",
            key.index_base.trim_end_matches('/'),
            key.project.as_str()
        );
        let response = match self
            .client
            .get(&url)
            .header(
                reqwest::header::ACCEPT,
                "application/vnd.pypi.simple.v1+json",
            )
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(format!("GET {url} failed: {e}")),
        };
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(format!(
                "{url} returned 404"
            )));
        }
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(e.to_string()),
        };
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return StrategyOutcome::Failed(format!("reading response body: {e}")),
        };
        match write_destination(destination_uri, &bytes).await {
            Ok(()) => StrategyOutcome::Resolved(crate::types::ArtifactRecord::new(
                destination_uri,
                url,
                crate::types::ArtifactSource::HttpPep691,
            )),
            Err(e) => StrategyOutcome::Failed(e),
        }
    }
}

/// Fetches a PEP 658 core-metadata sidecar (`{file_url}.metadata`) over HTTP.
pub struct Pep658CoreMetadataHttpStrategy {
    instance_id: String,
    precedence: u32,
    criticality: Criticality,
    client: reqwest::Client,
}

impl Pep658CoreMetadataHttpStrategy {
    /// Builds an instance from its planned attributes and ctor args (`timeout_s`, `user_agent`).
    pub fn new(
        instance_id: &str,
        precedence: u32,
        criticality: Criticality,
        cfg: CommonHttpConfig,
    ) -> Result<Self, String> {
        Ok(Self {
            instance_id: instance_id.to_string(),
            precedence,
            criticality,
            client: build_client(&cfg)?,
        })
    }
}

impl Strategy for Pep658CoreMetadataHttpStrategy {
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
impl CoreMetadataStrategy for Pep658CoreMetadataHttpStrategy {
    async fn resolve(&self, key: &CoreMetadataKey, destination_uri: &str) -> StrategyOutcome {
        let url = format!("{}.metadata", key.file_url);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(format!("GET {url} failed: {e}")),
        };
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(format!(
                "{url} has no PEP 658 metadata sidecar"
            )));
        }
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(e.to_string()),
        };
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return StrategyOutcome::Failed(format!("reading response body: {e}")),
        };
        match write_destination(destination_uri, &bytes).await {
            Ok(()) => StrategyOutcome::Resolved(crate::types::ArtifactRecord::new(
                destination_uri,
                url,
                crate::types::ArtifactSource::HttpPep658,
            )),
            Err(e) => StrategyOutcome::Failed(e),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct HttpWheelConfig {
    pub(crate) timeout_s: Option<f64>,
    pub(crate) user_agent: Option<String>,
    #[allow(dead_code)]
    pub(crate) chunk_bytes: Option<u64>,
}

/// Fetches a wheel file's bytes over HTTP, verifying its content hash when the key carries one.
pub struct HttpWheelFileStrategy {
    instance_id: String,
    precedence: u32,
    criticality: Criticality,
    client: reqwest::Client,
}

impl HttpWheelFileStrategy {
    /// Builds an instance from its planned attributes and ctor args (`timeout_s`, `user_agent`,
    /// `chunk_bytes`).
    pub fn new(
        instance_id: &str,
        precedence: u32,
        criticality: Criticality,
        cfg: HttpWheelConfig,
    ) -> Result<Self, String> {
        let common = CommonHttpConfig {
            timeout_s: cfg.timeout_s,
            user_agent: cfg.user_agent,
        };
        Ok(Self {
            instance_id: instance_id.to_string(),
            precedence,
            criticality,
            client: build_client(&common)?,
        })
    }
}

impl Strategy for HttpWheelFileStrategy {
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
impl WheelFileStrategy for HttpWheelFileStrategy {
    async fn resolve(&self, key: &WheelKey, destination_uri: &str) -> StrategyOutcome {
        let Some(origin_uri) = key.origin_uri() else {
            return StrategyOutcome::NotApplicable(crate::strategy::NotApplicable::new(
                "wheel key has no origin_uri yet",
            ));
        };
        let origin_uri = origin_uri.to_string();
        let response = match self.client.get(&origin_uri).send().await {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(format!("GET {origin_uri} failed: {e}")),
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return StrategyOutcome::Failed(e.to_string()),
        };
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return StrategyOutcome::Failed(format!("reading response body: {e}")),
        };

        if let (Some(expected_hex), Some(alg)) = (key.content_hash(), key.hash_algorithm) {
            if alg == HashAlgorithm::Sha256 {
                let digest = compute_bytes_digest::<Sha256>(&bytes);
                let actual_hex = HEXLOWER.encode(digest.as_ref());
                if actual_hex != expected_hex {
                    return StrategyOutcome::Failed(format!(
                        "sha256 mismatch for {origin_uri}: expected {expected_hex}, got {actual_hex}"
                    ));
                }
            }
        }

        match write_destination(destination_uri, &bytes).await {
            Ok(()) => {
                let digest = compute_bytes_digest::<Sha256>(&bytes);
                let sha256_hex = HEXLOWER.encode(digest.as_ref());
                StrategyOutcome::Resolved(
                    crate::types::ArtifactRecord::new(
                        destination_uri,
                        origin_uri,
                        crate::types::ArtifactSource::HttpWheel,
                    )
                    .with_hash("sha256", sha256_hex)
                    .with_size(bytes.len() as u64),
                )
            }
            Err(e) => StrategyOutcome::Failed(e),
        }
    }
}

async fn write_destination(destination_uri: &str, bytes: &[u8]) -> Result<(), String> {
    let path = destination_uri
        .strip_prefix("file://")
        .ok_or_else(|| format!("unsupported destination scheme: {destination_uri}"))?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| format!("writing {path}: {e}"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_client_from_defaults() {
        let cfg = CommonHttpConfig {
            timeout_s: None,
            user_agent: None,
        };
        assert!(build_client(&cfg).is_ok());
    }
}
