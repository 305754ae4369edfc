//! Composes a repository with a strategy chain for one artifact kind.

use crate::chain::{ChainKind, StrategyChainResolver};
use crate::error::RepositoryError;
use crate::repository::ArtifactRepository;
use crate::types::{ArtifactKey, ArtifactRecord};
use std::sync::Arc;

/// Ties one artifact kind's chain resolver to the shared repository, implementing the
/// get-or-fetch contract: a repository hit short-circuits the chain entirely.
pub struct ArtifactCoordinator<K: ChainKind> {
    repository: Arc<dyn ArtifactRepository>,
    chain: StrategyChainResolver<K>,
}

impl<K: ChainKind> ArtifactCoordinator<K> {
    /// Builds a coordinator over a shared repository and a precedence-ordered chain.
    pub fn new(repository: Arc<dyn ArtifactRepository>, chain: StrategyChainResolver<K>) -> Self {
        Self { repository, chain }
    }

    /// Resolves `key`: a repository hit is returned directly; otherwise a destination is
    /// allocated, the chain is invoked, and a successful result is persisted before being
    /// returned.
    pub async fn resolve(
        &self,
        key: &K::Key,
        artifact_key: ArtifactKey,
    ) -> Result<ArtifactRecord, RepositoryError>
    where
        K::Key: Clone,
    {
        if let Some(record) = self.repository.get(&artifact_key).await {
            return Ok(record);
        }

        let destination_uri = self.repository.allocate_destination_uri(&artifact_key)?;
        let record = self
            .chain
            .resolve(key, &destination_uri, artifact_key.clone())
            .await?;
        self.repository.put(artifact_key, record.clone()).await;
        Ok(record)
    }
}
