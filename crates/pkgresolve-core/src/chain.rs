//! Dispatches one artifact key through an ordered sequence of strategies, collecting failure
//! causes until one strategy succeeds or the whole chain is exhausted.

use crate::error::{ArtifactResolutionError, StrategyFailure};
use crate::lifecycle::StrategyHandle;
use crate::strategy::{Criticality, StrategyOutcome};
use crate::types::{ArtifactKey, ArtifactRecord, CoreMetadataKey, IndexMetadataKey, WheelKey};
use std::sync::Arc;

/// Resolves one artifact kind by trying each of its planned strategies in precedence order.
pub struct StrategyChainResolver<K> {
    strategies: Vec<Arc<StrategyHandle>>,
    _kind: std::marker::PhantomData<K>,
}

/// Per-kind accessor so [`StrategyChainResolver`] can stay generic over the three artifact kinds
/// without duplicating the dispatch loop three times.
pub trait ChainKind: Sized {
    /// The key type this chain dispatches.
    type Key;
    /// Extracts this handle's specialization for the kind, if it has one.
    fn handle(strategy: &StrategyHandle) -> Option<&dyn DispatchStrategy<Self>>;
}

/// Object-safe dispatch surface shared by all three typed strategy traits, so the chain resolver
/// can call `resolve` without knowing which concrete trait it's talking to.
#[async_trait::async_trait]
pub trait DispatchStrategy<K: ChainKind>: Send + Sync {
    /// See the corresponding typed strategy trait's `resolve`.
    async fn dispatch(&self, key: &K::Key, destination_uri: &str) -> StrategyOutcome;
    /// This strategy's criticality.
    fn criticality(&self) -> Criticality;
    /// This strategy's name.
    fn name(&self) -> &str;
}

/// Marker type selecting the index-metadata specialization of [`StrategyChainResolver`].
pub struct IndexMetadataKind;
/// Marker type selecting the core-metadata specialization of [`StrategyChainResolver`].
pub struct CoreMetadataKind;
/// Marker type selecting the wheel-file specialization of [`StrategyChainResolver`].
pub struct WheelKind;

#[async_trait::async_trait]
impl DispatchStrategy<IndexMetadataKind> for dyn crate::strategy::IndexMetadataStrategy {
    async fn dispatch(&self, key: &IndexMetadataKey, destination_uri: &str) -> StrategyOutcome {
        self.resolve(key, destination_uri).await
    }
    fn criticality(&self) -> Criticality {
        crate::strategy::Strategy::criticality(self)
    }
    fn name(&self) -> &str {
        crate::strategy::Strategy::name(self)
    }
}

#[async_trait::async_trait]
impl DispatchStrategy<CoreMetadataKind> for dyn crate::strategy::CoreMetadataStrategy {
    async fn dispatch(&self, key: &CoreMetadataKey, destination_uri: &str) -> StrategyOutcome {
        self.resolve(key, destination_uri).await
    }
    fn criticality(&self) -> Criticality {
        crate::strategy::Strategy::criticality(self)
    }
    fn name(&self) -> &str {
        crate::strategy::Strategy::name(self)
    }
}

#[async_trait::async_trait]
impl DispatchStrategy<WheelKind> for dyn crate::strategy::WheelFileStrategy {
    async fn dispatch(&self, key: &WheelKey, destination_uri: &str) -> StrategyOutcome {
        self.resolve(key, destination_uri).await
    }
    fn criticality(&self) -> Criticality {
        crate::strategy::Strategy::criticality(self)
    }
    fn name(&self) -> &str {
        crate::strategy::Strategy::name(self)
    }
}

impl ChainKind for IndexMetadataKind {
    type Key = IndexMetadataKey;
    fn handle(strategy: &StrategyHandle) -> Option<&dyn DispatchStrategy<Self>> {
        strategy
            .as_index_metadata()
            .map(|s| s.as_ref() as &dyn DispatchStrategy<Self>)
    }
}

impl ChainKind for CoreMetadataKind {
    type Key = CoreMetadataKey;
    fn handle(strategy: &StrategyHandle) -> Option<&dyn DispatchStrategy<Self>> {
        strategy
            .as_core_metadata()
            .map(|s| s.as_ref() as &dyn DispatchStrategy<Self>)
    }
}

impl ChainKind for WheelKind {
    type Key = WheelKey;
    fn handle(strategy: &StrategyHandle) -> Option<&dyn DispatchStrategy<Self>> {
        strategy.as_wheel().map(|s| s.as_ref() as &dyn DispatchStrategy<Self>)
    }
}

impl<K: ChainKind> StrategyChainResolver<K> {
    /// Builds a chain resolver from an already precedence-ordered strategy list.
    pub fn new(strategies: Vec<Arc<StrategyHandle>>) -> Self {
        Self {
            strategies,
            _kind: std::marker::PhantomData,
        }
    }

    /// Resolves `key`, materializing into `destination_uri` on success. Implements the
    /// strategy-chain resolver contract: criticality uniformity is checked up front, strategies
    /// are dispatched in order, "not applicable" is skipped silently, and every other failure is
    /// collected into the aggregated error raised if the whole chain is exhausted.
    pub async fn resolve(
        &self,
        key: &K::Key,
        destination_uri: &str,
        artifact_key: ArtifactKey,
    ) -> Result<ArtifactRecord, ArtifactResolutionError> {
        let active: Vec<&dyn DispatchStrategy<K>> = self
            .strategies
            .iter()
            .filter_map(|s| K::handle(s))
            .collect();

        let criticalities: Vec<Criticality> = active
            .iter()
            .map(|s| s.criticality())
            .filter(|c| *c != Criticality::Disabled)
            .collect();
        let all_imperative = criticalities.iter().all(|c| *c == Criticality::Imperative);
        let none_imperative = criticalities.iter().all(|c| *c != Criticality::Imperative);
        if !all_imperative && !none_imperative {
            return Err(ArtifactResolutionError {
                key: artifact_key,
                causes: vec![StrategyFailure {
                    strategy_name: "<chain>".to_string(),
                    message: "mixed imperative and non-imperative strategies in one chain".to_string(),
                }],
            });
        }

        let mut causes = Vec::new();
        for strategy in active {
            if strategy.criticality() == Criticality::Disabled {
                continue;
            }
            tracing::debug!(strategy = strategy.name(), %artifact_key, "dispatching strategy");
            match strategy.dispatch(key, destination_uri).await {
                StrategyOutcome::Resolved(record) => return Ok(record),
                StrategyOutcome::NotApplicable(reason) => {
                    tracing::debug!(strategy = strategy.name(), %reason, "strategy not applicable");
                }
                StrategyOutcome::Failed(message) => {
                    tracing::warn!(strategy = strategy.name(), %message, "strategy failed");
                    causes.push(StrategyFailure {
                        strategy_name: strategy.name().to_string(),
                        message,
                    });
                }
            }
        }

        Err(ArtifactResolutionError {
            key: artifact_key,
            causes,
        })
    }
}
