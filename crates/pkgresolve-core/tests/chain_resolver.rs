//! Exercises [`pkgresolve_core::chain::StrategyChainResolver`] directly against small, fully
//! synthetic strategies -- no repository, no index fixtures, just the dispatch contract itself:
//! skip `NotApplicable` silently, stop at the first `Resolved`, and aggregate every `Failed` cause
//! if the whole chain is exhausted.

mod support;

use async_trait::async_trait;
use pkgresolve_core::chain::{IndexMetadataKind, StrategyChainResolver};
use pkgresolve_core::lifecycle::StrategyHandle;
use pkgresolve_core::strategy::{Criticality, IndexMetadataStrategy, NotApplicable, Strategy, StrategyOutcome};
use pkgresolve_core::types::{ArtifactKey, ArtifactRecord, ArtifactSource, IndexMetadataKey};
use std::sync::Arc;

struct ScriptedStrategy {
    name: String,
    criticality: Criticality,
    precedence: u32,
    outcome: fn() -> StrategyOutcome,
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        &self.name
    }
    fn criticality(&self) -> Criticality {
        self.criticality
    }
    fn precedence(&self) -> u32 {
        self.precedence
    }
}

#[async_trait]
impl IndexMetadataStrategy for ScriptedStrategy {
    async fn resolve(&self, _key: &IndexMetadataKey, _destination_uri: &str) -> StrategyOutcome {
        (self.outcome)()
    }
}

fn handle(name: &str, precedence: u32, outcome: fn() -> StrategyOutcome) -> Arc<StrategyHandle> {
    Arc::new(StrategyHandle::IndexMetadata(Arc::new(ScriptedStrategy {
        name: name.to_string(),
        criticality: Criticality::Required,
        precedence,
        outcome,
    })))
}

fn test_key() -> IndexMetadataKey {
    IndexMetadataKey {
        project: "demo".parse().unwrap(),
        index_base: "file:///fake-index".to_string(),
    }
}

#[tokio::test]
async fn not_applicable_strategies_are_skipped_silently() {
    let chain = StrategyChainResolver::<IndexMetadataKind>::new(vec![
        handle("first", 10, || {
            StrategyOutcome::NotApplicable(NotApplicable::new("declines everything"))
        }),
        handle("second", 20, || {
            StrategyOutcome::Resolved(ArtifactRecord::new(
                "file:///tmp/out.json",
                "fixture://demo",
                ArtifactSource::Other,
            ))
        }),
    ]);

    let key = test_key();
    let record = chain
        .resolve(&key, "file:///tmp/out.json", ArtifactKey::IndexMetadata(key.clone()))
        .await
        .unwrap();
    assert_eq!(record.origin_uri, "fixture://demo");
}

#[tokio::test]
async fn a_failure_is_not_surfaced_once_a_later_strategy_succeeds() {
    let chain = StrategyChainResolver::<IndexMetadataKind>::new(vec![
        handle("flaky", 10, || StrategyOutcome::Failed("connection reset".to_string())),
        handle("reliable", 20, || {
            StrategyOutcome::Resolved(ArtifactRecord::new(
                "file:///tmp/out.json",
                "fixture://demo",
                ArtifactSource::Other,
            ))
        }),
    ]);

    let key = test_key();
    let record = chain
        .resolve(&key, "file:///tmp/out.json", ArtifactKey::IndexMetadata(key.clone()))
        .await
        .unwrap();
    assert_eq!(record.origin_uri, "fixture://demo");
}

#[tokio::test]
async fn every_failure_cause_is_aggregated_in_encounter_order_when_the_chain_is_exhausted() {
    let chain = StrategyChainResolver::<IndexMetadataKind>::new(vec![
        handle("first", 10, || StrategyOutcome::Failed("first failed".to_string())),
        handle("second", 20, || StrategyOutcome::Failed("second failed".to_string())),
    ]);

    let key = test_key();
    let err = chain
        .resolve(&key, "file:///tmp/out.json", ArtifactKey::IndexMetadata(key.clone()))
        .await
        .unwrap_err();

    assert_eq!(err.causes.len(), 2);
    assert_eq!(err.causes[0].strategy_name, "first");
    assert_eq!(err.causes[0].message, "first failed");
    assert_eq!(err.causes[1].strategy_name, "second");
    assert_eq!(err.causes[1].message, "second failed");
}

#[tokio::test]
async fn not_applicable_outcomes_are_not_recorded_as_causes_on_exhaustion() {
    let chain = StrategyChainResolver::<IndexMetadataKind>::new(vec![
        handle("silent", 10, || {
            StrategyOutcome::NotApplicable(NotApplicable::new("never applies"))
        }),
        handle("loud", 20, || StrategyOutcome::Failed("boom".to_string())),
    ]);

    let key = test_key();
    let err = chain
        .resolve(&key, "file:///tmp/out.json", ArtifactKey::IndexMetadata(key.clone()))
        .await
        .unwrap_err();

    assert_eq!(err.causes.len(), 1);
    assert_eq!(err.causes[0].strategy_name, "loud");
}
