//! Turns declared strategy classes and user configuration into ordered, live strategy chains.
//! Runs once per resolution call and is fully deterministic.

mod config;
mod instantiate;
mod plan;
mod registry;
mod topo;

pub use instantiate::StrategyHandle;
pub use plan::{extract_strategy_ref, StrategyPlan, STRATEGY_REF_KEY};
pub use registry::{
    PlannedAttributes, StrategyDescriptor, StrategyFactory, StrategyOrigin, StrategyRegistry,
};

use crate::error::LifecycleError;
use crate::strategy::ArtifactKeyKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The fully assembled output of one lifecycle run: every constructed strategy instance, grouped
/// by artifact kind and already ordered for direct use by a [`crate::chain::StrategyChainResolver`].
pub struct StrategyChains {
    /// Index-metadata strategies, precedence-ordered.
    pub index_metadata: Vec<Arc<StrategyHandle>>,
    /// Core-metadata strategies, precedence-ordered.
    pub core_metadata: Vec<Arc<StrategyHandle>>,
    /// Wheel-file strategies, precedence-ordered.
    pub wheel: Vec<Arc<StrategyHandle>>,
}

/// Runs the full lifecycle: config ingestion, planning, dependency/imperative-closure validation,
/// topological ordering, and instantiation.
pub fn run_lifecycle(
    registry: &StrategyRegistry,
    raw_configs: &BTreeMap<String, Value>,
) -> Result<StrategyChains, LifecycleError> {
    let plans = config::build_plans(registry, raw_configs)?;

    // Record each plan's (kind, instance_id) pair before topo_sort consumes the plan list, so we
    // can regroup the constructed handles by kind afterwards without re-deriving it from the
    // handle's dynamic type.
    let kind_by_id: BTreeMap<String, ArtifactKeyKind> = plans
        .iter()
        .map(|p| (p.instance_id.clone(), p.kind))
        .collect();
    let precedence_by_id: BTreeMap<String, u32> =
        plans.iter().map(|p| (p.instance_id.clone(), p.precedence)).collect();

    let sorted = topo::topo_sort(plans)?;
    let instance_order: Vec<String> = sorted.iter().map(|p| p.instance_id.clone()).collect();
    let built = instantiate::instantiate_all(registry, sorted)?;

    let mut index_metadata = Vec::new();
    let mut core_metadata = Vec::new();
    let mut wheel = Vec::new();

    for instance_id in &instance_order {
        let handle = built
            .get(instance_id)
            .cloned()
            .expect("instantiate_all builds a handle for every id it was given");
        match kind_by_id[instance_id] {
            ArtifactKeyKind::IndexMetadata => index_metadata.push(handle),
            ArtifactKeyKind::CoreMetadata => core_metadata.push(handle),
            ArtifactKeyKind::Wheel => wheel.push(handle),
        }
    }

    for group in [&mut index_metadata, &mut core_metadata, &mut wheel] {
        group.sort_by(|a, b| {
            let pa = precedence_by_id[a.name()];
            let pb = precedence_by_id[b.name()];
            pa.cmp(&pb).then_with(|| a.name().cmp(b.name()))
        });
    }

    Ok(StrategyChains {
        index_metadata,
        core_metadata,
        wheel,
    })
}
