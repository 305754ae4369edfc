//! Stable topological sort of strategy plans by their `StrategyRef` dependency edges.

use super::plan::StrategyPlan;
use crate::error::LifecycleError;
use std::collections::{BTreeMap, BTreeSet};

/// Orders `plans` so that every plan appears after all plans it `depends_on`. Ties among
/// simultaneously-ready nodes are broken by `(precedence ascending, instance_id lexicographic)`,
/// matching the lifecycle's documented tiebreak exactly. A dependency cycle is fatal.
pub fn topo_sort(plans: Vec<StrategyPlan>) -> Result<Vec<StrategyPlan>, LifecycleError> {
    let by_id: BTreeMap<String, StrategyPlan> =
        plans.into_iter().map(|p| (p.instance_id.clone(), p)).collect();

    let mut indegree: BTreeMap<String, usize> =
        by_id.keys().map(|id| (id.clone(), 0)).collect();
    let mut dependents: BTreeMap<String, Vec<String>> =
        by_id.keys().map(|id| (id.clone(), Vec::new())).collect();

    for (id, plan) in &by_id {
        for dep in &plan.depends_on {
            *indegree.get_mut(id).expect("id is a key of by_id") += 1;
            dependents
                .get_mut(dep)
                .expect("dependency validated to be enabled before topo_sort runs")
                .push(id.clone());
        }
    }

    let mut ready: BTreeSet<(u32, String)> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| {
            let plan = &by_id[id];
            (plan.precedence, id.clone())
        })
        .collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    while let Some((_, id)) = ready.iter().next().cloned() {
        ready.remove(&(by_id[&id].precedence, id.clone()));
        for dependent in dependents.get(&id).cloned().unwrap_or_default() {
            let deg = indegree.get_mut(&dependent).expect("dependent is a known id");
            *deg -= 1;
            if *deg == 0 {
                let plan = &by_id[&dependent];
                ready.insert((plan.precedence, dependent));
            }
        }
        ordered.push(id);
    }

    if ordered.len() != by_id.len() {
        let cyclic = by_id
            .keys()
            .find(|id| !ordered.contains(id))
            .cloned()
            .unwrap_or_default();
        return Err(LifecycleError::DependencyCycle { strategy: cyclic });
    }

    let mut by_id = by_id;
    Ok(ordered
        .into_iter()
        .map(|id| by_id.remove(&id).expect("id came from by_id's own keys"))
        .collect())
}
