//! Turns `instance_id -> raw_cfg` configuration into [`StrategyPlan`]s.

use super::plan::{apply_strategy_id_convention, scan_strategy_refs, strip_reserved_keys, StrategyPlan};
use super::registry::StrategyRegistry;
use crate::error::LifecycleError;
use crate::strategy::Criticality;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Merges `override_cfg` over `defaults`, with object fields merged key-by-key and any other
/// value kind replaced outright.
fn merge_defaults(defaults: &Value, override_cfg: &Value) -> Value {
    match (defaults, override_cfg) {
        (Value::Object(base), Value::Object(over)) => {
            let mut merged = base.clone();
            for (k, v) in over {
                merged.insert(k.clone(), v.clone());
            }
            Value::Object(merged)
        }
        _ => override_cfg.clone(),
    }
}

/// Parses an explicit `criticality` value. Unlike the absent-key case (which falls back to the
/// descriptor default silently), a present-but-unrecognized value is a configuration error -- a
/// typo like `"requried"` must not be indistinguishable from not setting `criticality` at all.
fn coerce_criticality(strategy_name: &str, instance_id: &str, value: &Value) -> Result<Criticality, LifecycleError> {
    match value.as_str() {
        Some("imperative") => Ok(Criticality::Imperative),
        Some("required") => Ok(Criticality::Required),
        Some("optional") => Ok(Criticality::Optional),
        Some("disabled") => Ok(Criticality::Disabled),
        _ => Err(LifecycleError::CtorArgResolution {
            strategy: strategy_name.to_string(),
            arg: "criticality".into(),
            message: format!("instance '{instance_id}' has unrecognized criticality value {value}"),
        }),
    }
}

/// Ingests `instance_id -> raw_cfg` configuration entries plus the registry's built-in/entrypoint
/// strategy set, producing the full plan list for every enabled instance. Singleton policy,
/// reserved-key stripping, and `StrategyRef` scanning all happen here, per the lifecycle's
/// "config ingestion" and "planning per strategy" phases.
pub fn build_plans(
    registry: &StrategyRegistry,
    raw_configs: &BTreeMap<String, Value>,
) -> Result<Vec<StrategyPlan>, LifecycleError> {
    let mut cfg_by_iid: BTreeMap<String, Value> = BTreeMap::new();
    let mut bound_iids_by_strategy: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (instance_id, raw_cfg) in raw_configs {
        if instance_id.is_empty() {
            return Err(LifecycleError::CtorArgResolution {
                strategy: String::new(),
                arg: "instance_id".into(),
                message: "instance_id must be non-empty".into(),
            });
        }
        if let Some(embedded) = raw_cfg.get("instance_id").and_then(Value::as_str) {
            if embedded != instance_id {
                return Err(LifecycleError::CtorArgResolution {
                    strategy: instance_id.clone(),
                    arg: "instance_id".into(),
                    message: format!(
                        "embedded instance_id '{embedded}' does not match config key '{instance_id}'"
                    ),
                });
            }
        }
        let strategy_name = raw_cfg
            .get("strategy_name")
            .and_then(Value::as_str)
            .unwrap_or(instance_id)
            .to_string();
        if !registry.contains(&strategy_name) {
            return Err(LifecycleError::UnknownStrategy(strategy_name));
        }
        cfg_by_iid.insert(instance_id.clone(), raw_cfg.clone());
        bound_iids_by_strategy
            .entry(strategy_name)
            .or_default()
            .push(instance_id.clone());
    }

    let mut plans = Vec::new();

    for strategy_name in registry.strategy_names() {
        let descriptor = registry
            .descriptor(strategy_name)
            .expect("strategy_name came from registry.strategy_names()");
        let origin = registry
            .origin(strategy_name)
            .expect("strategy_name came from registry.strategy_names()");
        let bound = bound_iids_by_strategy.get(strategy_name).cloned();

        let instance_ids: Vec<String> = match (origin, bound) {
            (crate::lifecycle::registry::StrategyOrigin::Entrypoint, None) => continue,
            (crate::lifecycle::registry::StrategyOrigin::Builtin, None) => {
                vec![strategy_name.to_string()]
            }
            (_, Some(ids)) => ids,
        };

        if descriptor.instantiation_policy == crate::strategy::InstantiationPolicy::Singleton
            && !(instance_ids.len() == 1 && instance_ids[0] == strategy_name)
        {
            return Err(LifecycleError::CtorArgResolution {
                strategy: strategy_name.to_string(),
                arg: "instance_id".into(),
                message: format!(
                    "singleton strategy '{strategy_name}' must have exactly one instance, named after itself"
                ),
            });
        }

        for instance_id in instance_ids {
            let raw_cfg = cfg_by_iid
                .get(&instance_id)
                .cloned()
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            let merged = merge_defaults(&descriptor.defaults, &raw_cfg);

            let precedence = merged
                .get("precedence")
                .and_then(Value::as_u64)
                .map(|v| v as u32)
                .unwrap_or(descriptor.default_precedence);
            let criticality = match merged.get("criticality") {
                Some(v) => coerce_criticality(strategy_name, &instance_id, v)?,
                None => descriptor.default_criticality,
            };

            if criticality == Criticality::Disabled {
                continue;
            }

            let mut ctor_args = strip_reserved_keys(&merged);
            let mut depends_on = apply_strategy_id_convention(&mut ctor_args);
            scan_strategy_refs(&ctor_args, &mut depends_on);

            plans.push(StrategyPlan {
                instance_id: instance_id.clone(),
                strategy_name: strategy_name.to_string(),
                kind: descriptor.kind,
                precedence,
                criticality,
                depends_on,
                ctor_args,
            });
        }
    }

    let mut seen = BTreeSet::new();
    for plan in &plans {
        if !seen.insert(plan.instance_id.clone()) {
            return Err(LifecycleError::CtorArgResolution {
                strategy: plan.strategy_name.clone(),
                arg: "instance_id".into(),
                message: format!("duplicate instance_id '{}'", plan.instance_id),
            });
        }
    }

    let enabled: BTreeSet<&str> = plans.iter().map(|p| p.instance_id.as_str()).collect();
    for plan in &plans {
        for dep in &plan.depends_on {
            if !enabled.contains(dep.as_str()) {
                return Err(LifecycleError::UnresolvedStrategyRef {
                    strategy: plan.instance_id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    check_imperative_closure(&plans)?;

    Ok(plans)
}

fn check_imperative_closure(plans: &[StrategyPlan]) -> Result<(), LifecycleError> {
    let by_id: BTreeMap<&str, &StrategyPlan> =
        plans.iter().map(|p| (p.instance_id.as_str(), p)).collect();

    for plan in plans {
        if plan.criticality != Criticality::Imperative {
            continue;
        }
        let mut stack: Vec<&str> = plan.depends_on.iter().map(String::as_str).collect();
        let mut visited = BTreeSet::new();
        while let Some(dep_id) = stack.pop() {
            if !visited.insert(dep_id) {
                continue;
            }
            let Some(dep_plan) = by_id.get(dep_id) else {
                continue;
            };
            if dep_plan.criticality != Criticality::Imperative {
                return Err(LifecycleError::CriticalityMismatch {
                    strategy: dep_plan.instance_id.clone(),
                    criticality: format!("{:?}", dep_plan.criticality),
                    chain_criticality: "Imperative".to_string(),
                });
            }
            stack.extend(dep_plan.depends_on.iter().map(String::as_str));
        }
    }
    Ok(())
}
