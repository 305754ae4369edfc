//! Constructs live strategy instances from topologically-ordered plans.

use super::plan::StrategyPlan;
use super::registry::{PlannedAttributes, StrategyRegistry};
use crate::error::LifecycleError;
use crate::strategy::{CoreMetadataStrategy, IndexMetadataStrategy, Strategy, WheelFileStrategy};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A constructed strategy instance, tagged by which typed contract it implements.
pub enum StrategyHandle {
    /// See [`IndexMetadataStrategy`].
    IndexMetadata(Arc<dyn IndexMetadataStrategy>),
    /// See [`CoreMetadataStrategy`].
    CoreMetadata(Arc<dyn CoreMetadataStrategy>),
    /// See [`WheelFileStrategy`].
    Wheel(Arc<dyn WheelFileStrategy>),
}

impl StrategyHandle {
    /// The instance's declared name, regardless of which typed contract it implements.
    pub fn name(&self) -> &str {
        match self {
            StrategyHandle::IndexMetadata(s) => s.name(),
            StrategyHandle::CoreMetadata(s) => s.name(),
            StrategyHandle::Wheel(s) => s.name(),
        }
    }

    /// The index-metadata strategy this handle wraps, if it wraps one.
    pub fn as_index_metadata(&self) -> Option<&Arc<dyn IndexMetadataStrategy>> {
        match self {
            StrategyHandle::IndexMetadata(s) => Some(s),
            _ => None,
        }
    }

    /// The core-metadata strategy this handle wraps, if it wraps one.
    pub fn as_core_metadata(&self) -> Option<&Arc<dyn CoreMetadataStrategy>> {
        match self {
            StrategyHandle::CoreMetadata(s) => Some(s),
            _ => None,
        }
    }

    /// The wheel-file strategy this handle wraps, if it wraps one.
    pub fn as_wheel(&self) -> Option<&Arc<dyn WheelFileStrategy>> {
        match self {
            StrategyHandle::Wheel(s) => Some(s),
            _ => None,
        }
    }
}

/// Constructs every plan in `plans` (expected to already be topologically sorted -- see
/// [`super::topo::topo_sort`]), resolving each plan's `StrategyRef` dependencies to the handles
/// built for earlier plans.
pub fn instantiate_all(
    registry: &StrategyRegistry,
    plans: Vec<StrategyPlan>,
) -> Result<BTreeMap<String, Arc<StrategyHandle>>, LifecycleError> {
    let mut built: BTreeMap<String, Arc<StrategyHandle>> = BTreeMap::new();

    for plan in &plans {
        let factory = registry
            .factory(&plan.strategy_name)
            .ok_or_else(|| LifecycleError::UnknownStrategy(plan.strategy_name.clone()))?;

        let deps: BTreeMap<String, Arc<StrategyHandle>> = plan
            .depends_on
            .iter()
            .map(|dep_id| {
                built
                    .get(dep_id)
                    .cloned()
                    .map(|handle| (dep_id.clone(), handle))
                    .ok_or_else(|| LifecycleError::UnresolvedStrategyRef {
                        strategy: plan.instance_id.clone(),
                        dependency: dep_id.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let attrs = PlannedAttributes {
            precedence: plan.precedence,
            criticality: plan.criticality,
        };
        let handle = factory(&plan.instance_id, attrs, &plan.ctor_args, &deps)?;

        if handle.name() != plan.instance_id {
            return Err(LifecycleError::CtorArgResolution {
                strategy: plan.strategy_name.clone(),
                arg: "instance_id".into(),
                message: format!(
                    "constructed instance reports name '{}' but plan expected '{}'",
                    handle.name(),
                    plan.instance_id
                ),
            });
        }

        built.insert(plan.instance_id.clone(), Arc::new(handle));
    }

    Ok(built)
}
