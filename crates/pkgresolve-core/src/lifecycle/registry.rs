//! The explicit plugin registry standing in for dynamic entry-point discovery: built-in
//! strategies self-register under [`StrategyOrigin::Builtin`], and an embedding application can
//! register additional ones under [`StrategyOrigin::Entrypoint`] before a resolution run starts.

use crate::error::LifecycleError;
use crate::strategy::{ArtifactKeyKind, Criticality, InstantiationPolicy};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a [`StrategyFactory`] needs to build one live instance, beyond its own
/// constructor arguments: the precedence/criticality the planner resolved for it, so the
/// constructed object can answer [`crate::strategy::Strategy::precedence`] and
/// [`crate::strategy::Strategy::criticality`] without re-deriving them.
#[derive(Debug, Clone, Copy)]
pub struct PlannedAttributes {
    /// See [`super::plan::StrategyPlan::precedence`].
    pub precedence: u32,
    /// See [`super::plan::StrategyPlan::criticality`].
    pub criticality: Criticality,
}

use super::instantiate::StrategyHandle;

/// Where a registered strategy came from, used only to produce better duplicate-registration
/// diagnostics (it has no effect on planning or instantiation order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOrigin {
    /// Registered by this crate's own `builtin_strategies` module.
    Builtin,
    /// Registered by an embedding application, standing in for a setuptools-style plugin.
    Entrypoint,
}

impl std::fmt::Display for StrategyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StrategyOrigin::Builtin => "builtin",
            StrategyOrigin::Entrypoint => "entrypoint",
        })
    }
}

/// A strategy class's static facts, known before any instance is planned or constructed.
#[derive(Debug, Clone)]
pub struct StrategyDescriptor {
    /// Name this strategy is registered and referenced under.
    pub strategy_name: String,
    /// Which kind of artifact this strategy produces.
    pub kind: ArtifactKeyKind,
    /// Default precedence, used when a config doesn't override it.
    pub default_precedence: u32,
    /// Default criticality, used when a config doesn't override it.
    pub default_criticality: Criticality,
    /// Singleton strategies may have at most one bound instance, and it must be named after the
    /// strategy itself.
    pub instantiation_policy: InstantiationPolicy,
    /// Default ctor-arg values merged underneath whatever a config supplies.
    pub defaults: Value,
}

/// Constructs a live strategy instance from its resolved constructor arguments (with every
/// `StrategyRef` already rewritten to the referenced instance's handle).
pub type StrategyFactory = Arc<
    dyn Fn(
            &str,
            PlannedAttributes,
            &Value,
            &BTreeMap<String, Arc<StrategyHandle>>,
        ) -> Result<StrategyHandle, LifecycleError>
        + Send
        + Sync,
>;

struct Registration {
    origin: StrategyOrigin,
    descriptor: StrategyDescriptor,
    factory: StrategyFactory,
}

/// The full set of strategy classes known to one resolution run.
#[derive(Default)]
pub struct StrategyRegistry {
    registrations: BTreeMap<String, Registration>,
}

impl StrategyRegistry {
    /// Builds an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy class. Fails if `strategy_name` is already registered, regardless of
    /// origin -- duplicate names across origins are always fatal.
    pub fn register(
        &mut self,
        origin: StrategyOrigin,
        descriptor: StrategyDescriptor,
        factory: StrategyFactory,
    ) -> Result<(), LifecycleError> {
        let name = descriptor.strategy_name.clone();
        if self.registrations.contains_key(&name) {
            return Err(LifecycleError::DuplicateRegistration(name, origin.to_string()));
        }
        self.registrations.insert(
            name,
            Registration {
                origin,
                descriptor,
                factory,
            },
        );
        Ok(())
    }

    /// Looks up a registered strategy's descriptor.
    pub fn descriptor(&self, strategy_name: &str) -> Option<&StrategyDescriptor> {
        self.registrations.get(strategy_name).map(|r| &r.descriptor)
    }

    /// Looks up a registered strategy's origin.
    pub fn origin(&self, strategy_name: &str) -> Option<StrategyOrigin> {
        self.registrations.get(strategy_name).map(|r| r.origin)
    }

    /// Looks up a registered strategy's factory.
    pub fn factory(&self, strategy_name: &str) -> Option<StrategyFactory> {
        self.registrations.get(strategy_name).map(|r| r.factory.clone())
    }

    /// Iterates every registered strategy name, in a stable (lexicographic) order.
    pub fn strategy_names(&self) -> impl Iterator<Item = &str> {
        self.registrations.keys().map(String::as_str)
    }

    /// True if `strategy_name` is known.
    pub fn contains(&self, strategy_name: &str) -> bool {
        self.registrations.contains_key(strategy_name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn dummy_descriptor(name: &str) -> StrategyDescriptor {
        StrategyDescriptor {
            strategy_name: name.to_string(),
            kind: ArtifactKeyKind::Wheel,
            default_precedence: 50,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({}),
        }
    }

    #[test]
    fn rejects_duplicate_strategy_names_across_origins() {
        let mut registry = StrategyRegistry::new();
        let factory: StrategyFactory = Arc::new(|_, _, _, _| unreachable!());
        registry
            .register(StrategyOrigin::Builtin, dummy_descriptor("http"), factory.clone())
            .unwrap();
        let err = registry
            .register(StrategyOrigin::Entrypoint, dummy_descriptor("http"), factory)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicateRegistration(_, _)));
    }
}
