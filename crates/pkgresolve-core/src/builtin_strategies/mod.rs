//! The five acquisition strategies shipped with this crate, registered under
//! [`crate::lifecycle::StrategyOrigin::Builtin`]. An embedding application is free to add more
//! under [`crate::lifecycle::StrategyOrigin::Entrypoint`] before calling
//! [`crate::lifecycle::run_lifecycle`].

mod direct_uri;
mod http;
mod wheel_extracted;

pub use direct_uri::{DirectUriCoreMetadataStrategy, DirectUriWheelFileStrategy};
pub use http::{HttpWheelFileStrategy, Pep658CoreMetadataHttpStrategy, Pep691IndexMetadataHttpStrategy};
pub use wheel_extracted::{extract_dist_info_metadata, WheelExtractedCoreMetadataStrategy};

use crate::error::LifecycleError;
use crate::lifecycle::{
    extract_strategy_ref, PlannedAttributes, StrategyDescriptor, StrategyFactory, StrategyHandle,
    StrategyOrigin, StrategyRegistry,
};
use crate::strategy::{ArtifactKeyKind, Criticality, InstantiationPolicy};
use serde_json::{json, Value};
use std::sync::Arc;

fn deserialize_or<T: serde::de::DeserializeOwned + Default>(ctor_args: &Value) -> T {
    serde_json::from_value(ctor_args.clone()).unwrap_or_default()
}

/// Registers all five builtin strategies. Returns an error only if one is somehow already
/// registered, which cannot happen on a freshly built [`StrategyRegistry`].
pub fn register_builtin_strategies(registry: &mut StrategyRegistry) -> Result<(), LifecycleError> {
    registry.register(
        StrategyOrigin::Builtin,
        StrategyDescriptor {
            strategy_name: "pep691_http".to_string(),
            kind: ArtifactKeyKind::IndexMetadata,
            default_precedence: 50,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({"timeout_s": 30.0, "user_agent": "pkgresolve-core/0"}),
        },
        pep691_http_factory(),
    )?;

    registry.register(
        StrategyOrigin::Builtin,
        StrategyDescriptor {
            strategy_name: "wheel_http".to_string(),
            kind: ArtifactKeyKind::Wheel,
            default_precedence: 50,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({
                "timeout_s": 120.0,
                "user_agent": "pkgresolve-core/0",
                "chunk_bytes": 1024 * 1024,
            }),
        },
        wheel_http_factory(),
    )?;

    registry.register(
        StrategyOrigin::Builtin,
        StrategyDescriptor {
            strategy_name: "pep658_http".to_string(),
            kind: ArtifactKeyKind::CoreMetadata,
            default_precedence: 50,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({"timeout_s": 30.0, "user_agent": "pkgresolve-core/0"}),
        },
        pep658_http_factory(),
    )?;

    registry.register(
        StrategyOrigin::Builtin,
        StrategyDescriptor {
            strategy_name: "wheel_extracted_metadata".to_string(),
            kind: ArtifactKeyKind::CoreMetadata,
            default_precedence: 90,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({
                "wheel_strategy_id": "wheel_http",
                "wheel_timeout_s": 120.0,
            }),
        },
        wheel_extracted_factory(),
    )?;

    registry.register(
        StrategyOrigin::Builtin,
        StrategyDescriptor {
            strategy_name: "uri_wheel_file".to_string(),
            kind: ArtifactKeyKind::Wheel,
            default_precedence: 40,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({"chunk_bytes": 1024 * 1024}),
        },
        direct_uri_wheel_factory(),
    )?;

    registry.register(
        StrategyOrigin::Builtin,
        StrategyDescriptor {
            strategy_name: "direct_uri_core_metadata".to_string(),
            kind: ArtifactKeyKind::CoreMetadata,
            default_precedence: 40,
            default_criticality: Criticality::Required,
            instantiation_policy: InstantiationPolicy::Singleton,
            defaults: json!({}),
        },
        direct_uri_core_metadata_factory(),
    )?;

    Ok(())
}

fn pep691_http_factory() -> StrategyFactory {
    Arc::new(|instance_id, attrs, ctor_args, _deps| {
        let cfg = deserialize_or(ctor_args);
        Pep691IndexMetadataHttpStrategy::new(instance_id, attrs.precedence, attrs.criticality, cfg)
            .map(|s| StrategyHandle::IndexMetadata(Arc::new(s)))
            .map_err(|message| LifecycleError::CtorArgResolution {
                strategy: instance_id.to_string(),
                arg: "timeout_s/user_agent".to_string(),
                message,
            })
    })
}

fn wheel_http_factory() -> StrategyFactory {
    Arc::new(|instance_id, attrs, ctor_args, _deps| {
        let cfg = deserialize_or(ctor_args);
        HttpWheelFileStrategy::new(instance_id, attrs.precedence, attrs.criticality, cfg)
            .map(|s| StrategyHandle::Wheel(Arc::new(s)))
            .map_err(|message| LifecycleError::CtorArgResolution {
                strategy: instance_id.to_string(),
                arg: "timeout_s/user_agent/chunk_bytes".to_string(),
                message,
            })
    })
}

fn pep658_http_factory() -> StrategyFactory {
    Arc::new(|instance_id, attrs, ctor_args, _deps| {
        let cfg = deserialize_or(ctor_args);
        Pep658CoreMetadataHttpStrategy::new(instance_id, attrs.precedence, attrs.criticality, cfg)
            .map(|s| StrategyHandle::CoreMetadata(Arc::new(s)))
            .map_err(|message| LifecycleError::CtorArgResolution {
                strategy: instance_id.to_string(),
                arg: "timeout_s/user_agent".to_string(),
                message,
            })
    })
}

fn wheel_extracted_factory() -> StrategyFactory {
    Arc::new(|instance_id, attrs, ctor_args, deps| {
        let wheel_timeout_s = ctor_args
            .get("wheel_timeout_s")
            .and_then(Value::as_f64)
            .unwrap_or(120.0);

        let dep_id = extract_strategy_ref(ctor_args, "wheel_strategy")
            .map(str::to_string)
            .or_else(|| {
                ctor_args
                    .get("wheel_strategy_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "wheel_http".to_string());

        let dep_handle = deps.get(&dep_id).ok_or_else(|| LifecycleError::UnresolvedStrategyRef {
            strategy: instance_id.to_string(),
            dependency: dep_id.clone(),
        })?;
        let wheel_strategy = dep_handle.as_wheel().ok_or_else(|| LifecycleError::CtorArgResolution {
            strategy: instance_id.to_string(),
            arg: "wheel_strategy".to_string(),
            message: format!("dependency '{dep_id}' is not a wheel-file strategy"),
        })?;

        Ok(StrategyHandle::CoreMetadata(Arc::new(
            WheelExtractedCoreMetadataStrategy::new(
                instance_id,
                attrs.precedence,
                attrs.criticality,
                wheel_strategy.clone(),
                wheel_timeout_s,
            ),
        )))
    })
}

fn direct_uri_wheel_factory() -> StrategyFactory {
    Arc::new(|instance_id, attrs, ctor_args, _deps| {
        let cfg = deserialize_or(ctor_args);
        Ok(StrategyHandle::Wheel(Arc::new(DirectUriWheelFileStrategy::new(
            instance_id,
            attrs.precedence,
            attrs.criticality,
            cfg,
        ))))
    })
}

fn direct_uri_core_metadata_factory() -> StrategyFactory {
    Arc::new(|instance_id, attrs, _ctor_args, _deps| {
        Ok(StrategyHandle::CoreMetadata(Arc::new(DirectUriCoreMetadataStrategy::new(
            instance_id,
            attrs.precedence,
            attrs.criticality,
        ))))
    })
}
