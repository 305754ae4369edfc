//! Public entry point: ties configuration, lifecycle, repository, and the resolution engine
//! together behind one async call per run.

use crate::builtin_strategies::register_builtin_strategies;
use crate::chain::{CoreMetadataKind, IndexMetadataKind, StrategyChainResolver};
use crate::coordinator::ArtifactCoordinator;
use crate::error::{ResolutionError, RepositoryError};
use crate::lifecycle::{run_lifecycle, StrategyRegistry};
use crate::repository::{ArtifactRepository, EphemeralArtifactRepository};
use crate::resolve::{resolve_environment, Provider};
use crate::types::{ResolutionEnv, WheelSpec};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What kind of output a resolution run should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Only the rendered requirements-file text.
    RequirementsTxt,
    /// Requirements text plus each pinned wheel's direct download URL.
    ResolvedWheels,
}

/// The input to one resolution run: root requirements, the environments to resolve them against,
/// and the configuration needed to stand up a fresh strategy chain for the run.
#[derive(Debug, Clone)]
pub struct ResolutionParams {
    /// Top-level requirements to resolve.
    pub root_wheels: Vec<WheelSpec>,
    /// Every environment to resolve against, keyed internally by `ResolutionEnv::identifier`.
    pub target_environments: Vec<ResolutionEnv>,
    /// What to include in the output.
    pub mode: ResolutionMode,
    /// Base URL of the simple index to resolve against.
    pub index_base: String,
    /// Per-instance strategy configuration, keyed by `instance_id` (or bare `strategy_name`).
    pub strategy_configs: BTreeMap<String, Value>,
}

/// The output of one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    /// Rendered requirements text, keyed by environment identifier.
    pub requirements_by_env: BTreeMap<String, String>,
    /// Pinned wheel URLs, keyed by environment identifier. Only populated in `ResolvedWheels` mode.
    pub resolved_wheels_by_env: BTreeMap<String, Vec<String>>,
}

/// Resolves `params` end to end: a fresh workspace and strategy registry are built for this call
/// only, every target environment is resolved in turn, and the workspace is torn down before
/// returning on every exit path, success or failure.
pub async fn resolve(params: ResolutionParams) -> Result<ResolutionResult, ResolutionError> {
    let repository: Arc<dyn ArtifactRepository> =
        Arc::new(EphemeralArtifactRepository::new().map_err(RepositoryError::Io)?);

    let mut registry = StrategyRegistry::new();
    register_builtin_strategies(&mut registry)?;
    let chains = run_lifecycle(&registry, &params.strategy_configs)?;

    let index_coordinator = Arc::new(ArtifactCoordinator::<IndexMetadataKind>::new(
        repository.clone(),
        StrategyChainResolver::new(chains.index_metadata),
    ));
    let core_metadata_coordinator = Arc::new(ArtifactCoordinator::<CoreMetadataKind>::new(
        repository.clone(),
        StrategyChainResolver::new(chains.core_metadata),
    ));

    let roots: Vec<Arc<WheelSpec>> = params.root_wheels.into_iter().map(Arc::new).collect();
    let index_base = params.index_base.clone();
    let mode = params.mode;

    let mut requirements_by_env = BTreeMap::new();
    let mut resolved_wheels_by_env = BTreeMap::new();

    let outcome: Result<(), ResolutionError> = async {
        for env in params.target_environments {
            let env_id = env.identifier.clone();
            let provider = Provider::new(
                index_coordinator.clone(),
                core_metadata_coordinator.clone(),
                index_base.clone(),
                env,
            );
            let resolved = resolve_environment(&provider, &roots).await?;
            requirements_by_env.insert(env_id.clone(), resolved.requirements_text);
            if mode == ResolutionMode::ResolvedWheels {
                resolved_wheels_by_env.insert(env_id, resolved.resolved_wheel_uris);
            }
        }
        Ok(())
    }
    .await;

    repository.close().await;
    outcome?;

    Ok(ResolutionResult {
        requirements_by_env,
        resolved_wheels_by_env,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_result_defaults_to_empty() {
        let result = ResolutionResult::default();
        assert!(result.requirements_by_env.is_empty());
        assert!(result.resolved_wheels_by_env.is_empty());
    }
}
