//! Top-level error types. Every public-facing error implements [`miette::Diagnostic`] so callers
//! embedding this crate in a CLI get the same rich-error rendering the rest of the ecosystem does.

use crate::types::ArtifactKey;
use miette::Diagnostic;
use thiserror::Error;

/// Failure acquiring one artifact through a strategy chain: every strategy in the chain either
/// declined (not applicable) or failed; `causes` holds one entry per strategy that actually
/// attempted and failed.
#[derive(Debug, Error, Diagnostic)]
#[error("failed to resolve artifact {key}: no strategy in the chain could produce it")]
pub struct ArtifactResolutionError {
    /// The artifact every strategy in the chain was asked to produce.
    pub key: ArtifactKey,
    /// One error per strategy that attempted and failed (strategies that declined as "not
    /// applicable" are not represented here).
    #[related]
    pub causes: Vec<StrategyFailure>,
}

/// One strategy's failure to produce an artifact it claimed to be applicable to.
#[derive(Debug, Error, Diagnostic)]
#[error("strategy '{strategy_name}' failed: {message}")]
pub struct StrategyFailure {
    /// Name of the strategy instance that failed.
    pub strategy_name: String,
    /// Human-readable failure detail.
    pub message: String,
}

/// Errors raised while assembling the strategy lifecycle (registry -> plan -> topo-sort ->
/// instantiate) before any resolution work begins.
#[derive(Debug, Error, Diagnostic)]
#[allow(missing_docs)]
pub enum LifecycleError {
    #[error("strategy '{0}' is registered twice from origin {1}")]
    DuplicateRegistration(String, String),

    #[error("strategy '{0}' referenced by config was never registered")]
    UnknownStrategy(String),

    #[error("strategy '{strategy}' depends on '{dependency}' via a StrategyRef, but '{dependency}' was never planned for this artifact kind")]
    UnresolvedStrategyRef { strategy: String, dependency: String },

    #[error("strategy '{strategy}' forms a dependency cycle through its StrategyRef constructor arguments")]
    DependencyCycle { strategy: String },

    #[error(
        "strategy '{strategy}' has criticality {criticality:?}, which conflicts with the \
         chain's uniform criticality {chain_criticality:?}"
    )]
    CriticalityMismatch {
        strategy: String,
        criticality: String,
        chain_criticality: String,
    },

    #[error("constructor argument '{arg}' of strategy '{strategy}' could not be resolved: {message}")]
    CtorArgResolution {
        strategy: String,
        arg: String,
        message: String,
    },
}

/// Errors raised by the [`crate::repository`] layer managing the ephemeral workspace.
#[derive(Debug, Error, Diagnostic)]
#[allow(missing_docs)]
pub enum RepositoryError {
    #[error("artifact {0} was requested but never materialized")]
    NotFound(ArtifactKey),

    #[error("io error allocating workspace entry: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Resolution(#[from] ArtifactResolutionError),
}

/// Errors raised by the dependency-resolution engine itself (as distinct from artifact
/// acquisition, which surfaces [`ArtifactResolutionError`]).
#[derive(Debug, Error, Diagnostic)]
#[allow(missing_docs)]
pub enum ResolveError {
    #[error("no version of '{0}' satisfies the combined requirements{1}")]
    NoMatchingVersion(String, String),

    #[error("conflicting requirements on '{0}': {1}")]
    Conflict(String, String),

    #[error("direct-url dependency on '{0}' is disallowed by the current policy")]
    DirectUrlDisallowed(String),

    #[error("direct-url dependency on '{0}' uses disallowed scheme '{1}'")]
    DisallowedUrlScheme(String, String),

    #[error("invalid Requires-Dist entry on '{0}': {1}")]
    InvalidRequiresDist(String, String),

    #[error(transparent)]
    Artifact(#[from] ArtifactResolutionError),

    #[error("backtracking exhausted all candidates without finding a consistent solution")]
    Exhausted,
}

/// The top-level error returned by the public resolution entry point.
#[derive(Debug, Error, Diagnostic)]
#[allow(missing_docs)]
pub enum ResolutionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),
}
