//! The strategy contract: what an acquisition strategy is, how critical it is to a chain, and
//! how many instances of it may exist at once.

use crate::types::{ArtifactKey, ArtifactRecord, CoreMetadataKey, IndexMetadataKey, WheelKey};
use async_trait::async_trait;
use std::fmt;

/// How important a strategy is to the chain it's planned into. All strategies planned for the
/// same artifact kind must share one criticality -- see [`crate::error::LifecycleError::CriticalityMismatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criticality {
    /// The chain as a whole must succeed; a failure here is fatal to the run.
    Imperative,
    /// The chain should try this strategy, but a full-chain failure degrades gracefully.
    Required,
    /// This strategy is attempted opportunistically; its failure is swallowed silently.
    Optional,
    /// The strategy is configured but inert: it is skipped without being dispatched.
    Disabled,
}

/// How many live instances of a strategy the lifecycle should create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstantiationPolicy {
    /// Exactly one instance, shared across every resolution that uses this chain.
    Singleton,
    /// A fresh instance per resolution run.
    Prototype,
}

/// Why a strategy declined to handle a key, as distinct from failing while trying.
#[derive(Debug, Clone)]
pub struct NotApplicable {
    /// Human-readable reason, used only for tracing output.
    pub reason: String,
}

impl NotApplicable {
    /// Builds a new not-applicable signal.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for NotApplicable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)
    }
}

/// The three-way outcome a single strategy invocation produces: a materialized record, a
/// declined-silently signal, or a hard failure with a message for the aggregated error.
pub enum StrategyOutcome {
    /// The strategy produced the artifact.
    Resolved(ArtifactRecord),
    /// The strategy does not apply to this key at all; the chain should move on without
    /// recording a failure cause.
    NotApplicable(NotApplicable),
    /// The strategy applies but failed while trying; the chain records this as a cause.
    Failed(String),
}

/// Common behavior every acquisition strategy shares regardless of artifact kind.
pub trait Strategy: Send + Sync {
    /// Stable name used in configuration, logs, and error messages.
    fn name(&self) -> &str;
    /// This strategy's criticality within its chain.
    fn criticality(&self) -> Criticality;
    /// This strategy's precedence within its chain; lower values are tried first.
    fn precedence(&self) -> u32;
}

/// Produces PEP 691 index-metadata documents for a project.
#[async_trait]
pub trait IndexMetadataStrategy: Strategy {
    /// Attempts to resolve `key`, writing any fetched bytes under `destination_uri`.
    async fn resolve(&self, key: &IndexMetadataKey, destination_uri: &str) -> StrategyOutcome;
}

/// Produces PEP 658 (or equivalent) core-metadata documents for one specific file.
#[async_trait]
pub trait CoreMetadataStrategy: Strategy {
    /// Attempts to resolve `key`, writing any fetched bytes under `destination_uri`.
    async fn resolve(&self, key: &CoreMetadataKey, destination_uri: &str) -> StrategyOutcome;
}

/// Materializes the wheel file itself.
#[async_trait]
pub trait WheelFileStrategy: Strategy {
    /// Attempts to resolve `key`, writing the wheel bytes under `destination_uri`.
    async fn resolve(&self, key: &WheelKey, destination_uri: &str) -> StrategyOutcome;
}

/// A strategy chain's single source of identity, used by the lifecycle to route a planned
/// strategy to the right trait object without an enum-per-kind split in the planning code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKeyKind {
    /// See [`crate::types::IndexMetadataKey`].
    IndexMetadata,
    /// See [`crate::types::CoreMetadataKey`].
    CoreMetadata,
    /// See [`crate::types::WheelKey`].
    Wheel,
}

impl ArtifactKeyKind {
    /// The kind of the given artifact key.
    pub fn of(key: &ArtifactKey) -> Self {
        match key {
            ArtifactKey::IndexMetadata(_) => Self::IndexMetadata,
            ArtifactKey::CoreMetadata(_) => Self::CoreMetadata,
            ArtifactKey::Wheel(_) => Self::Wheel,
        }
    }
}
