//! Core resolution engine, artifact acquisition pipeline, and strategy lifecycle for resolving
//! Python wheel dependencies into a pinned, reproducible set.
//!
//! This crate resolves; it does not install. Given a set of root requirements and one or more
//! target environments, it produces a rendered requirements-file block per environment (and,
//! optionally, each pinned wheel's direct download URL) via [`facade::resolve`]. Everything it
//! needs to fetch along the way -- index listings, core metadata, wheel files -- goes through a
//! pluggable, precedence-ordered chain of acquisition strategies (see [`strategy`] and
//! [`lifecycle`]) backed by a per-run ephemeral workspace (see [`repository`]).

#![deny(missing_docs)]

/// Core data model: package/artifact identity, compatibility tags, and the resolution target.
pub mod types;

mod rfc822;

pub mod error;
pub mod strategy;

pub mod lifecycle;

/// Generic per-kind dispatch over a precedence-ordered strategy chain. Most callers only need the
/// ready-made chain built by [`lifecycle::run_lifecycle`] and wired up by [`facade::resolve`];
/// this module is public so embedders can wire a custom chain directly, e.g. to splice in a
/// strategy that isn't registered through the normal lifecycle.
pub mod chain;
/// Ties a [`chain::StrategyChainResolver`] to a [`repository::ArtifactRepository`]. See `chain`.
pub mod coordinator;
pub mod repository;

pub mod builtin_strategies;

mod graph;
mod resolve;

mod facade;

pub use error::{ArtifactResolutionError, LifecycleError, RepositoryError, ResolutionError, ResolveError, StrategyFailure};
pub use facade::{resolve, ResolutionMode, ResolutionParams, ResolutionResult};
pub use graph::{GraphError, ResolvedGraph, ResolvedNode};
pub use resolve::{resolve_environment, Provider, ResolvedEnvironment};

pub use pep440_rs::{Version, VersionSpecifier, VersionSpecifiers};
pub use pep508_rs::{MarkerEnvironment, Requirement};
