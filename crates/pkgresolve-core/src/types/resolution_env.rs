//! The target environment a resolution is performed against, and the policies that govern how
//! strictly acquired data is trusted.

use super::tags::WheelTags;
use pep508_rs::MarkerEnvironment;
use serde::{Deserialize, Serialize};

/// What to do when a `Requires-Dist` entry carries a direct URL (`name @ https://...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiresDistUrlPolicy {
    /// Follow direct URLs encountered in `Requires-Dist`.
    Allow,
    /// Treat a direct-URL dependency as a resolution failure.
    Reject,
    /// Drop the URL and resolve the entry by name and specifier, as if no URL were present.
    Ignore,
}

/// What to do when a candidate's index entry is marked yanked (PEP 592).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YankedWheelPolicy {
    /// Exclude yanked candidates unless nothing else satisfies the requirement.
    ExcludeUnlessRequired,
    /// Exclude yanked candidates unconditionally.
    ExcludeAlways,
}

/// Prerelease admission policy, threaded through every version-set `contains` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrereleasePolicy {
    /// Only admit prereleases when a requirement explicitly pins one or no final release
    /// satisfies the specifier at all (PEP 440 semantics).
    IfNecessaryOrExplicit,
    /// Never admit prereleases, even if nothing else satisfies.
    Disallow,
    /// Always admit prereleases.
    Allow,
}

/// What to do with a `Requires-Dist` entry that fails to parse as PEP 508.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidRequiresDistPolicy {
    /// Skip the entry and continue (with a warning).
    Ignore,
    /// Fail resolution of the owning candidate.
    Reject,
}

/// The policy knobs that shape resolution for one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    /// See [`RequiresDistUrlPolicy`].
    pub requires_dist_url_policy: RequiresDistUrlPolicy,
    /// See [`YankedWheelPolicy`].
    pub yanked_wheel_policy: YankedWheelPolicy,
    /// See [`PrereleasePolicy`].
    pub prerelease_policy: PrereleasePolicy,
    /// See [`InvalidRequiresDistPolicy`].
    pub invalid_requires_dist_policy: InvalidRequiresDistPolicy,
    /// URL schemes a direct-URL `Requires-Dist` entry is allowed to use, when
    /// `requires_dist_url_policy` is `Allow`.
    pub allowed_requires_dist_url_schemes: Vec<String>,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            requires_dist_url_policy: RequiresDistUrlPolicy::Ignore,
            yanked_wheel_policy: YankedWheelPolicy::ExcludeUnlessRequired,
            prerelease_policy: PrereleasePolicy::IfNecessaryOrExplicit,
            invalid_requires_dist_policy: InvalidRequiresDistPolicy::Ignore,
            allowed_requires_dist_url_schemes: vec!["https".to_string()],
        }
    }
}

/// The target (interpreter, platform, markers) a resolution is performed against.
#[derive(Debug, Clone)]
pub struct ResolutionEnv {
    /// A short, stable name used in logs and in the `resolved_wheels_by_env` output map.
    pub identifier: String,
    /// The tags this environment accepts, most preferred first.
    pub supported_tags: WheelTags,
    /// PEP 508 marker environment used to evaluate `; extra == "..."` style markers.
    pub marker_environment: MarkerEnvironment,
    /// Policy knobs for this environment.
    pub policy: ResolutionPolicy,
}

impl ResolutionEnv {
    /// Builds a new resolution environment.
    pub fn new(
        identifier: impl Into<String>,
        supported_tags: WheelTags,
        marker_environment: MarkerEnvironment,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            supported_tags,
            marker_environment,
            policy,
        }
    }
}
