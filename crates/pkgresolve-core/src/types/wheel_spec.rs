//! The top-level requirement a caller hands to the resolution engine.

use super::package_name::PackageName;
use pep440_rs::VersionSpecifiers;
use std::collections::BTreeSet;
use thiserror::Error;

/// A single top-level requirement: either "give me the best version matching this specifier from
/// an index" or "give me exactly this URL", optionally gated by extras/markers.
#[derive(Debug, Clone)]
pub struct WheelSpec {
    /// Project name being requested.
    pub name: PackageName,
    /// Acceptable version range, when resolving against an index.
    pub version: Option<VersionSpecifiers>,
    /// Exact artifact location, when pinning a direct URL instead of resolving a version.
    pub uri: Option<url::Url>,
    /// Extras requested on this project.
    pub extras: BTreeSet<String>,
    /// Raw PEP 508 marker expression gating whether this requirement applies at all, e.g.
    /// `sys_platform == "win32"`. Evaluated against a [`pep508_rs::MarkerEnvironment`] by parsing
    /// it as a throwaway requirement (`"x; {marker}"`) and reading back its marker tree.
    pub marker: Option<String>,
}

/// Error constructing a [`WheelSpec`].
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum WheelSpecError {
    #[error("wheel spec for '{0}' must set either a version specifier or a direct uri")]
    MissingVersionOrUri(String),
}

impl WheelSpec {
    /// Builds a new spec, enforcing that at least one of `version`/`uri` is set.
    pub fn new(
        name: PackageName,
        version: Option<VersionSpecifiers>,
        uri: Option<url::Url>,
        extras: BTreeSet<String>,
        marker: Option<String>,
    ) -> Result<Self, WheelSpecError> {
        if version.is_none() && uri.is_none() {
            return Err(WheelSpecError::MissingVersionOrUri(
                name.as_source_str().to_string(),
            ));
        }
        Ok(Self {
            name,
            version,
            uri,
            extras,
            marker,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn requires_version_or_uri() {
        let name: PackageName = "foo".parse().unwrap();
        let err = WheelSpec::new(name, None, None, BTreeSet::new(), None).unwrap_err();
        assert!(matches!(err, WheelSpecError::MissingVersionOrUri(_)));
    }
}
