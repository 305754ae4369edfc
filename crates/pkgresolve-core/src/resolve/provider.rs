//! Candidate generation, filtering, and dependency expansion: the provider half of the
//! resolution engine. Holds the run-scoped caches (index listings, core metadata, accumulated
//! extras) that make repeated lookups for the same project cheap within one resolve call.

use crate::chain::{CoreMetadataKind, IndexMetadataKind};
use crate::coordinator::ArtifactCoordinator;
use crate::error::{RepositoryError, ResolutionError, ResolveError};
use crate::rfc822::RFC822ish;
use crate::types::{
    ArtifactHashes, ArtifactInfo, ArtifactKey, CoreMetadataKey, HashAlgorithm, IndexMetadataKey,
    NormalizedPackageName, PackageName, ParsePackageNameError, ParsedRequirement, ProjectInfo,
    ResolutionEnv, RequiresDistUrlPolicy, InvalidRequiresDistPolicy, PrereleasePolicy,
    WheelFilename, WheelKey, WheelSpec, WheelTag, YankedWheelPolicy,
};
use pep440_rs::{Version, VersionSpecifiers};
use pep508_rs::VersionOrUrl;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

/// `(name, version, tag)` triples the solver has already rejected; `find_matches` must not
/// surface them again.
pub type Incompatible = BTreeSet<(String, String, String)>;

/// Candidate generation, filtering, and dependency expansion for one environment.
pub struct Provider {
    index_coordinator: Arc<ArtifactCoordinator<IndexMetadataKind>>,
    core_metadata_coordinator: Arc<ArtifactCoordinator<CoreMetadataKind>>,
    index_base: String,
    env: ResolutionEnv,
    index_cache: Mutex<BTreeMap<String, Arc<ProjectInfo>>>,
    core_metadata_cache: Mutex<BTreeMap<(String, String, String, String), Arc<String>>>,
    requested_extras_by_name: Mutex<BTreeMap<String, BTreeSet<String>>>,
}

impl Provider {
    /// Builds a provider over the given coordinators, targeting one environment against one
    /// index.
    pub fn new(
        index_coordinator: Arc<ArtifactCoordinator<IndexMetadataKind>>,
        core_metadata_coordinator: Arc<ArtifactCoordinator<CoreMetadataKind>>,
        index_base: impl Into<String>,
        env: ResolutionEnv,
    ) -> Self {
        Self {
            index_coordinator,
            core_metadata_coordinator,
            index_base: index_base.into(),
            env,
            index_cache: Mutex::new(BTreeMap::new()),
            core_metadata_cache: Mutex::new(BTreeMap::new()),
            requested_extras_by_name: Mutex::new(BTreeMap::new()),
        }
    }

    /// The environment this provider resolves against.
    pub fn env(&self) -> &ResolutionEnv {
        &self.env
    }

    /// PEP 503 canonicalization of a requirement or candidate name.
    pub fn identify(name: &str) -> Result<NormalizedPackageName, ParsePackageNameError> {
        name.parse()
    }

    /// Whether a root requirement's marker (if any) applies to this provider's environment.
    /// A marker that fails to parse is tolerated as applying, matching the leniency this engine
    /// applies to other malformed marker-adjacent input.
    pub fn root_applies(&self, root: &WheelSpec) -> bool {
        match &root.marker {
            None => true,
            Some(raw) => match marker_tree_from_str(raw) {
                Some(tree) => tree.evaluate(&self.env.marker_environment, &[]),
                None => true,
            },
        }
    }

    /// Remembers that `extras` were requested against `identifier`; once recorded, extras only
    /// accumulate for the lifetime of this provider.
    pub fn record_extras(&self, identifier: &NormalizedPackageName, extras: &BTreeSet<String>) {
        self.requested_extras_by_name
            .lock()
            .entry(identifier.as_str().to_string())
            .or_default()
            .extend(extras.iter().cloned());
    }

    /// Every extra ever recorded against `identifier`.
    pub fn extras_for(&self, identifier: &NormalizedPackageName) -> BTreeSet<String> {
        self.requested_extras_by_name
            .lock()
            .get(identifier.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Finds every candidate wheel satisfying the shape of `requirements`, already sorted by
    /// descending preference (see `sort_candidates`). A direct-URI requirement short-circuits
    /// the index entirely: if any active requirement names a URI, only URI candidates are
    /// considered.
    pub async fn find_matches(
        &self,
        identifier: &NormalizedPackageName,
        requirements: &[Arc<WheelSpec>],
        incompatible: &Incompatible,
    ) -> Result<Vec<Arc<WheelKey>>, ResolutionError> {
        let extras: BTreeSet<String> = requirements.iter().flat_map(|r| r.extras.iter().cloned()).collect();
        self.record_extras(identifier, &extras);

        if requirements.iter().any(|r| r.uri.is_some()) {
            let mut candidates = self.direct_uri_candidates(identifier, requirements, incompatible)?;
            sort_candidates(&mut candidates);
            return Ok(candidates.into_iter().map(Arc::new).collect());
        }

        let mut candidates = self.index_candidates(identifier, requirements, incompatible).await?;
        sort_candidates(&mut candidates);
        Ok(candidates.into_iter().map(Arc::new).collect())
    }

    fn direct_uri_candidates(
        &self,
        identifier: &NormalizedPackageName,
        requirements: &[Arc<WheelSpec>],
        incompatible: &Incompatible,
    ) -> Result<Vec<WheelKey>, ResolutionError> {
        let mut candidates = Vec::new();
        for req in requirements.iter().filter(|r| r.uri.is_some()) {
            let uri = req.uri.as_ref().expect("filtered to requirements carrying a uri");
            let filename = uri
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .unwrap_or_default()
                .to_string();

            let wheel_filename = WheelFilename::from_filename(&filename, identifier).map_err(|e| {
                ResolveError::NoMatchingVersion(
                    identifier.as_str().to_string(),
                    format!(": direct-uri requirement '{uri}' is not a parseable wheel filename: {e}"),
                )
            })?;

            let file_tags: Vec<WheelTag> = wheel_filename.all_tags_iter().collect();
            let Some(best_tag) = self.env.supported_tags.best_of(file_tags.iter()) else {
                continue;
            };
            let best_tag = best_tag.to_string();
            let version_str = wheel_filename.version.to_string();

            if incompatible.contains(&(identifier.as_str().to_string(), version_str.clone(), best_tag.clone())) {
                continue;
            }
            if let Some(spec) = &req.version {
                if !specifier_contains(spec, &wheel_filename.version, self.env.policy.prerelease_policy) {
                    continue;
                }
            }

            let mut key = WheelKey::new(identifier.clone(), version_str, best_tag);
            key.satisfied_tags = file_tags.iter().map(ToString::to_string).collect();
            key.extras = req.extras.clone();
            key.marker = req.marker.clone();
            key.set_origin_uri(uri.to_string())
                .expect("freshly constructed key has an unset origin_uri");
            candidates.push(key);
        }
        Ok(candidates)
    }

    async fn index_candidates(
        &self,
        identifier: &NormalizedPackageName,
        requirements: &[Arc<WheelSpec>],
        incompatible: &Incompatible,
    ) -> Result<Vec<WheelKey>, ResolutionError> {
        let combined: VersionSpecifiers = combine_specifiers(requirements.iter().filter_map(|r| r.version.as_ref()));
        let project_info = self.project_info(identifier).await?;
        let python_version = environment_python_version(&self.env);

        let mut non_yanked = Vec::new();
        let mut yanked = Vec::new();
        for file in &project_info.files {
            let Some(key) = self.filter_file(identifier, file, &combined, &python_version, incompatible) else {
                continue;
            };
            if file.yanked.yanked {
                yanked.push(key);
            } else {
                non_yanked.push(key);
            }
        }

        Ok(match self.env.policy.yanked_wheel_policy {
            YankedWheelPolicy::ExcludeAlways => non_yanked,
            YankedWheelPolicy::ExcludeUnlessRequired => {
                if non_yanked.is_empty() {
                    yanked
                } else {
                    non_yanked
                }
            }
        })
    }

    fn filter_file(
        &self,
        identifier: &NormalizedPackageName,
        file: &ArtifactInfo,
        combined: &VersionSpecifiers,
        python_version: &Version,
        incompatible: &Incompatible,
    ) -> Option<WheelKey> {
        if !file.filename.to_ascii_lowercase().ends_with(".whl") {
            return None;
        }
        let wheel_filename = WheelFilename::from_filename(&file.filename, identifier).ok()?;

        if !combined.is_empty()
            && !specifier_contains(combined, &wheel_filename.version, self.env.policy.prerelease_policy)
        {
            return None;
        }
        if let Some(requires_python) = &file.requires_python {
            if !requires_python.contains(python_version) {
                return None;
            }
        }

        let file_tags: Vec<WheelTag> = wheel_filename.all_tags_iter().collect();
        let best_tag = self.env.supported_tags.best_of(file_tags.iter())?.to_string();
        let (algorithm, hex) = best_hash(file.hashes.as_ref())?;
        let version_str = wheel_filename.version.to_string();

        if incompatible.contains(&(identifier.as_str().to_string(), version_str.clone(), best_tag.clone())) {
            return None;
        }

        let mut key = WheelKey::new(identifier.clone(), version_str, best_tag);
        key.satisfied_tags = file_tags.iter().map(ToString::to_string).collect();
        key.requires_python = file.requires_python.as_ref().map(ToString::to_string);
        key.set_content_hash(algorithm, hex)
            .expect("freshly constructed key has an unset content_hash");
        key.set_origin_uri(file.url.to_string())
            .expect("freshly constructed key has an unset origin_uri");
        Some(key)
    }

    /// Whether `candidate` satisfies `requirement`.
    pub fn is_satisfied_by(&self, requirement: &WheelSpec, candidate: &WheelKey) -> bool {
        let requirement_name = NormalizedPackageName::from(requirement.name.clone());
        if requirement_name != candidate.name {
            return false;
        }
        if let Some(uri) = &requirement.uri {
            return candidate.origin_uri() == Some(uri.as_str());
        }
        match &requirement.version {
            None => true,
            Some(spec) => match crate::types::pep440_or_raw(&candidate.version) {
                Some(version) => specifier_contains(spec, &version, self.env.policy.prerelease_policy),
                None => false,
            },
        }
    }

    /// Translates one candidate's `Requires-Dist` entries into child [`WheelSpec`]s, honoring
    /// the environment's marker evaluation and `invalid_requires_dist_policy`.
    pub async fn get_dependencies(
        &self,
        candidate: &Arc<WheelKey>,
        extras: &BTreeSet<String>,
    ) -> Result<Vec<WheelSpec>, ResolutionError> {
        let Some(origin_uri) = candidate.origin_uri().map(str::to_string) else {
            return Ok(Vec::new());
        };

        let cache_key = (
            candidate.name.as_str().to_string(),
            candidate.version.clone(),
            candidate.tag.clone(),
            origin_uri.clone(),
        );
        let text = match self.core_metadata_cache.lock().get(&cache_key).cloned() {
            Some(text) => text,
            None => {
                let key = CoreMetadataKey {
                    name: candidate.name.clone(),
                    version: candidate.version.clone(),
                    tag: candidate.tag.clone(),
                    file_url: origin_uri,
                };
                let record = self
                    .core_metadata_coordinator
                    .resolve(&key, ArtifactKey::CoreMetadata(key.clone()))
                    .await?;
                let path = file_path_from_uri(&record.destination_uri);
                let bytes = tokio::fs::read(&path).await.map_err(RepositoryError::Io)?;
                let text = Arc::new(String::from_utf8_lossy(&bytes).into_owned());
                self.core_metadata_cache.lock().insert(cache_key, text.clone());
                text
            }
        };

        let mut parsed = RFC822ish::parse(&text).map_err(|e| {
            ResolveError::InvalidRequiresDist(candidate.name.as_str().to_string(), e.to_string())
        })?;

        let mut specs = Vec::new();
        for raw in parsed.take_all("Requires-Dist") {
            if raw.trim().is_empty() {
                continue;
            }
            let requirement: ParsedRequirement = match raw.parse() {
                Ok(requirement) => requirement,
                Err(e) => {
                    if self.env.policy.invalid_requires_dist_policy == InvalidRequiresDistPolicy::Reject {
                        return Err(ResolveError::InvalidRequiresDist(
                            candidate.name.as_str().to_string(),
                            e.to_string(),
                        )
                        .into());
                    }
                    tracing::warn!(name = candidate.name.as_str(), requirement = %raw, "dropping invalid Requires-Dist entry");
                    continue;
                }
            };

            let marker_str = requirement.marker.as_ref().map(ToString::to_string);
            if let Some(marker) = &requirement.marker {
                let included = if extras.is_empty() {
                    marker.evaluate(&self.env.marker_environment, &[""])
                } else {
                    extras
                        .iter()
                        .any(|extra| marker.evaluate(&self.env.marker_environment, &[extra.as_str()]))
                };
                if !included {
                    continue;
                }
            }

            if let Some(spec) = self.translate_requirement(candidate.name.as_str(), requirement, marker_str)? {
                specs.push(spec);
            }
        }
        Ok(specs)
    }

    fn translate_requirement(
        &self,
        parent: &str,
        requirement: ParsedRequirement,
        marker_str: Option<String>,
    ) -> Result<Option<WheelSpec>, ResolutionError> {
        let ParsedRequirement {
            name,
            extras,
            version_or_url,
            ..
        } = requirement;

        let name: PackageName = name
            .parse()
            .map_err(|e: ParsePackageNameError| ResolveError::InvalidRequiresDist(parent.to_string(), e.to_string()))?;
        let extras: BTreeSet<String> = extras.into_iter().flatten().collect();

        let (version, uri) = match version_or_url {
            None => (Some(combine_specifiers(std::iter::empty())), None),
            Some(VersionOrUrl::VersionSpecifier(spec)) => (Some(spec), None),
            Some(VersionOrUrl::Url(url)) => match self.env.policy.requires_dist_url_policy {
                RequiresDistUrlPolicy::Reject => {
                    return Err(ResolveError::DirectUrlDisallowed(name.as_source_str().to_string()).into());
                }
                RequiresDistUrlPolicy::Allow => {
                    let scheme = url.scheme().to_string();
                    if !self.env.policy.allowed_requires_dist_url_schemes.iter().any(|s| s == &scheme) {
                        return Err(
                            ResolveError::DisallowedUrlScheme(name.as_source_str().to_string(), scheme).into(),
                        );
                    }
                    (None, Some(url))
                }
                RequiresDistUrlPolicy::Ignore => (Some(combine_specifiers(std::iter::empty())), None),
            },
        };

        let spec = WheelSpec::new(name, version, uri, extras, marker_str)
            .expect("version or uri is always populated above");
        Ok(Some(spec))
    }

    async fn project_info(&self, identifier: &NormalizedPackageName) -> Result<Arc<ProjectInfo>, ResolutionError> {
        if let Some(cached) = self.index_cache.lock().get(identifier.as_str()).cloned() {
            return Ok(cached);
        }

        let key = IndexMetadataKey {
            project: identifier.clone(),
            index_base: self.index_base.clone(),
        };
        let record = self
            .index_coordinator
            .resolve(&key, ArtifactKey::IndexMetadata(key.clone()))
            .await?;
        let path = file_path_from_uri(&record.destination_uri);
        let bytes = tokio::fs::read(&path).await.map_err(RepositoryError::Io)?;
        let info: ProjectInfo = serde_json::from_slice(&bytes).map_err(|e| {
            ResolveError::NoMatchingVersion(identifier.as_str().to_string(), format!(": malformed index metadata: {e}"))
        })?;
        let info = Arc::new(info);
        self.index_cache.lock().insert(identifier.as_str().to_string(), info.clone());
        Ok(info)
    }
}

fn file_path_from_uri(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

fn marker_tree_from_str(marker: &str) -> Option<pep508_rs::MarkerTree> {
    let requirement: ParsedRequirement = format!("x; {marker}").parse().ok()?;
    requirement.marker
}

/// The environment's Python version for `requires_python`/marker purposes: `python_full_version`
/// when it parses, falling back to `python_version`, and finally to `"0"` if neither does.
fn environment_python_version(env: &ResolutionEnv) -> Version {
    env.marker_environment
        .python_full_version
        .to_string()
        .parse()
        .or_else(|_| env.marker_environment.python_version.to_string().parse())
        .unwrap_or_else(|_| "0".parse().expect("'0' is always a valid PEP 440 version"))
}

/// `contains`, gated by `policy`: a prerelease candidate is rejected outright unless the policy
/// allows it, or (under the default policy) the specifier set itself only admits prereleases.
fn specifier_contains(specs: &VersionSpecifiers, version: &Version, policy: PrereleasePolicy) -> bool {
    let prereleases_allowed = match policy {
        PrereleasePolicy::Allow => true,
        PrereleasePolicy::Disallow => false,
        PrereleasePolicy::IfNecessaryOrExplicit => specs.iter().any(|s| s.version().is_prerelease()),
    };
    if version.is_prerelease() && !prereleases_allowed {
        return false;
    }
    specs.contains(version)
}

/// Conjunction of every version specifier in `specs` into one combined set.
fn combine_specifiers<'a>(specs: impl Iterator<Item = &'a VersionSpecifiers>) -> VersionSpecifiers {
    specs.flat_map(|s| s.iter().cloned()).collect()
}

/// `sha256`, then `sha512`, then `sha384` -- in preference order, skipping the file entirely if
/// none is available. [`ArtifactHashes`] currently only models `sha256`; see DESIGN.md.
fn best_hash(hashes: Option<&ArtifactHashes>) -> Option<(HashAlgorithm, String)> {
    let sha256 = hashes?.sha256.as_ref()?;
    Some((HashAlgorithm::Sha256, data_encoding::HEXLOWER.encode(sha256.as_ref())))
}

/// `(version_sort_key, tag)`, invalid versions sorting below valid ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum VersionSortKey {
    Invalid(String),
    Valid(Version),
}

fn version_sort_key(raw: &str) -> VersionSortKey {
    match crate::types::pep440_or_raw(raw) {
        Some(v) => VersionSortKey::Valid(v),
        None => VersionSortKey::Invalid(raw.to_string()),
    }
}

/// Sorts descending by `(version_sort_key, tag)`.
pub(crate) fn sort_candidates(candidates: &mut [WheelKey]) {
    candidates.sort_by(|a, b| {
        let ka = (version_sort_key(&a.version), a.tag.clone());
        let kb = (version_sort_key(&b.version), b.tag.clone());
        kb.cmp(&ka)
    });
}
