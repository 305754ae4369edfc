//! Shared fixtures for the integration tests in this directory. Everything here is hermetic: no
//! test ever reaches out over the network, only to temp-directory-backed `file://` fixtures built
//! with `test-utils`.

use async_trait::async_trait;
use pkgresolve_core::chain::{CoreMetadataKind, IndexMetadataKind, StrategyChainResolver};
use pkgresolve_core::coordinator::ArtifactCoordinator;
use pkgresolve_core::lifecycle::StrategyHandle;
use pkgresolve_core::repository::{ArtifactRepository, EphemeralArtifactRepository};
use pkgresolve_core::strategy::{Criticality, IndexMetadataStrategy, NotApplicable, Strategy, StrategyOutcome};
use pkgresolve_core::types::{
    ArtifactRecord, ArtifactSource, IndexMetadataKey, MarkerEnvironment, ResolutionEnv, ResolutionPolicy, WheelTag,
    WheelTags,
};
use pkgresolve_core::{builtin_strategies, Provider};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A linux/cpython-3.11 marker environment, in the style of the teacher's own
/// `win_environment_markers` test helper but for the platform these tests actually run fixtures
/// against.
pub fn linux_marker_environment() -> MarkerEnvironment {
    MarkerEnvironment {
        implementation_name: "cpython".to_string(),
        implementation_version: "3.11.0".parse().unwrap(),
        os_name: "posix".to_string(),
        platform_machine: "x86_64".to_string(),
        platform_python_implementation: "CPython".to_string(),
        platform_release: "6.5.0".to_string(),
        platform_system: "Linux".to_string(),
        platform_version: "#1 SMP".to_string(),
        python_full_version: "3.11.0".parse().unwrap(),
        python_version: "3.11".parse().unwrap(),
        sys_platform: "linux".to_string(),
    }
}

/// The compatibility universe a cpython 3.11/linux environment accepts.
pub fn linux_compatible_tags() -> WheelTags {
    let seed = WheelTag {
        interpreter: "cp311".to_string(),
        abi: "cp311".to_string(),
        platform: "linux_x86_64".to_string(),
    };
    WheelTags::from_env(3, 11, &seed)
}

/// Builds a [`ResolutionEnv`] named `identifier`, against linux/cpython-3.11, under `policy`.
pub fn test_env(identifier: &str, policy: ResolutionPolicy) -> ResolutionEnv {
    ResolutionEnv::new(identifier, linux_compatible_tags(), linux_marker_environment(), policy)
}

/// An [`IndexMetadataStrategy`] that serves pre-baked PEP 691 JSON bodies from an in-memory map
/// keyed by normalized project name, standing in for an HTTP index in tests.
pub struct FixtureIndexStrategy {
    name: String,
    bodies: Mutex<BTreeMap<String, serde_json::Value>>,
}

impl FixtureIndexStrategy {
    /// Builds a strategy serving exactly the bodies given, one per normalized project name.
    pub fn new(name: &str, bodies: BTreeMap<String, serde_json::Value>) -> Self {
        Self {
            name: name.to_string(),
            bodies: Mutex::new(bodies),
        }
    }
}

impl Strategy for FixtureIndexStrategy {
    fn name(&self) -> &str {
        &self.name
    }
    fn criticality(&self) -> Criticality {
        Criticality::Required
    }
    fn precedence(&self) -> u32 {
        10
    }
}

#[async_trait]
impl IndexMetadataStrategy for FixtureIndexStrategy {
    async fn resolve(&self, key: &IndexMetadataKey, destination_uri: &str) -> StrategyOutcome {
        let Some(body) = self.bodies.lock().unwrap().get(key.project.as_str()).cloned() else {
            return StrategyOutcome::NotApplicable(NotApplicable::new(format!(
                "no fixture registered for project '{}'",
                key.project.as_str()
            )));
        };
        let Some(path) = destination_uri.strip_prefix("file://") else {
            return StrategyOutcome::Failed(format!("unsupported destination scheme: {destination_uri}"));
        };
        let bytes = serde_json::to_vec(&body).expect("fixture bodies are always serializable");
        if let Err(e) = std::fs::write(path, &bytes) {
            return StrategyOutcome::Failed(format!("writing fixture index: {e}"));
        }
        StrategyOutcome::Resolved(ArtifactRecord::new(
            destination_uri,
            format!("fixture://{}", key.project.as_str()),
            ArtifactSource::Other,
        ))
    }
}

/// A fully wired [`Provider`], backed by an in-memory index fixture and the real
/// `file://`-capable core-metadata strategy. Dropping the returned repository tears the workspace
/// down; hang onto it for the lifetime of the provider.
pub fn provider_over_fixture(
    index_bodies: BTreeMap<String, serde_json::Value>,
    index_base: &str,
    env: ResolutionEnv,
) -> (Provider, Arc<dyn ArtifactRepository>) {
    let repository: Arc<dyn ArtifactRepository> =
        Arc::new(EphemeralArtifactRepository::new().expect("building a temp-dir-backed repository cannot fail here"));

    let index_handle = Arc::new(StrategyHandle::IndexMetadata(Arc::new(FixtureIndexStrategy::new(
        "fixture_index",
        index_bodies,
    ))));
    let core_metadata_handle = Arc::new(StrategyHandle::CoreMetadata(Arc::new(
        builtin_strategies::DirectUriCoreMetadataStrategy::new("direct_uri_core_metadata", 40, Criticality::Required),
    )));

    let index_coordinator = Arc::new(ArtifactCoordinator::<IndexMetadataKind>::new(
        repository.clone(),
        StrategyChainResolver::new(vec![index_handle]),
    ));
    let core_metadata_coordinator = Arc::new(ArtifactCoordinator::<CoreMetadataKind>::new(
        repository.clone(),
        StrategyChainResolver::new(vec![core_metadata_handle]),
    ));

    let provider = Provider::new(index_coordinator, core_metadata_coordinator, index_base, env);
    (provider, repository)
}

/// Writes one wheel under `dir` and returns the [`test_utils::FixtureFile`] describing it for a
/// synthetic PEP 691 listing. `yanked` entries are served with `yanked: true`.
#[allow(clippy::too_many_arguments)]
pub fn wheel_fixture_file(
    dir: &std::path::Path,
    name: &str,
    version: &str,
    tag: &str,
    requires_python: Option<&str>,
    requires_dist: &[String],
) -> test_utils::FixtureFile {
    let filename = format!("{name}-{version}-{tag}.whl");
    let dist_info_dir = format!("{name}-{version}.dist-info");
    let metadata = test_utils::core_metadata_text(name, version, requires_python, requires_dist, &[]);
    let path = test_utils::write_wheel(dir, &filename, &dist_info_dir, &metadata)
        .expect("writing a fixture wheel to a fresh temp dir cannot fail");
    let bytes = std::fs::read(&path).unwrap();
    test_utils::FixtureFile {
        filename,
        url: format!("file://{}", path.display()),
        sha256: Some(test_utils::sha256_hex(&bytes)),
        dist_info_metadata_available: false,
    }
}

/// Builds the JSON body of a PEP 691 listing for `files`, with `yanked` project-wide flags applied
/// per the filename order given in `yanked_filenames`.
pub fn index_json(files: Vec<test_utils::FixtureFile>, yanked_filenames: &[&str]) -> serde_json::Value {
    let mut value = test_utils::project_info_json(&files);
    if let Some(entries) = value["files"].as_array_mut() {
        for entry in entries.iter_mut() {
            let filename = entry["filename"].as_str().unwrap().to_string();
            if yanked_filenames.contains(&filename.as_str()) {
                entry["yanked"] = serde_json::Value::Bool(true);
            }
        }
    }
    value
}
