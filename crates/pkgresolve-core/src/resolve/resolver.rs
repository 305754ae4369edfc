//! A hand-rolled, chronological backtracking solver in the resolvelib mould: one requirement
//! pool per package name, a preference function choosing which name to expand next, and a
//! history stack that lets a dead end unwind to the last branch point.

use super::provider::{Incompatible, Provider};
use crate::error::{ResolutionError, ResolveError};
use crate::graph::{ResolvedGraph, ResolvedNode};
use crate::types::{NormalizedPackageName, WheelKey, WheelSpec};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One active requirement against a package name, tracking which (if any) pinned candidate
/// introduced it.
#[derive(Debug, Clone)]
struct Req {
    requirement: Arc<WheelSpec>,
    parent: Option<Arc<WheelKey>>,
}

/// The solver's working set: every active requirement per name, and the current tentative pin
/// per name.
#[derive(Debug, Clone, Default)]
struct State {
    criteria: BTreeMap<String, Vec<Req>>,
    pins: BTreeMap<String, Arc<WheelKey>>,
}

/// The result of resolving one environment: rendered lockfile text, the direct-download URLs of
/// every pinned wheel, and the same pins expressed as a validated graph.
#[derive(Debug, Clone)]
pub struct ResolvedEnvironment {
    /// Rendered requirements-file text, one block per pinned wheel.
    pub requirements_text: String,
    /// Every pinned wheel's origin URI, in pin order.
    pub resolved_wheel_uris: Vec<String>,
    /// The same pins, expressed as a validated dependency graph.
    pub graph: ResolvedGraph,
}

/// Resolves one environment against `roots`, applying marker filtering to the root set before
/// solving.
pub async fn resolve_environment(
    provider: &Provider,
    roots: &[Arc<WheelSpec>],
) -> Result<ResolvedEnvironment, ResolutionError> {
    let applicable_roots: Vec<Arc<WheelSpec>> = roots
        .iter()
        .filter(|r| provider.root_applies(r))
        .cloned()
        .collect();

    let mut state = State::default();
    for root in &applicable_roots {
        let name = NormalizedPackageName::from(root.name.clone()).as_str().to_string();
        state.criteria.entry(name).or_default().push(Req {
            requirement: root.clone(),
            parent: None,
        });
    }

    let state = solve(provider, state).await?;
    build_environment(&state)
}

/// Runs the chronological backtracking loop to a fixed point, returning the final state once
/// every active requirement is satisfied by its name's pin.
async fn solve(provider: &Provider, mut state: State) -> Result<State, ResolutionError> {
    let mut history: Vec<(State, String, Arc<WheelKey>)> = Vec::new();
    let mut incompatible: Incompatible = BTreeSet::new();
    let mut backtrack_causes: BTreeSet<String> = BTreeSet::new();

    loop {
        let broken = broken_names(provider, &state);
        if broken.is_empty() {
            prune_orphaned_pins(&mut state);
            return Ok(state);
        }

        let name = pick_preferred(&broken, &state, &backtrack_causes);

        if let Some(old_pin) = state.pins.get(&name).cloned() {
            for reqs in state.criteria.values_mut() {
                reqs.retain(|r| !matches_parent(&r.parent, &old_pin));
            }
        }

        let reqs: Vec<Arc<WheelSpec>> = state
            .criteria
            .get(&name)
            .into_iter()
            .flatten()
            .map(|r| r.requirement.clone())
            .collect();

        let identifier: NormalizedPackageName = name.parse().expect("criteria keys are always valid normalized names");
        let candidates = provider.find_matches(&identifier, &reqs, &incompatible).await?;
        let found = candidates
            .into_iter()
            .find(|c| reqs.iter().all(|r| provider.is_satisfied_by(r, c)));

        match found {
            Some(candidate) => {
                history.push((state.clone(), name.clone(), candidate.clone()));

                let extras: BTreeSet<String> = reqs.iter().flat_map(|r| r.extras.iter().cloned()).collect();
                provider.record_extras(&identifier, &extras);
                let dependencies = provider.get_dependencies(&candidate, &extras).await?;

                state.pins.insert(name.clone(), candidate.clone());
                for dep in dependencies {
                    let dep_name = NormalizedPackageName::from(dep.name.clone()).as_str().to_string();
                    state.criteria.entry(dep_name).or_default().push(Req {
                        requirement: Arc::new(dep),
                        parent: Some(candidate.clone()),
                    });
                }
            }
            None => {
                backtrack_causes.insert(name.clone());
                match history.pop() {
                    Some((prev_state, failed_name, failed_candidate)) => {
                        incompatible.insert((
                            failed_name,
                            failed_candidate.version.clone(),
                            failed_candidate.tag.clone(),
                        ));
                        state = prev_state;
                    }
                    None => return Err(ResolveError::Exhausted.into()),
                }
            }
        }
    }
}

/// Names with at least one active requirement that the current pin (if any) fails to satisfy.
/// A name with no pin at all is broken by definition; a name with a pin is re-checked against
/// every requirement now active for it, since a requirement discovered after the pin was made
/// (e.g. a transitive dependency arriving later in the same run) can invalidate it.
fn broken_names(provider: &Provider, state: &State) -> Vec<String> {
    state
        .criteria
        .iter()
        .filter(|(_, reqs)| !reqs.is_empty())
        .filter_map(|(name, reqs)| {
            let satisfied = match state.pins.get(name) {
                Some(pin) => reqs.iter().all(|r| provider.is_satisfied_by(&r.requirement, pin)),
                None => false,
            };
            if satisfied {
                None
            } else {
                Some(name.clone())
            }
        })
        .collect()
}

/// Picks the broken name to expand next: prefer names already implicated in a backtrack, then
/// root requirements, then names with the most distinct constraining parents, then names not yet
/// pinned at all, tiebreaking alphabetically.
fn pick_preferred(broken: &[String], state: &State, backtrack_causes: &BTreeSet<String>) -> String {
    broken
        .iter()
        .min_by_key(|name| {
            let reqs = &state.criteria[*name];
            let is_backtrack_cause = !backtrack_causes.contains(*name);
            let is_root = !reqs.iter().any(|r| r.parent.is_none());
            let distinct_parents: BTreeSet<*const WheelKey> =
                reqs.iter().filter_map(|r| r.parent.as_ref().map(|p| Arc::as_ptr(p))).collect();
            let already_resolved = state.pins.contains_key(*name);
            (
                is_backtrack_cause,
                is_root,
                -(distinct_parents.len() as i64),
                already_resolved,
                (*name).clone(),
            )
        })
        .cloned()
        .expect("broken is checked non-empty by the caller")
}

fn matches_parent(parent: &Option<Arc<WheelKey>>, pin: &Arc<WheelKey>) -> bool {
    match parent {
        Some(p) => Arc::ptr_eq(p, pin),
        None => false,
    }
}

/// Drops pins for names whose criteria list emptied out after a superseded candidate's
/// dependency edges were swept away.
fn prune_orphaned_pins(state: &mut State) {
    let live: BTreeSet<String> = state
        .criteria
        .iter()
        .filter(|(_, reqs)| !reqs.is_empty())
        .map(|(name, _)| name.clone())
        .collect();
    state.pins.retain(|name, _| live.contains(name));
}

/// Builds the final [`ResolvedEnvironment`] from a solved state: dependency edges by pinned
/// identity, rendered text, and the validated graph.
fn build_environment(state: &State) -> Result<ResolvedEnvironment, ResolutionError> {
    let mut dependency_ids_by_ptr: BTreeMap<*const WheelKey, BTreeSet<String>> =
        state.pins.values().map(|pin| (Arc::as_ptr(pin), BTreeSet::new())).collect();

    for reqs in state.criteria.values() {
        for req in reqs {
            let Some(parent) = &req.parent else { continue };
            let ptr = Arc::as_ptr(parent);
            if let Some(ids) = dependency_ids_by_ptr.get_mut(&ptr) {
                let dep_name = NormalizedPackageName::from(req.requirement.name.clone());
                if let Some(dep_pin) = state.pins.get(dep_name.as_str()) {
                    ids.insert(dep_pin.identifier());
                }
            }
        }
    }

    let mut nodes = BTreeMap::new();
    for pin in state.pins.values() {
        let ids = dependency_ids_by_ptr.get(&Arc::as_ptr(pin)).cloned().unwrap_or_default();
        pin.set_dependency_ids(ids.clone())
            .expect("each pin is only finalized once, after solving completes");
        nodes.insert(
            pin.identifier(),
            ResolvedNode {
                key: (**pin).clone(),
                dependency_ids: ids,
            },
        );
    }

    let roots = requested_root_identifiers(state);

    let requirements_text = render_requirements_text(state);
    let resolved_wheel_uris: Vec<String> = state
        .pins
        .values()
        .filter_map(|pin| pin.origin_uri().map(str::to_string))
        .collect();

    let graph = ResolvedGraph::new(roots, nodes).expect("resolver produced an inconsistent graph");

    Ok(ResolvedEnvironment {
        requirements_text,
        resolved_wheel_uris,
        graph,
    })
}

/// Identifiers of the pins whose package name carries a root (parentless) requirement.
fn requested_root_identifiers(state: &State) -> BTreeSet<String> {
    state
        .criteria
        .iter()
        .filter(|(_, reqs)| reqs.iter().any(|r| r.parent.is_none()))
        .filter_map(|(name, _)| state.pins.get(name).map(|pin| pin.identifier()))
        .collect()
}

fn render_requirements_text(state: &State) -> String {
    let blocks: Vec<String> = state.pins.values().map(|pin| render_block(pin)).collect();
    blocks.join("\n")
}

fn render_block(key: &WheelKey) -> String {
    let mut out = String::new();
    out.push_str(&format!("# name: {}\n", key.name.as_str()));
    out.push_str(&format!("# version: {}\n", key.version));
    out.push_str(&format!("# tag: {}\n", key.tag));
    if let Some(rp) = &key.requires_python {
        out.push_str(&format!("# requires_python: {rp}\n"));
    }
    if !key.satisfied_tags.is_empty() {
        let tags: Vec<&str> = key.satisfied_tags.iter().map(String::as_str).collect();
        out.push_str(&format!("# satisfied_tags: {}\n", tags.join(", ")));
    }
    if let Some(ids) = key.dependency_ids() {
        if !ids.is_empty() {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            out.push_str(&format!("# dependencies: {}\n", ids.join(", ")));
        }
    }
    if let Some(origin) = key.origin_uri() {
        out.push_str(&format!("# origin_uri: {origin}\n"));
    }
    if let Some(marker) = &key.marker {
        out.push_str(&format!("# marker: {marker}\n"));
    }
    if !key.extras.is_empty() {
        let extras: Vec<&str> = key.extras.iter().map(String::as_str).collect();
        out.push_str(&format!("# extras: {}\n", extras.join(", ")));
    }

    let name = key.name.as_str().replace('-', "_");
    let origin = key.origin_uri().unwrap_or_default();
    match key.content_hash() {
        Some(hash) => {
            let alg = key.hash_algorithm.map(|a| a.as_str()).unwrap_or("sha256");
            out.push_str(&format!("{name} @ {origin} --hash={alg}:{hash}\n"));
        }
        None => {
            out.push_str(&format!("{name} @ {origin}\n"));
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chain::{CoreMetadataKind, IndexMetadataKind, StrategyChainResolver};
    use crate::coordinator::ArtifactCoordinator;
    use crate::repository::EphemeralArtifactRepository;
    use crate::types::{PackageName, ResolutionEnv, ResolutionPolicy, WheelTag, WheelTags};

    fn key(name: &str, version: &str) -> WheelKey {
        let normalized: NormalizedPackageName = name.parse().unwrap();
        WheelKey::new(normalized, version, "py3-none-any")
    }

    /// A provider with an empty strategy chain -- only good for the parts of its API (like
    /// `is_satisfied_by`) that never reach a coordinator.
    fn test_provider() -> Provider {
        let repository: Arc<dyn crate::repository::ArtifactRepository> =
            Arc::new(EphemeralArtifactRepository::new().unwrap());
        let index_coordinator = Arc::new(ArtifactCoordinator::<IndexMetadataKind>::new(
            repository.clone(),
            StrategyChainResolver::new(vec![]),
        ));
        let core_metadata_coordinator = Arc::new(ArtifactCoordinator::<CoreMetadataKind>::new(
            repository,
            StrategyChainResolver::new(vec![]),
        ));
        let seed = WheelTag {
            interpreter: "py3".to_string(),
            abi: "none".to_string(),
            platform: "any".to_string(),
        };
        let marker_environment = pep508_rs::MarkerEnvironment {
            implementation_name: "cpython".to_string(),
            implementation_version: "3.11.0".parse().unwrap(),
            os_name: "posix".to_string(),
            platform_machine: "x86_64".to_string(),
            platform_python_implementation: "CPython".to_string(),
            platform_release: "".to_string(),
            platform_system: "Linux".to_string(),
            platform_version: "".to_string(),
            python_full_version: "3.11.0".parse().unwrap(),
            python_version: "3.11".parse().unwrap(),
            sys_platform: "linux".to_string(),
        };
        let env = ResolutionEnv::new(
            "test",
            WheelTags::from_ordered(vec![seed]),
            marker_environment,
            ResolutionPolicy::default(),
        );
        Provider::new(index_coordinator, core_metadata_coordinator, "file:///fake-index", env)
    }

    #[test]
    fn renders_minimal_block_without_hash() {
        let mut k = key("demo", "1.0.0");
        k.set_origin_uri("file:///tmp/demo-1.0.0-py3-none-any.whl").unwrap();
        let text = render_block(&k);
        assert!(text.contains("# name: demo"));
        assert!(text.ends_with("demo @ file:///tmp/demo-1.0.0-py3-none-any.whl\n"));
        assert!(!text.contains("--hash="));
    }

    #[test]
    fn renders_block_with_hash() {
        let mut k = key("demo", "1.0.0");
        k.set_origin_uri("file:///tmp/demo-1.0.0-py3-none-any.whl").unwrap();
        k.set_content_hash(
            crate::types::HashAlgorithm::Sha256,
            "a".repeat(64),
        )
        .unwrap();
        let text = render_block(&k);
        assert!(text.ends_with(&format!(
            "demo @ file:///tmp/demo-1.0.0-py3-none-any.whl --hash=sha256:{}\n",
            "a".repeat(64)
        )));
    }

    #[test]
    fn broken_names_reports_unpinned_criteria() {
        let name: PackageName = "demo".parse().unwrap();
        let spec = WheelSpec::new(name, Some("==1.0.0".parse().unwrap()), None, BTreeSet::new(), None).unwrap();
        let mut state = State::default();
        state.criteria.insert(
            "demo".to_string(),
            vec![Req {
                requirement: Arc::new(spec),
                parent: None,
            }],
        );
        let provider = test_provider();
        let broken = broken_names(&provider, &state);
        assert_eq!(broken, vec!["demo".to_string()]);
    }

    #[test]
    fn broken_names_reports_a_pin_invalidated_by_a_later_requirement() {
        let provider = test_provider();
        let mut state = State::default();
        state.pins.insert("shared".to_string(), Arc::new(key("shared", "2.0.0")));

        let name: PackageName = "shared".parse().unwrap();
        let conflicting = WheelSpec::new(name, Some("<2.0.0".parse().unwrap()), None, BTreeSet::new(), None).unwrap();
        state.criteria.insert(
            "shared".to_string(),
            vec![Req {
                requirement: Arc::new(conflicting),
                parent: None,
            }],
        );

        let broken = broken_names(&provider, &state);
        assert_eq!(
            broken,
            vec!["shared".to_string()],
            "a pin that no longer satisfies a requirement discovered after it was made must be re-flagged as broken"
        );
    }

    #[test]
    fn broken_names_does_not_report_a_pin_that_still_satisfies_every_requirement() {
        let provider = test_provider();
        let mut state = State::default();
        state.pins.insert("shared".to_string(), Arc::new(key("shared", "1.5.0")));

        let name: PackageName = "shared".parse().unwrap();
        let satisfied = WheelSpec::new(name, Some(">=1.0.0".parse().unwrap()), None, BTreeSet::new(), None).unwrap();
        state.criteria.insert(
            "shared".to_string(),
            vec![Req {
                requirement: Arc::new(satisfied),
                parent: None,
            }],
        );

        let broken = broken_names(&provider, &state);
        assert!(broken.is_empty());
    }
}
