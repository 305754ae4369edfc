//! End-to-end resolution scenarios. Each test wires a [`pkgresolve_core::Provider`] directly over
//! an in-memory PEP 691 fixture and real file-backed wheels, then drives
//! [`pkgresolve_core::resolve_environment`] exactly as `facade::resolve` would -- this bypasses
//! the facade's hardcoded HTTP strategy chain so these tests never touch the network.

mod support;

use pkgresolve_core::resolve_environment;
use pkgresolve_core::types::{PackageName, ResolutionPolicy, WheelSpec, YankedWheelPolicy};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

fn root(name: &str, version_spec: Option<&str>) -> Arc<WheelSpec> {
    let name: PackageName = name.parse().unwrap();
    let version = version_spec.map(|s| s.parse().unwrap());
    Arc::new(WheelSpec::new(name, version, None, BTreeSet::new(), None).unwrap())
}

fn root_with_extras(name: &str, version_spec: Option<&str>, extras: &[&str]) -> Arc<WheelSpec> {
    let name: PackageName = name.parse().unwrap();
    let version = version_spec.map(|s| s.parse().unwrap());
    let extras: BTreeSet<String> = extras.iter().map(|s| s.to_string()).collect();
    Arc::new(WheelSpec::new(name, version, None, extras, None).unwrap())
}

#[tokio::test]
async fn resolves_a_single_pure_python_requirement_to_its_only_version() {
    let dir = tempfile::tempdir().unwrap();
    let file = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &[]);
    let index = support::index_json(vec![file], &[]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), index);
    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("demo", None)]).await.unwrap();
    repository.close().await;

    assert_eq!(resolved.graph.nodes.len(), 1);
    assert!(resolved.requirements_text.contains("# name: demo"));
    assert!(resolved.requirements_text.contains("# version: 1.0.0"));
    assert_eq!(resolved.resolved_wheel_uris.len(), 1);
}

#[tokio::test]
async fn honors_the_conjunction_of_two_parents_constraining_the_same_name() {
    let dir = tempfile::tempdir().unwrap();
    let a_low = support::wheel_fixture_file(
        dir.path(),
        "shared",
        "1.0.0",
        "py3-none-any",
        None,
        &[],
    );
    let a_mid = support::wheel_fixture_file(
        dir.path(),
        "shared",
        "1.5.0",
        "py3-none-any",
        None,
        &[],
    );
    let a_high = support::wheel_fixture_file(
        dir.path(),
        "shared",
        "2.0.0",
        "py3-none-any",
        None,
        &[],
    );
    let shared_index = support::index_json(vec![a_low, a_mid, a_high], &[]);

    let left_deps = vec!["shared<2.0.0".to_string()];
    let left = support::wheel_fixture_file(dir.path(), "left", "1.0.0", "py3-none-any", None, &left_deps);
    let left_index = support::index_json(vec![left], &[]);

    let right_deps = vec!["shared>=1.5.0".to_string()];
    let right = support::wheel_fixture_file(dir.path(), "right", "1.0.0", "py3-none-any", None, &right_deps);
    let right_index = support::index_json(vec![right], &[]);

    let mut bodies = BTreeMap::new();
    bodies.insert("shared".to_string(), shared_index);
    bodies.insert("left".to_string(), left_index);
    bodies.insert("right".to_string(), right_index);

    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("left", None), root("right", None)])
        .await
        .unwrap();
    repository.close().await;

    let shared_node = resolved
        .graph
        .nodes
        .values()
        .find(|n| n.key.name.as_str() == "shared")
        .expect("shared must be pinned");
    assert_eq!(shared_node.key.version, "1.5.0");
}

#[tokio::test]
async fn prefers_the_best_supported_tag_at_the_same_version() {
    let dir = tempfile::tempdir().unwrap();
    let generic = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &[]);
    let specific = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "cp311-cp311-linux_x86_64", None, &[]);
    let index = support::index_json(vec![generic, specific], &[]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), index);
    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("demo", None)]).await.unwrap();
    repository.close().await;

    let node = resolved.graph.nodes.values().next().unwrap();
    assert_eq!(node.key.tag, "cp311-cp311-linux_x86_64");
}

#[tokio::test]
async fn yanked_release_is_skipped_when_a_non_yanked_release_satisfies() {
    let dir = tempfile::tempdir().unwrap();
    let good = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &[]);
    let bad = support::wheel_fixture_file(dir.path(), "demo", "2.0.0", "py3-none-any", None, &[]);
    let bad_filename = bad.filename.clone();
    let index = support::index_json(vec![good, bad], &[&bad_filename]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), index);
    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("demo", None)]).await.unwrap();
    repository.close().await;

    let node = resolved.graph.nodes.values().next().unwrap();
    assert_eq!(node.key.version, "1.0.0", "yanked 2.0.0 must be skipped under ExcludeUnlessRequired");
}

#[tokio::test]
async fn yanked_release_is_used_when_it_is_the_only_release() {
    let dir = tempfile::tempdir().unwrap();
    let only = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &[]);
    let only_filename = only.filename.clone();
    let index = support::index_json(vec![only], &[&only_filename]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), index);
    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("demo", None)]).await.unwrap();
    repository.close().await;

    assert_eq!(resolved.graph.nodes.len(), 1, "the only release must be used despite being yanked");
}

#[tokio::test]
async fn yanked_release_is_excluded_unconditionally_under_exclude_always() {
    let dir = tempfile::tempdir().unwrap();
    let only = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &[]);
    let only_filename = only.filename.clone();
    let index = support::index_json(vec![only], &[&only_filename]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), index);
    let policy = ResolutionPolicy {
        yanked_wheel_policy: YankedWheelPolicy::ExcludeAlways,
        ..ResolutionPolicy::default()
    };
    let env = support::test_env("default", policy);
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let err = resolve_environment(&provider, &[root("demo", None)]).await.unwrap_err();
    repository.close().await;

    let message = err.to_string();
    assert!(!message.is_empty());
}

#[tokio::test]
async fn direct_uri_requirement_bypasses_the_index_entirely() {
    let dir = tempfile::tempdir().unwrap();
    let file = support::wheel_fixture_file(dir.path(), "demo", "9.9.9", "py3-none-any", None, &[]);

    // Register a bogus index fixture that would fail if it were ever consulted for "demo".
    let mut bodies = BTreeMap::new();
    bodies.insert(
        "demo".to_string(),
        support::index_json(
            vec![support::wheel_fixture_file(dir.path(), "demo", "0.0.1", "py3-none-any", None, &[])],
            &[],
        ),
    );
    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let name: PackageName = "demo".parse().unwrap();
    let uri: url::Url = file.url.parse().unwrap();
    let direct_root = Arc::new(WheelSpec::new(name, None, Some(uri), BTreeSet::new(), None).unwrap());

    let resolved = resolve_environment(&provider, &[direct_root]).await.unwrap();
    repository.close().await;

    let node = resolved.graph.nodes.values().next().unwrap();
    assert_eq!(node.key.version, "9.9.9", "the direct URI's own version must win over the index listing");
}

#[tokio::test]
async fn extras_propagate_into_conditional_dependency_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let demo_deps = vec!["helper; extra == \"speed\"".to_string()];
    let demo = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &demo_deps);
    let demo_index = support::index_json(vec![demo], &[]);

    let helper = support::wheel_fixture_file(dir.path(), "helper", "1.0.0", "py3-none-any", None, &[]);
    let helper_index = support::index_json(vec![helper], &[]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), demo_index);
    bodies.insert("helper".to_string(), helper_index);

    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root_with_extras("demo", None, &["speed"])])
        .await
        .unwrap();
    repository.close().await;

    assert!(
        resolved.graph.nodes.values().any(|n| n.key.name.as_str() == "helper"),
        "helper must be pulled in once the 'speed' extra is requested"
    );
}

#[tokio::test]
async fn extras_not_requested_do_not_pull_in_conditional_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let demo_deps = vec!["helper; extra == \"speed\"".to_string()];
    let demo = support::wheel_fixture_file(dir.path(), "demo", "1.0.0", "py3-none-any", None, &demo_deps);
    let demo_index = support::index_json(vec![demo], &[]);

    let helper = support::wheel_fixture_file(dir.path(), "helper", "1.0.0", "py3-none-any", None, &[]);
    let helper_index = support::index_json(vec![helper], &[]);

    let mut bodies = BTreeMap::new();
    bodies.insert("demo".to_string(), demo_index);
    bodies.insert("helper".to_string(), helper_index);

    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("demo", None)]).await.unwrap();
    repository.close().await;

    assert!(!resolved.graph.nodes.values().any(|n| n.key.name.as_str() == "helper"));
}

#[tokio::test]
async fn a_pin_is_reconsidered_when_a_conflicting_constraint_arrives_via_a_later_dependency() {
    // "a" and "b" are both unconstrained roots, picked before either of their dependencies.
    // "a" depends on unconstrained "x", so "x" gets pinned to its highest version (2.0.0) the
    // first time it's expanded -- before "y" (reached only through "b") is ever looked at.
    // "y" then turns out to depend on "x<1.0", which the existing 2.0.0 pin does not satisfy;
    // "x" must be re-picked and re-pinned to 0.9.0 rather than shipping the stale 2.0.0 pin.
    let dir = tempfile::tempdir().unwrap();

    let x_old = support::wheel_fixture_file(dir.path(), "x", "0.9.0", "py3-none-any", None, &[]);
    let x_new = support::wheel_fixture_file(dir.path(), "x", "2.0.0", "py3-none-any", None, &[]);
    let x_index = support::index_json(vec![x_old, x_new], &[]);

    let a_deps = vec!["x".to_string()];
    let a = support::wheel_fixture_file(dir.path(), "a", "1.0.0", "py3-none-any", None, &a_deps);
    let a_index = support::index_json(vec![a], &[]);

    let y_deps = vec!["x<1.0".to_string()];
    let y = support::wheel_fixture_file(dir.path(), "y", "1.0.0", "py3-none-any", None, &y_deps);
    let y_index = support::index_json(vec![y], &[]);

    let b_deps = vec!["y".to_string()];
    let b = support::wheel_fixture_file(dir.path(), "b", "1.0.0", "py3-none-any", None, &b_deps);
    let b_index = support::index_json(vec![b], &[]);

    let mut bodies = BTreeMap::new();
    bodies.insert("x".to_string(), x_index);
    bodies.insert("a".to_string(), a_index);
    bodies.insert("y".to_string(), y_index);
    bodies.insert("b".to_string(), b_index);

    let env = support::test_env("default", ResolutionPolicy::default());
    let (provider, repository) = support::provider_over_fixture(bodies, "file:///fake-index", env);

    let resolved = resolve_environment(&provider, &[root("a", None), root("b", None)])
        .await
        .unwrap();
    repository.close().await;

    let x_node = resolved
        .graph
        .nodes
        .values()
        .find(|n| n.key.name.as_str() == "x")
        .expect("x must be pinned");
    assert_eq!(
        x_node.key.version, "0.9.0",
        "the 2.0.0 pin made before y's constraint arrived must be replaced, not shipped stale"
    );
}
