//! A pure-Rust, stricter replacement for ad-hoc consumption of rendered requirements text: the
//! same pinned set, expressed as a validated graph of identifiers.

use crate::types::WheelKey;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// One pinned wheel's place in a [`ResolvedGraph`]: its key plus the identifiers of the other
/// nodes it depends on.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    /// The pinned wheel this node represents.
    pub key: WheelKey,
    /// Identifiers of this node's direct dependencies, all of which must be present in the same
    /// graph's `nodes` map.
    pub dependency_ids: BTreeSet<String>,
}

/// The full pinned dependency graph produced by one environment's resolution: which identifiers
/// are roots, and every pinned node keyed by [`WheelKey::identifier`].
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    /// Root identifiers requested directly (after marker filtering), not transitively.
    pub roots: BTreeSet<String>,
    /// Every pinned node, keyed by its identifier.
    pub nodes: BTreeMap<String, ResolvedNode>,
}

/// A [`ResolvedGraph`] failed its own consistency check. This always indicates a bug in the
/// resolution engine that built it, not a problem with the caller's input.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum GraphError {
    #[error("root '{0}' has no corresponding node in the graph")]
    DanglingRoot(String),
    #[error("node '{parent}' depends on '{dependency}', which has no corresponding node in the graph")]
    DanglingDependency { parent: String, dependency: String },
}

impl ResolvedGraph {
    /// Builds a graph, validating that every root and every dependency edge resolves to a node
    /// actually present in `nodes`.
    pub fn new(roots: BTreeSet<String>, nodes: BTreeMap<String, ResolvedNode>) -> Result<Self, GraphError> {
        for root in &roots {
            if !nodes.contains_key(root) {
                return Err(GraphError::DanglingRoot(root.clone()));
            }
        }
        for (parent, node) in &nodes {
            for dependency in &node.dependency_ids {
                if !nodes.contains_key(dependency) {
                    return Err(GraphError::DanglingDependency {
                        parent: parent.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
        Ok(Self { roots, nodes })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::NormalizedPackageName;

    fn key(name: &str, version: &str) -> WheelKey {
        WheelKey::new(name.parse::<NormalizedPackageName>().unwrap(), version, "py3-none-any")
    }

    #[test]
    fn accepts_a_consistent_graph() {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "a-1_0-py3_none_any".to_string(),
            ResolvedNode {
                key: key("a", "1.0"),
                dependency_ids: BTreeSet::from(["b-2_0-py3_none_any".to_string()]),
            },
        );
        nodes.insert(
            "b-2_0-py3_none_any".to_string(),
            ResolvedNode {
                key: key("b", "2.0"),
                dependency_ids: BTreeSet::new(),
            },
        );
        let roots = BTreeSet::from(["a-1_0-py3_none_any".to_string()]);
        assert!(ResolvedGraph::new(roots, nodes).is_ok());
    }

    #[test]
    fn rejects_dangling_root() {
        let nodes = BTreeMap::new();
        let roots = BTreeSet::from(["missing".to_string()]);
        let err = ResolvedGraph::new(roots, nodes).unwrap_err();
        assert!(matches!(err, GraphError::DanglingRoot(_)));
    }

    #[test]
    fn rejects_dangling_dependency() {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "a-1_0-py3_none_any".to_string(),
            ResolvedNode {
                key: key("a", "1.0"),
                dependency_ids: BTreeSet::from(["missing".to_string()]),
            },
        );
        let err = ResolvedGraph::new(BTreeSet::new(), nodes).unwrap_err();
        assert!(matches!(err, GraphError::DanglingDependency { .. }));
    }
}
