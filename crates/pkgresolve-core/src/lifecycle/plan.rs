//! The planned-but-not-yet-instantiated form of a strategy: everything the lifecycle knows about
//! one configured instance before construction happens.

use crate::strategy::{ArtifactKeyKind, Criticality};
use serde_json::Value;
use std::collections::BTreeSet;

/// The sentinel key a JSON ctor-args tree uses to embed a deferred reference to another planned
/// strategy instance, e.g. `{"wheel_strategy": {"$strategy_ref": "http-wheel"}}`. This is the
/// Rust encoding of the deferred-binding `StrategyRef` value: JSON has no native "reference" type,
/// so a tagged object stands in for it (see DESIGN.md).
pub const STRATEGY_REF_KEY: &str = "$strategy_ref";

/// A fully planned, not-yet-constructed strategy instance.
#[derive(Debug, Clone)]
pub struct StrategyPlan {
    /// Unique id of this instance within its artifact kind.
    pub instance_id: String,
    /// Name of the registered strategy class this plan instantiates.
    pub strategy_name: String,
    /// Which kind of artifact this strategy produces.
    pub kind: ArtifactKeyKind,
    /// Dispatch order within the chain; lower runs first.
    pub precedence: u32,
    /// Effective criticality after cfg/class-attr merge.
    pub criticality: Criticality,
    /// Other instance ids this plan's constructor arguments reference via `StrategyRef`.
    pub depends_on: BTreeSet<String>,
    /// Constructor arguments, with planner-reserved keys already stripped.
    pub ctor_args: Value,
}

/// Recursively scans a ctor-args tree for `StrategyRef` sentinels, returning every instance id
/// referenced. Each value in an object or array is scanned independently -- a map with several
/// keys holding distinct refs surfaces all of them. This deliberately does not reproduce a bug in
/// the original implementation, which only followed one branch of such a tree (see DESIGN.md).
pub fn scan_strategy_refs(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(iid)) = map.get(STRATEGY_REF_KEY) {
                out.insert(iid.clone());
                return;
            }
            for v in map.values() {
                scan_strategy_refs(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                scan_strategy_refs(v, out);
            }
        }
        _ => {}
    }
}

/// If `value` at `field` is a `StrategyRef` sentinel, returns the instance id it names. Used by
/// factories at instantiation time to pull a named constructor argument's dependency out of the
/// already-constructed-instances map the instantiator hands them.
pub fn extract_strategy_ref<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field)?.get(STRATEGY_REF_KEY)?.as_str()
}

/// Suffix recognized on a top-level ctor-arg key as naming another strategy instance by id
/// rather than by an explicit `StrategyRef` sentinel, e.g. `"wheel_strategy_id": "wheel_http"`.
/// For every such key this inserts a sibling `StrategyRef` sentinel under the key with the
/// suffix dropped (`"wheel_strategy": {"$strategy_ref": "wheel_http"}`) and returns the
/// referenced id, so factories can use either the plain id or the sentinel form and the
/// dependency still participates in topological ordering.
const STRATEGY_ID_SUFFIX: &str = "_strategy_id";

/// Applies the `*_strategy_id` convention in place, returning every instance id it found.
pub fn apply_strategy_id_convention(ctor_args: &mut Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let Value::Object(map) = ctor_args else {
        return found;
    };
    let referencing: Vec<(String, String)> = map
        .iter()
        .filter_map(|(k, v)| {
            let base = k.strip_suffix(STRATEGY_ID_SUFFIX)?;
            let id = v.as_str()?;
            Some((base.to_string(), id.to_string()))
        })
        .collect();
    for (base, id) in referencing {
        let sentinel_key = format!("{base}_strategy");
        map.entry(sentinel_key)
            .or_insert_with(|| Value::Object(serde_json::Map::from_iter([(
                STRATEGY_REF_KEY.to_string(),
                Value::String(id.clone()),
            )])));
        found.insert(id);
    }
    found
}

/// Planner-reserved ctor-arg keys, stripped before a plan's `ctor_args` is stored.
pub const RESERVED_KEYS: &[&str] = &["strategy_name", "instance_id", "precedence", "criticality"];

/// Strips [`RESERVED_KEYS`] from a raw config object, returning the remainder as ctor args.
pub fn strip_reserved_keys(raw_cfg: &Value) -> Value {
    match raw_cfg {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                if !RESERVED_KEYS.contains(&k.as_str()) {
                    out.insert(k.clone(), v.clone());
                }
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn scan_finds_refs_in_every_branch() {
        let value = json!({
            "a": {"$strategy_ref": "one"},
            "b": {"$strategy_ref": "two"},
            "c": [{"$strategy_ref": "three"}, "literal"],
        });
        let mut out = BTreeSet::new();
        scan_strategy_refs(&value, &mut out);
        assert_eq!(
            out,
            BTreeSet::from(["one".to_string(), "two".to_string(), "three".to_string()])
        );
    }

    #[test]
    fn strategy_id_convention_synthesizes_ref_and_reports_id() {
        let mut ctor_args = json!({"wheel_strategy_id": "wheel_http", "wheel_timeout_s": 60.0});
        let ids = apply_strategy_id_convention(&mut ctor_args);
        assert_eq!(ids, BTreeSet::from(["wheel_http".to_string()]));
        assert_eq!(
            extract_strategy_ref(&ctor_args, "wheel_strategy"),
            Some("wheel_http")
        );
    }

    #[test]
    fn strip_reserved_keys_removes_planner_fields() {
        let raw = json!({"strategy_name": "x", "instance_id": "y", "timeout": 5});
        let stripped = strip_reserved_keys(&raw);
        assert_eq!(stripped, json!({"timeout": 5}));
    }
}
