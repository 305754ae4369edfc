//! Compatibility tags (PEP 425): the `{py}-{abi}-{plat}` triple encoded in a wheel filename,
//! and the environment-side machinery for ranking wheels by how well their tags fit a target
//! interpreter.

use indexmap::IndexSet;
use itertools::Itertools;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A single `{interpreter}-{abi}-{platform}` tag triple, e.g. `cp311-cp311-manylinux_2_17_x86_64`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, SerializeDisplay, DeserializeFromStr)]
pub struct WheelTag {
    /// Language implementation and version, e.g. `py3`, `cp311`.
    pub interpreter: String,
    /// ABI tag, e.g. `abi3`, `none`.
    pub abi: String,
    /// Platform tag, e.g. `any`, `manylinux_2_17_x86_64`.
    pub platform: String,
}

impl FromStr for WheelTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((interpreter, abi, platform)) =
            s.split('-').map(ToOwned::to_owned).collect_tuple()
        else {
            return Err(String::from("not enough '-' separators"));
        };
        Ok(Self {
            interpreter,
            abi,
            platform,
        })
    }
}

impl Display for WheelTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", &self.interpreter, &self.abi, &self.platform)
    }
}

/// An ordered set of tags a target environment accepts, most preferred first.
///
/// Used both to rank candidates at the same version (§4.5.3/§4.5.4 of the resolution design)
/// and to pick the single "best tag" for a given wheel's tag set.
#[derive(Debug, Clone)]
pub struct WheelTags {
    ordered: IndexSet<WheelTag>,
}

impl WheelTags {
    /// Builds an explicit, caller-supplied preference order.
    pub fn from_ordered(tags: impl IntoIterator<Item = WheelTag>) -> Self {
        Self {
            ordered: tags.into_iter().collect(),
        }
    }

    /// Expands a `(python_version, context_tag)` seed into the compatibility universe described
    /// in the resolution design's best-tag-selection section: `py{MAJ}-none-any`,
    /// `py{MAJ}{MIN}-none-any`, `py{MAJ}-none-{plat}`, `py{MAJ}{MIN}-none-{plat}`, the seed tag
    /// itself, and -- when the seed interpreter looks like `cp{digits}` -- `{cp}-abi3-{plat}` and
    /// `{cp}-none-{plat}`. Order is most-specific first.
    pub fn from_env(major: u32, minor: u32, context: &WheelTag) -> Self {
        let plat = context.platform.clone();
        let cp = &context.interpreter;
        let mut ordered = IndexSet::new();

        if cp.starts_with("cp") && cp[2..].chars().all(|c| c.is_ascii_digit()) && !cp[2..].is_empty()
        {
            ordered.insert(WheelTag {
                interpreter: cp.clone(),
                abi: context.abi.clone(),
                platform: plat.clone(),
            });
            ordered.insert(WheelTag {
                interpreter: cp.clone(),
                abi: "abi3".to_string(),
                platform: plat.clone(),
            });
            ordered.insert(WheelTag {
                interpreter: cp.clone(),
                abi: "none".to_string(),
                platform: plat.clone(),
            });
        } else {
            ordered.insert(context.clone());
        }

        ordered.insert(WheelTag {
            interpreter: format!("py{major}{minor}"),
            abi: "none".to_string(),
            platform: plat.clone(),
        });
        ordered.insert(WheelTag {
            interpreter: format!("py{major}"),
            abi: "none".to_string(),
            platform: plat.clone(),
        });
        ordered.insert(WheelTag {
            interpreter: format!("py{major}{minor}"),
            abi: "none".to_string(),
            platform: "any".to_string(),
        });
        ordered.insert(WheelTag {
            interpreter: format!("py{major}"),
            abi: "none".to_string(),
            platform: "any".to_string(),
        });

        Self { ordered }
    }

    /// Iterates tags most-preferred first.
    pub fn iter(&self) -> impl Iterator<Item = &WheelTag> {
        self.ordered.iter()
    }

    /// Returns the best (lowest index / most preferred) tag from `candidate_tags` that appears in
    /// this preference order, or `None` if none of them are supported.
    pub fn best_of<'a>(
        &self,
        candidate_tags: impl IntoIterator<Item = &'a WheelTag>,
    ) -> Option<&WheelTag> {
        let candidates: Vec<&WheelTag> = candidate_tags.into_iter().collect();
        self.ordered
            .iter()
            .find(|preferred| candidates.contains(preferred))
    }

    /// True if `tag` is supported at all.
    pub fn is_compatible(&self, tag: &WheelTag) -> bool {
        self.ordered.contains(tag)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_triple() {
        let tag = WheelTag::from_str("py3-none-any").unwrap();
        assert_eq!(tag.interpreter, "py3");
        assert_eq!(tag.abi, "none");
        assert_eq!(tag.platform, "any");
    }

    #[test]
    fn expands_cpython_universe() {
        let seed = WheelTag {
            interpreter: "cp311".into(),
            abi: "cp311".into(),
            platform: "linux_x86_64".into(),
        };
        let tags = WheelTags::from_env(3, 11, &seed);
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert!(rendered.contains(&"cp311-cp311-linux_x86_64".to_string()));
        assert!(rendered.contains(&"cp311-abi3-linux_x86_64".to_string()));
        assert!(rendered.contains(&"cp311-none-linux_x86_64".to_string()));
        assert!(rendered.contains(&"py311-none-linux_x86_64".to_string()));
        assert!(rendered.contains(&"py3-none-linux_x86_64".to_string()));
        assert!(rendered.contains(&"py311-none-any".to_string()));
        assert!(rendered.contains(&"py3-none-any".to_string()));
    }

    #[test]
    fn best_of_prefers_earlier_entries() {
        let tags = WheelTags::from_ordered([
            WheelTag::from_str("cp311-cp311-linux_x86_64").unwrap(),
            WheelTag::from_str("py3-none-any").unwrap(),
        ]);
        let file_tags = vec![
            WheelTag::from_str("py3-none-any").unwrap(),
            WheelTag::from_str("cp311-cp311-linux_x86_64").unwrap(),
        ];
        let best = tags.best_of(file_tags.iter()).unwrap();
        assert_eq!(best.to_string(), "cp311-cp311-linux_x86_64");
    }
}
