//! Structs that represent the response from the Simple API when using JSON, per PEP 691.

use pep440_rs::VersionSpecifiers;
use rattler_digest::{serde::SerializableHash, Sha256};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr, VecSkipError};

/// The parsed body of a PEP 691 `application/vnd.pypi.simple.v1+json` index response.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Metadata describing the API itself.
    pub meta: Meta,

    /// All the available files for this project. Entries that fail to deserialize (e.g. an
    /// unrecognized `filename`) are skipped rather than failing the whole document.
    #[serde_as(as = "VecSkipError<_>")]
    pub files: Vec<ArtifactInfo>,
}

/// Describes a single artifact that is available for download. Only wheel filenames are
/// meaningful here; sdists and other non-wheel entries are filtered out by candidate generation.
#[serde_as]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ArtifactInfo {
    /// Raw filename as served by the index, e.g. `"trio-0.18.0-py3-none-any.whl"`.
    pub filename: String,
    /// URL to download the artifact.
    pub url: url::Url,
    /// Hashes of the artifact.
    pub hashes: Option<ArtifactHashes>,
    /// Per-file `Requires-Python`, when the index supplies it.
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub requires_python: Option<VersionSpecifiers>,
    /// Whether core metadata is available as a sidecar download, per PEP 658.
    #[serde(default)]
    pub dist_info_metadata: DistInfoMetadata,
    /// Yanked status, per PEP 592.
    #[serde(default)]
    pub yanked: Yanked,
}

/// A set of hashes for a certain artifact. In theory every hash algorithm available via Python's
/// `hashlib` is legal here; only sha256 is modeled since it's the only one this crate verifies.
#[serde_as]
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ArtifactHashes {
    /// The sha256 hash of the artifact, if the index published one.
    #[serde_as(as = "Option<SerializableHash<Sha256>>")]
    pub sha256: Option<rattler_digest::Sha256Hash>,
}

impl ArtifactHashes {
    /// True if this instance carries no hash at all.
    pub fn is_empty(&self) -> bool {
        self.sha256.is_none()
    }
}

/// Whether metadata is available for download from the index as specified in PEP 658
/// (`{file_url}.metadata`). An index may also publish hashes of the metadata file itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(from = "Option<RawDistInfoMetadata>")]
pub struct DistInfoMetadata {
    /// True if the metadata sidecar is available.
    pub available: bool,
    /// Hashes to verify the metadata file, if published.
    pub hashes: ArtifactHashes,
}

/// Per PEP 658: this key, when present, MUST be either a boolean indicating the file has an
/// associated metadata file, or a mapping of hash names to hex-encoded digests of that metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawDistInfoMetadata {
    NoHashes(bool),
    WithHashes(ArtifactHashes),
}

impl From<Option<RawDistInfoMetadata>> for DistInfoMetadata {
    fn from(maybe_raw: Option<RawDistInfoMetadata>) -> Self {
        match maybe_raw {
            None => Default::default(),
            Some(raw) => match raw {
                RawDistInfoMetadata::NoHashes(available) => Self {
                    available,
                    hashes: Default::default(),
                },
                RawDistInfoMetadata::WithHashes(hashes) => Self {
                    available: true,
                    hashes,
                },
            },
        }
    }
}

/// API-version metadata carried by every [`ProjectInfo`] response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meta {
    /// Version of the simple-repository API.
    #[serde(rename = "api-version")]
    pub version: String,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            version: "1.0".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawYanked {
    NoReason(bool),
    WithReason(String),
}

/// Whether a package version has been yanked, per PEP 592.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(from = "RawYanked")]
pub struct Yanked {
    /// True if the package is yanked.
    pub yanked: bool,
    /// Optional reason given for the yank.
    pub reason: Option<String>,
}

impl From<RawYanked> for Yanked {
    fn from(raw: RawYanked) -> Self {
        match raw {
            RawYanked::NoReason(yanked) => Self {
                yanked,
                reason: None,
            },
            RawYanked::WithReason(reason) => Self {
                yanked: true,
                reason: Some(reason),
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn yanked_boolean_form() {
        let y: Yanked = serde_json::from_str("true").unwrap();
        assert!(y.yanked);
        assert!(y.reason.is_none());
    }

    #[test]
    fn yanked_reason_form() {
        let y: Yanked = serde_json::from_str("\"bad release\"").unwrap();
        assert!(y.yanked);
        assert_eq!(y.reason.as_deref(), Some("bad release"));
    }

    #[test]
    fn dist_info_metadata_hashes_imply_available() {
        let d: DistInfoMetadata =
            serde_json::from_str(r#"{"sha256": "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"}"#).unwrap();
        assert!(d.available);
    }
}
