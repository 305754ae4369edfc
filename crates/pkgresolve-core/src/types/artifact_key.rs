//! Artifact identities: what an acquisition strategy is asked to produce.

use super::package_name::NormalizedPackageName;
use once_cell::sync::OnceCell;
use pep440_rs::Version;
use pep508_rs::Requirement as MarkerRequirement;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// The hash algorithms a [`WheelKey`] may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Number of hex characters a digest of this algorithm must have.
    pub fn hex_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Sha384 => 96,
            HashAlgorithm::Sha512 => 128,
        }
    }

    /// Lowercase name as used in `--hash=<alg>:<hex>`.
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

/// Key identifying a PEP 691 index-metadata document for one project on one index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexMetadataKey {
    /// PEP 503 normalized project name.
    pub project: NormalizedPackageName,
    /// Base URL of the simple index this was (or will be) fetched from.
    pub index_base: String,
}

/// Key identifying a PEP 658 (or wheel-extracted) core-metadata document for one specific file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoreMetadataKey {
    /// Normalized project name.
    pub name: NormalizedPackageName,
    /// Normalized version string.
    pub version: String,
    /// Best tag this metadata was resolved for.
    pub tag: String,
    /// URL of the wheel file this metadata describes.
    pub file_url: String,
}

/// Errors constructing or mutating a [`WheelKey`].
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum WheelKeyError {
    #[error("hash hex length {actual} does not match {alg:?} (expected {expected})")]
    HashLengthMismatch {
        alg: HashAlgorithm,
        expected: usize,
        actual: usize,
    },
    #[error("field '{0}' was already set on this WheelKey")]
    AlreadySet(&'static str),
}

/// Identity and acquired metadata of one resolved wheel file.
///
/// Equality, ordering and hashing are defined by `(name, version, tag)` only -- everything else
/// is acquired data, not identity. `dependency_ids`, `origin_uri` and `content_hash` are
/// write-once: they are unset when a candidate is constructed and finalized exactly once, either
/// when the artifact is materialized (`origin_uri`/`content_hash`) or after solver pinning
/// (`dependency_ids`).
#[derive(Debug, Clone)]
pub struct WheelKey {
    /// PEP 503 normalized project name.
    pub name: NormalizedPackageName,
    /// Normalized PEP 440 version string (falls back to the raw string if unparseable).
    pub version: String,
    /// Best tag chosen for this key (see best-tag selection).
    pub tag: String,
    /// `Requires-Python` from the file, if known.
    pub requires_python: Option<String>,
    /// All tags the underlying file actually satisfies.
    pub satisfied_tags: BTreeSet<String>,
    /// Where the artifact came from. Write-once.
    origin_uri: OnceCell<String>,
    /// Verified content hash, hex encoded. Write-once.
    content_hash: OnceCell<String>,
    /// Algorithm for `content_hash`.
    pub hash_algorithm: Option<HashAlgorithm>,
    /// Marker this candidate was produced under, if any (dependency expansion carries it).
    pub marker: Option<String>,
    /// Extras requested against this candidate.
    pub extras: BTreeSet<String>,
    /// Identifiers of this wheel's pinned dependencies. Write-once, set after solver pinning.
    dependency_ids: OnceCell<BTreeSet<String>>,
}

impl WheelKey {
    /// Builds a new key. `origin_uri`/`content_hash`/`dependency_ids` start unset.
    pub fn new(name: NormalizedPackageName, version: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name,
            version: version.into(),
            tag: tag.into(),
            requires_python: None,
            satisfied_tags: BTreeSet::new(),
            origin_uri: OnceCell::new(),
            content_hash: OnceCell::new(),
            hash_algorithm: None,
            marker: None,
            extras: BTreeSet::new(),
            dependency_ids: OnceCell::new(),
        }
    }

    /// The `{underscored_name}-{version}-{tag}` identifier used throughout error messages and
    /// the requirements-text output.
    pub fn identifier(&self) -> String {
        format!(
            "{}-{}-{}",
            self.name.as_str().replace('-', "_"),
            self.version,
            self.tag
        )
    }

    /// Current origin URI, if set.
    pub fn origin_uri(&self) -> Option<&str> {
        self.origin_uri.get().map(String::as_str)
    }

    /// Sets `origin_uri` once. Errors if already set.
    pub fn set_origin_uri(&self, uri: impl Into<String>) -> Result<(), WheelKeyError> {
        self.origin_uri
            .set(uri.into())
            .map_err(|_| WheelKeyError::AlreadySet("origin_uri"))
    }

    /// Current content hash hex, if set.
    pub fn content_hash(&self) -> Option<&str> {
        self.content_hash.get().map(String::as_str)
    }

    /// Sets the content hash once, validating hex length against `alg`.
    pub fn set_content_hash(
        &mut self,
        alg: HashAlgorithm,
        hex: impl Into<String>,
    ) -> Result<(), WheelKeyError> {
        let hex = hex.into();
        if hex.len() != alg.hex_len() {
            return Err(WheelKeyError::HashLengthMismatch {
                alg,
                expected: alg.hex_len(),
                actual: hex.len(),
            });
        }
        self.content_hash
            .set(hex)
            .map_err(|_| WheelKeyError::AlreadySet("content_hash"))?;
        self.hash_algorithm = Some(alg);
        Ok(())
    }

    /// Current pinned dependency identifiers, if set.
    pub fn dependency_ids(&self) -> Option<&BTreeSet<String>> {
        self.dependency_ids.get()
    }

    /// Sets `dependency_ids` once, after solver pinning.
    pub fn set_dependency_ids(&self, ids: BTreeSet<String>) -> Result<(), WheelKeyError> {
        self.dependency_ids
            .set(ids)
            .map_err(|_| WheelKeyError::AlreadySet("dependency_ids"))
    }
}

impl PartialEq for WheelKey {
    fn eq(&self, other: &Self) -> bool {
        (&self.name, &self.version, &self.tag) == (&other.name, &other.version, &other.tag)
    }
}
impl Eq for WheelKey {}

impl PartialOrd for WheelKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for WheelKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.name, &self.version, &self.tag).cmp(&(&other.name, &other.version, &other.tag))
    }
}
impl Hash for WheelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.tag.hash(state);
    }
}

/// The parsed value of a `Version` that may not be PEP 440-conformant (e.g. a legacy version).
pub fn pep440_or_raw(raw: &str) -> Option<Version> {
    raw.parse().ok()
}

/// A PEP 508 requirement plus the identifier of the candidate that introduced it, used to
/// translate `Requires-Dist` entries during dependency expansion. Kept here (rather than in
/// `resolve/`) because it travels alongside `WheelKey` in the requirement-information records the
/// solver keeps.
pub type ParsedRequirement = MarkerRequirement;

/// The three kinds of artifact a strategy chain can be asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// A PEP 691 index listing for one project.
    IndexMetadata(IndexMetadataKey),
    /// A PEP 658 (or wheel-extracted) core-metadata document for one file.
    CoreMetadata(CoreMetadataKey),
    /// A materialized wheel file.
    Wheel(Box<WheelKeyIdentity>),
}

/// The identity-bearing projection of [`WheelKey`] used for hashing/equality as an
/// [`ArtifactKey`] variant (the full `WheelKey` carries write-once cells that are not `Hash`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WheelKeyIdentity {
    /// See [`WheelKey::name`].
    pub name: NormalizedPackageName,
    /// See [`WheelKey::version`].
    pub version: String,
    /// See [`WheelKey::tag`].
    pub tag: String,
}

impl From<&WheelKey> for WheelKeyIdentity {
    fn from(k: &WheelKey) -> Self {
        Self {
            name: k.name.clone(),
            version: k.version.clone(),
            tag: k.tag.clone(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKey::IndexMetadata(k) => write!(f, "index-metadata:{}", k.project.as_str()),
            ArtifactKey::CoreMetadata(k) => {
                write!(f, "core-metadata:{}-{}-{}", k.name.as_str(), k.version, k.tag)
            }
            ArtifactKey::Wheel(k) => write!(f, "wheel:{}-{}-{}", k.name.as_str(), k.version, k.tag),
        }
    }
}
