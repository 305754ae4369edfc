// Parsing derived from https://github.com/njsmith/posy/blob/main/src/vocab/core_metadata.rs
// Licensed under MIT or Apache-2.0

use super::package_name::{PackageName, ParsePackageNameError};
use crate::rfc822::RFC822ish;
use once_cell::sync::Lazy;
use pep440_rs::{Pep440Error, Version, VersionSpecifiers};
use pep508_rs::Requirement;
use std::{collections::HashSet, str::FromStr};
use thiserror::Error;

fn parse_rfc822ish(input: &str) -> Result<RFC822ish, WheelCoreMetaDataError> {
    RFC822ish::parse(input).map_err(|e| WheelCoreMetaDataError::FailedToParse(e.to_string()))
}

/// The PEP 658/PEP 566 core metadata of a wheel: everything needed to expand its dependencies
/// without unpacking the wheel itself.
#[derive(Debug, Clone)]
pub struct WheelCoreMetadata {
    /// The name of the package.
    pub name: PackageName,
    /// Version w.r.t to PEP 440.
    pub version: Version,
    /// Version of the metadata format itself.
    pub metadata_version: MetadataVersion,
    /// Requirements for this distribution. Matches the `Requires-Dist` field; entries that fail
    /// to parse as PEP 508 requirements are dropped with a warning rather than failing the whole
    /// document, since real-world index data occasionally has mildly malformed entries.
    pub requires_dist: Vec<Requirement>,
    /// Python requirement, i.e. `Requires-Python`.
    pub requires_python: Option<VersionSpecifiers>,
    /// Extra names this distribution declares (`Provides-Extra`), normalized to lowercase.
    pub extras: HashSet<String>,
}

/// Wrapper around a PEP 440 version, specifically for the metadata version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MetadataVersion(pub Version);

impl MetadataVersion {
    /// True if this is 2.3 or higher, i.e. PEP 643 (`Dynamic` field) applies.
    pub fn implements_pep643(&self) -> bool {
        static VERSION_2_2: Lazy<MetadataVersion> = Lazy::new(|| {
            MetadataVersion(Version::from_str("2.2").expect("cannot parse 2.2 version string"))
        });
        self >= &VERSION_2_2
    }
}

/// Errors parsing a `METADATA`/PEP 658 document.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum WheelCoreMetaDataError {
    #[error("missing key {0} in METADATA")]
    MissingKey(String),

    #[error("duplicate key {0} in METADATA")]
    DuplicateKey(String),

    #[error("invalid Metadata-Version: {0}")]
    InvalidMetadataVersion(String),

    #[error("invalid Version: {0}")]
    InvalidVersion(String),

    #[error("invalid Requires-Python: {0}")]
    InvalidRequiresPython(#[source] Pep440Error),

    #[error("unsupported METADATA version {0}")]
    UnsupportedVersion(Version),

    #[error(transparent)]
    InvalidPackageName(#[from] ParsePackageNameError),

    #[error("{0}")]
    FailedToParse(String),
}

impl TryFrom<&[u8]> for WheelCoreMetadata {
    type Error = WheelCoreMetaDataError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let (name, version, metadata_version, mut parsed) = parse_common(value)?;

        let mut requires_dist = Vec::new();
        for req_str in parsed.take_all("Requires-Dist").into_iter() {
            match req_str.parse() {
                Err(e) => {
                    tracing::warn!("ignoring Requires-Dist: {req_str}, failed to parse: {e}")
                }
                Ok(req) => requires_dist.push(req),
            }
        }

        let requires_python = parsed
            .maybe_take("Requires-Python")
            .map_err(|_| WheelCoreMetaDataError::DuplicateKey(String::from("Requires-Python")))?
            .as_deref()
            .map(VersionSpecifiers::from_str)
            .transpose()
            .map_err(WheelCoreMetaDataError::InvalidRequiresPython)?;

        let extras: HashSet<String> = parsed
            .take_all("Provides-Extra")
            .into_iter()
            .map(|extra| extra.to_ascii_lowercase())
            .collect();

        Ok(WheelCoreMetadata {
            name,
            version,
            metadata_version,
            requires_dist,
            requires_python,
            extras,
        })
    }
}

fn parse_common(
    input: &[u8],
) -> Result<(PackageName, Version, MetadataVersion, RFC822ish), WheelCoreMetaDataError> {
    let input = String::from_utf8_lossy(input);
    let mut parsed = parse_rfc822ish(&input)?;

    static NEXT_MAJOR_METADATA_VERSION: Lazy<Version> =
        Lazy::new(|| Version::from_str("3").unwrap());

    // Per https://packaging.python.org/specifications/core-metadata: a consumer MUST fail if
    // metadata_version has a greater major version than the highest version it supports; minor
    // revisions are accepted silently.
    let metadata_version = parsed
        .take("Metadata-Version")
        .map_err(|_| WheelCoreMetaDataError::MissingKey(String::from("Metadata-Version")))?;
    let metadata_version: Version = metadata_version
        .parse()
        .map_err(WheelCoreMetaDataError::InvalidMetadataVersion)?;
    if metadata_version >= *NEXT_MAJOR_METADATA_VERSION {
        return Err(WheelCoreMetaDataError::UnsupportedVersion(metadata_version));
    }

    let version_str = parsed
        .take("Version")
        .map_err(|_| WheelCoreMetaDataError::MissingKey(String::from("Version")))?;

    Ok((
        parsed
            .take("Name")
            .map_err(|_| WheelCoreMetaDataError::MissingKey(String::from("Name")))?
            .parse()?,
        version_str
            .parse()
            .map_err(WheelCoreMetaDataError::InvalidVersion)?,
        MetadataVersion(metadata_version),
        parsed,
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    const SIMPLE: &str = "Metadata-Version: 2.1\nName: foo\nVersion: 1.0\nRequires-Dist: bar (>=1.0)\nRequires-Python: >=3.8\nProvides-Extra: fast\n";

    #[test]
    fn parses_simple_metadata() {
        let meta = WheelCoreMetadata::try_from(SIMPLE.as_bytes()).unwrap();
        assert_eq!(meta.name.as_str(), "foo");
        assert_eq!(meta.requires_dist.len(), 1);
        assert!(meta.extras.contains("fast"));
        assert!(!meta.metadata_version.implements_pep643());
    }

    #[test]
    fn rejects_next_major_version() {
        let input = "Metadata-Version: 3.0\nName: foo\nVersion: 1.0\n";
        let err = WheelCoreMetadata::try_from(input.as_bytes()).unwrap_err();
        assert!(matches!(err, WheelCoreMetaDataError::UnsupportedVersion(_)));
    }
}
