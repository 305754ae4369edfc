//! Parsing of wheel filenames, per the file name convention of
//! <https://www.python.org/dev/peps/pep-0427/#file-name-convention>.

use super::package_name::{NormalizedPackageName, PackageName, ParsePackageNameError};
use super::tags::WheelTag;
use itertools::Itertools;
use pep440_rs::Version;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The parsed components of a wheel filename:
/// `{distribution}-{version}[-{build}]-{py_tags}-{abi_tags}-{arch_tags}.whl`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WheelFilename {
    /// Distribution name, e.g. 'django'.
    pub distribution: PackageName,
    /// Distribution version.
    pub version: Version,
    /// Optional build tag, used only as a final tie-breaker.
    pub build_tag: Option<BuildTag>,
    /// Language implementation/version tags, e.g. `["py3"]`.
    pub py_tags: Vec<String>,
    /// ABI tags, e.g. `["none"]`.
    pub abi_tags: Vec<String>,
    /// Platform/architecture tags, e.g. `["any"]`.
    pub arch_tags: Vec<String>,
}

impl WheelFilename {
    /// All `(py, abi, arch)` tag triples encoded by this filename's compressed tag sets.
    pub fn all_tags_iter(&self) -> impl Iterator<Item = WheelTag> + '_ {
        self.py_tags
            .iter()
            .cartesian_product(self.abi_tags.iter())
            .cartesian_product(self.arch_tags.iter())
            .map(|((py, abi), arch)| WheelTag {
                interpreter: py.clone(),
                abi: abi.clone(),
                platform: arch.clone(),
            })
    }

    /// Parses a wheel filename, e.g. `"trio-0.18.0-py3-none-any.whl"`. `normalized_package_name`
    /// is used to locate the `distribution-version` split point, since distribution names may
    /// themselves contain `-`.
    pub fn from_filename(
        s: &str,
        normalized_package_name: &NormalizedPackageName,
    ) -> Result<Self, ParseWheelFilenameError> {
        let Some(file_stem) = s.strip_suffix(".whl") else {
            return Err(ParseWheelFilenameError::InvalidExtension(s.to_string()));
        };

        let Some((distribution, rest)) = split_into_filename_rest(file_stem, normalized_package_name)
        else {
            return Err(ParseWheelFilenameError::PackageNameNotFound(
                normalized_package_name.clone(),
                s.to_string(),
            ));
        };
        let distribution = PackageName::from_str(distribution)
            .map_err(ParseWheelFilenameError::InvalidPackageName)?;

        let Some((version, rest)) = rest.split_once('-') else {
            return Err(ParseWheelFilenameError::InvalidName);
        };
        let version =
            Version::from_str(version).map_err(|_| ParseWheelFilenameError::InvalidVersion(version.to_string()))?;

        let Some((rest, platform_tags)) = rest.rsplit_once('-') else {
            return Err(ParseWheelFilenameError::InvalidName);
        };
        let arch_tags = platform_tags.split('.').map(ToOwned::to_owned).collect();

        let Some((rest, abi_tag)) = rest.rsplit_once('-') else {
            return Err(ParseWheelFilenameError::InvalidName);
        };
        let abi_tags = abi_tag.split('.').map(ToOwned::to_owned).collect();

        let (build_tag, python_tag) = match rest.rsplit_once('-') {
            Some((build_tag, python_tag)) => (Some(build_tag), python_tag),
            None => (None, rest),
        };
        let py_tags = python_tag.split('.').map(ToOwned::to_owned).collect();
        let build_tag = build_tag
            .map(BuildTag::from_str)
            .map_or_else(|| Ok(None), |result| result.map(Some))?;

        Ok(Self {
            distribution,
            version,
            build_tag,
            py_tags,
            abi_tags,
            arch_tags,
        })
    }
}

impl Display for WheelFilename {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{dist}-{ver}{build}-{py_tags}-{abi_tags}-{arch_tags}.whl",
            dist = self.distribution.as_source_str(),
            ver = self.version,
            build = self
                .build_tag
                .as_ref()
                .map_or_else(|| String::from(""), |tag| format!("-{tag}")),
            py_tags = self.py_tags.join("."),
            abi_tags = self.abi_tags.join("."),
            arch_tags = self.arch_tags.join("."),
        )
    }
}

/// A build number tie-breaker. Sorts by its leading digits as an integer, then the remainder
/// lexicographically.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, SerializeDisplay, DeserializeFromStr)]
pub struct BuildTag {
    number: u32,
    name: String,
}

impl Display for BuildTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.number, &self.name)
    }
}

impl FromStr for BuildTag {
    type Err = ParseWheelFilenameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let first_alpha_idx = s.find(|c: char| c.is_ascii_alphabetic()).unwrap_or(s.len());
        let (digits, name) = s.split_at(first_alpha_idx);
        Ok(Self {
            number: digits
                .parse()
                .map_err(|_| ParseWheelFilenameError::BuildTagMustStartWithDigit(s.to_owned()))?,
            name: name.to_owned(),
        })
    }
}

/// Locates the `-` that separates the distribution name from the rest of a wheel/sdist filename,
/// by testing each candidate prefix against the already-known normalized package name.
fn split_into_filename_rest<'a>(
    s: &'a str,
    normalized_package_name: &NormalizedPackageName,
) -> Option<(&'a str, &'a str)> {
    for (idx, char) in s.char_indices() {
        if char == '-' {
            let (name, rest) = (&s[..idx], &s[idx + 1..]);
            if let Ok(parsed) = name.parse::<NormalizedPackageName>() {
                if parsed == *normalized_package_name {
                    return Some((name, rest));
                }
            }
        }
    }
    None
}

/// Errors produced while parsing a wheel filename.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum ParseWheelFilenameError {
    #[error("invalid wheel filename")]
    InvalidName,
    #[error("package name '{0}' not found in filename: '{1}'")]
    PackageNameNotFound(NormalizedPackageName, String),
    #[error("invalid wheel extension (filename='{0}')")]
    InvalidExtension(String),
    #[error(transparent)]
    InvalidPackageName(#[from] ParsePackageNameError),
    #[error("invalid version: '{0}'")]
    InvalidVersion(String),
    #[error("build tag '{0}' must start with a digit")]
    BuildTagMustStartWithDigit(String),
}
