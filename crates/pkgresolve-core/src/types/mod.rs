//! Core data model: package/artifact identity, compatibility tags, and the resolution target.
//! We have tried to follow the relevant PEPs and the PyPA packaging guide as closely as possible.

mod artifact_key;
mod artifact_record;
mod core_metadata;
mod package_name;
mod project_info;
mod resolution_env;
mod tags;
mod wheel_filename;
mod wheel_spec;

pub use artifact_key::{
    pep440_or_raw, ArtifactKey, CoreMetadataKey, HashAlgorithm, IndexMetadataKey, ParsedRequirement,
    WheelKey, WheelKeyError, WheelKeyIdentity,
};

pub use artifact_record::{ArtifactRecord, ArtifactSource};

pub use core_metadata::{MetadataVersion, WheelCoreMetaDataError, WheelCoreMetadata};

pub use package_name::{NormalizedPackageName, PackageName, ParsePackageNameError};

pub use project_info::{ArtifactHashes, ArtifactInfo, DistInfoMetadata, Meta, ProjectInfo, Yanked};

pub use resolution_env::{
    InvalidRequiresDistPolicy, PrereleasePolicy, RequiresDistUrlPolicy, ResolutionEnv,
    ResolutionPolicy, YankedWheelPolicy,
};

pub use tags::{WheelTag, WheelTags};

pub use wheel_filename::{BuildTag, ParseWheelFilenameError, WheelFilename};

pub use wheel_spec::{WheelSpec, WheelSpecError};

pub use pep440_rs::{Version, VersionSpecifier, VersionSpecifiers};
pub use pep508_rs::{MarkerEnvironment, Requirement};
