//! Synthetic fixture construction for resolution-engine tests: wheels with a real
//! `*.dist-info/METADATA` member, and PEP 691 index-listing JSON documents. Everything here
//! builds bytes in a temp directory rather than reaching out to a network, so tests are fast and
//! hermetic.

use data_encoding::HEXLOWER;
use rattler_digest::{compute_bytes_digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors building a fixture.
#[derive(Debug, Error)]
pub enum Error {
    /// Wrapping an I/O failure writing the fixture to disk.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Wrapping a zip-writer failure.
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

/// One `Requires-Dist` line, already formatted per the core-metadata text format (e.g.
/// `"requests >=2.0; extra == \"http\""`).
pub type RequiresDistLine = String;

/// Builds the RFC822-ish text of a wheel's `*.dist-info/METADATA` file.
pub fn core_metadata_text(
    name: &str,
    version: &str,
    requires_python: Option<&str>,
    requires_dist: &[RequiresDistLine],
    provides_extra: &[&str],
) -> String {
    let mut out = String::new();
    out.push_str("Metadata-Version: 2.1\n");
    out.push_str(&format!("Name: {name}\n"));
    out.push_str(&format!("Version: {version}\n"));
    if let Some(rp) = requires_python {
        out.push_str(&format!("Requires-Python: {rp}\n"));
    }
    for extra in provides_extra {
        out.push_str(&format!("Provides-Extra: {extra}\n"));
    }
    for req in requires_dist {
        out.push_str(&format!("Requires-Dist: {req}\n"));
    }
    out
}

/// Writes a minimal, valid wheel zip containing exactly one `{name}-{version}.dist-info/METADATA`
/// member, at `dir/{filename}`. Returns the written path.
pub fn write_wheel(dir: &Path, filename: &str, dist_info_dir: &str, metadata_text: &str) -> Result<PathBuf, Error> {
    let path = dir.join(filename);
    let file = std::fs::File::create(&path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file(format!("{dist_info_dir}/METADATA"), options)?;
    zip.write_all(metadata_text.as_bytes())?;
    zip.finish()?;
    Ok(path)
}

/// Sha256 hex digest of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = compute_bytes_digest::<Sha256>(bytes);
    HEXLOWER.encode(digest.as_ref())
}

/// One entry in a synthetic PEP 691 project listing.
pub struct FixtureFile {
    /// Wheel filename, e.g. `"demo-1.0.0-py3-none-any.whl"`.
    pub filename: String,
    /// Download URL (may be a `file://` path pointing at a fixture written by [`write_wheel`]).
    pub url: String,
    /// Sha256 hex digest, if the listing should advertise one.
    pub sha256: Option<String>,
    /// Whether a PEP 658 metadata sidecar is advertised as available.
    pub dist_info_metadata_available: bool,
}

/// Builds the JSON body of a PEP 691 `application/vnd.pypi.simple.v1+json` project listing.
pub fn project_info_json(files: &[FixtureFile]) -> serde_json::Value {
    serde_json::json!({
        "meta": {"api-version": "1.0"},
        "files": files.iter().map(|f| {
            let mut entry = serde_json::json!({
                "filename": f.filename,
                "url": f.url,
                "dist-info-metadata": f.dist_info_metadata_available,
            });
            if let Some(sha256) = &f.sha256 {
                entry["hashes"] = serde_json::json!({"sha256": sha256});
            }
            entry
        }).collect::<Vec<_>>(),
    })
}

/// Builds a temp directory fixture holding `count` trivially-distinct wheels of the same project,
/// named `{name}-{version}-py3-none-any.whl`, each with a minimal metadata body. Returns the
/// temp dir (kept alive by the caller) and the written paths in input order.
pub fn build_wheel_set(
    name: &str,
    versions: &[&str],
    requires_python: Option<&str>,
) -> Result<(tempfile::TempDir, Vec<PathBuf>), Error> {
    let dir = tempfile::tempdir()?;
    let mut paths = Vec::with_capacity(versions.len());
    for version in versions {
        let filename = format!("{name}-{version}-py3-none-any.whl");
        let dist_info_dir = format!("{name}-{version}.dist-info");
        let metadata = core_metadata_text(name, version, requires_python, &[], &[]);
        paths.push(write_wheel(dir.path(), &filename, &dist_info_dir, &metadata)?);
    }
    Ok((dir, paths))
}
