//! Package discovery
//!
//! Without an explicit extension list, every package directory in the
//! workspace (apart from the reserved ones) becomes a candidate.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use tracing::debug;

use crate::error::{Error, Result};
use crate::qualifier::Qualifier;

/// The two package.json fields a qualifier is built from
#[derive(Debug, Deserialize)]
struct PackageInfo {
    name: String,
    version: String,
}

/// List a qualifier for each package directory under `packages_dir`.
///
/// Directories are visited in name order. Reserved and hidden directories are
/// skipped; a directory without a readable package.json is an error.
pub fn enumerate_packages(
    packages_dir: &Utf8Path,
    reserved: &[String],
) -> Result<Vec<Qualifier>> {
    let mut dirs: Vec<Utf8PathBuf> = Vec::new();

    for entry in packages_dir.read_dir_utf8()? {
        let entry = entry?;
        let name = entry.file_name();
        if name.starts_with('.') || reserved.iter().any(|r| r == name) {
            debug!("Skipping package directory {}", name);
            continue;
        }
        if entry.file_type()?.is_dir() {
            dirs.push(entry.into_path());
        }
    }
    dirs.sort();

    let mut qualifiers = Vec::with_capacity(dirs.len());
    for dir in dirs {
        qualifiers.push(read_package(&dir)?);
    }

    debug!(
        "Discovered {} packages in {}",
        qualifiers.len(),
        packages_dir
    );
    Ok(qualifiers)
}

fn read_package(dir: &Utf8Path) -> Result<Qualifier> {
    let path = dir.join("package.json");
    let content = fs::read_to_string(&path).map_err(|source| Error::MissingManifest {
        path: dir.to_string(),
        source,
    })?;
    let info: PackageInfo = serde_json::from_str(&content)
        .map_err(|e| Error::manifest_format(path.as_str(), e.to_string()))?;
    Ok(Qualifier::new(info.name, info.version))
}
