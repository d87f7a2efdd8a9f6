//! Application manifest mutation
//!
//! Between trials the live package.json holds either the base manifest or the
//! base manifest plus exactly one extra `dependencies` entry.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use std::fs;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::qualifier::Qualifier;
use crate::workspace::ManifestPaths;

/// Rewrites the live manifest for each trial
#[derive(Debug, Clone)]
pub struct ManifestMutator {
    /// Path to the live manifest
    live: Utf8PathBuf,

    /// Path to the base manifest used for resets
    base: Utf8PathBuf,
}

impl ManifestMutator {
    pub fn new(live: impl Into<Utf8PathBuf>, base: impl Into<Utf8PathBuf>) -> Self {
        Self {
            live: live.into(),
            base: base.into(),
        }
    }

    pub fn from_paths(paths: &ManifestPaths) -> Self {
        Self::new(paths.live.clone(), paths.base.clone())
    }

    /// Add `qualifier` to the live manifest, or reset to base when `None`
    pub fn apply(&self, qualifier: Option<&Qualifier>) -> Result<()> {
        match qualifier {
            Some(q) => self.add_extension(q),
            None => self.reset(),
        }
    }

    /// Set `dependencies[name] = version` in the live manifest.
    ///
    /// An existing entry with the same name is overwritten.
    pub fn add_extension(&self, qualifier: &Qualifier) -> Result<()> {
        let mut manifest = load_manifest(&self.live)?;
        let dependencies = dependencies_mut(&mut manifest, &self.live)?;

        if let Some(previous) = dependencies.insert(
            qualifier.name().to_string(),
            Value::String(qualifier.version().to_string()),
        ) {
            debug!(
                "Overwriting existing dependency {} (was {})",
                qualifier.name(),
                previous
            );
        }

        save_manifest(&self.live, &manifest)?;
        info!("Added {} to {}", qualifier, self.live);
        Ok(())
    }

    /// Overwrite the live manifest with the base manifest
    pub fn reset(&self) -> Result<()> {
        fs::copy(&self.base, &self.live)?;
        debug!("Reset {} to {}", self.live, self.base);
        Ok(())
    }
}

/// Check that a manifest exists and has a `dependencies` object
pub fn check_manifest(path: &Utf8Path) -> Result<()> {
    let mut manifest = load_manifest(path)?;
    dependencies_mut(&mut manifest, path)?;
    Ok(())
}

/// Load a manifest from file
pub fn load_manifest(path: &Utf8Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::manifest_format(path.as_str(), "file not found")
        } else {
            Error::Io(e)
        }
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Save a manifest as pretty-printed JSON with two-space indentation
pub fn save_manifest(path: &Utf8Path, manifest: &Value) -> Result<()> {
    let mut content = serde_json::to_string_pretty(manifest)?;
    content.push('\n');
    fs::write(path, content)?;
    Ok(())
}

fn dependencies_mut<'a>(
    manifest: &'a mut Value,
    path: &Utf8Path,
) -> Result<&'a mut Map<String, Value>> {
    let root = manifest
        .as_object_mut()
        .ok_or_else(|| Error::manifest_format(path.as_str(), "top level is not an object"))?;

    root.entry("dependencies")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
        .ok_or_else(|| Error::manifest_format(path.as_str(), "`dependencies` is not an object"))
}
