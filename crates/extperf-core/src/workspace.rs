//! Manifest backup and restore
//!
//! A sweep rewrites the application's package.json many times. The guard in
//! this module parks the pristine file at a backup path for the duration of
//! the sweep and puts it back exactly once, whichever way the sweep ends.

use camino::Utf8PathBuf;
use std::fs;
use tracing::{debug, info, warn};

use crate::error::Result;

/// The three manifest-shaped files a sweep works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPaths {
    /// Live manifest read by the build
    pub live: Utf8PathBuf,
    /// Pristine copy kept while the sweep runs
    pub backup: Utf8PathBuf,
    /// Manifest with no added extension
    pub base: Utf8PathBuf,
}

/// Scoped lease on the live manifest.
///
/// Acquiring copies the live manifest to the backup path; releasing copies it
/// back and deletes the backup. Release runs at most once, either through
/// [`ManifestWorkspace::restore`] or on drop.
#[derive(Debug)]
pub struct ManifestWorkspace {
    paths: ManifestPaths,
    released: bool,
}

impl ManifestWorkspace {
    /// Back up the live manifest.
    ///
    /// A backup left behind by a run that never reached cleanup is restored
    /// first, so the new backup is always the original file.
    pub fn acquire(paths: ManifestPaths) -> Result<Self> {
        if paths.backup.exists() {
            warn!(
                "Found stale manifest backup at {}, restoring it before starting",
                paths.backup
            );
            restore_manifest(&paths)?;
        }

        if let Some(parent) = paths.backup.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::copy(&paths.live, &paths.backup)?;
        info!("Backed up {} to {}", paths.live, paths.backup);

        Ok(Self {
            paths,
            released: false,
        })
    }

    /// Put the original manifest back and drop the backup.
    ///
    /// Failures are logged, never returned; later calls are no-ops.
    pub fn restore(&mut self) {
        if self.released {
            debug!("Manifest already restored");
            return;
        }
        self.released = true;

        match restore_manifest(&self.paths) {
            Ok(()) => info!("Restored {}", self.paths.live),
            Err(e) => warn!("Failed to restore {}: {}", self.paths.live, e),
        }
    }
}

impl Drop for ManifestWorkspace {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Copy the backup over the live manifest, then delete the backup.
///
/// A missing backup is treated as already restored.
pub fn restore_manifest(paths: &ManifestPaths) -> Result<()> {
    if !paths.backup.exists() {
        debug!("No backup at {}, nothing to restore", paths.backup);
        return Ok(());
    }

    fs::copy(&paths.backup, &paths.live)?;
    fs::remove_file(&paths.backup)?;
    Ok(())
}
