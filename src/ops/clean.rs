//! Implementation of `makegen clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::ops::generate::generated_paths;
use crate::ops::load_manifest;
use crate::util::fs::remove_file_if_exists;

/// Options for the clean command.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Explicit manifest path (otherwise searched upward)
    pub manifest: Option<PathBuf>,
}

/// Remove every makefile `generate` would write. Returns the removed paths.
pub fn clean(opts: &CleanOptions) -> Result<Vec<PathBuf>> {
    let manifest = load_manifest(opts.manifest.as_deref())?;

    let mut removed = Vec::new();
    for path in generated_paths(&manifest) {
        if remove_file_if_exists(&path)? {
            tracing::info!("removed {}", path.display());
            removed.push(path);
        }
    }
    Ok(removed)
}
