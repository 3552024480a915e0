//! High-level operations.
//!
//! This module contains the implementation of makegen commands.

pub mod clean;
pub mod generate;
pub mod linkplan;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::{find_manifest, Manifest, MANIFEST_NAME};
use crate::core::platform::{Compiler, PlatformContext, TargetOs};

pub use clean::{clean, CleanOptions};
pub use generate::{generate, GenerateOptions, GenerateResult, WrittenFile};
pub use linkplan::{linkplan, LinkPlan, LinkplanOptions};

/// Load the manifest at `explicit`, or search upward from the current directory.
pub fn load_manifest(explicit: Option<&Path>) -> Result<Manifest> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => locate_manifest()?,
    };
    Manifest::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn locate_manifest() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    match find_manifest(&cwd) {
        Some(path) => Ok(path),
        None => bail!(
            "could not find `{}` in `{}` or any parent directory\n\
             help: pass `--manifest <PATH>` to point at one",
            MANIFEST_NAME,
            cwd.display()
        ),
    }
}

/// Platform selection requested by the caller, before manifest defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformRequest {
    pub os: Option<TargetOs>,
    pub cc: Option<Compiler>,
    pub verbose: Option<bool>,
}

impl PlatformRequest {
    /// Fill unset fields from the manifest `[generate]` table, then the host.
    pub fn resolve(&self, manifest: &Manifest) -> PlatformContext {
        let defaults = &manifest.defaults;
        let host = PlatformContext::host();
        PlatformContext::new(
            self.os.or(defaults.os).unwrap_or(host.os),
            self.cc.or(defaults.cc).unwrap_or(host.compiler),
        )
        .with_verbose(self.verbose.or(defaults.verbose).unwrap_or(false))
    }
}
