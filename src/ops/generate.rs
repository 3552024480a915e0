//! Implementation of `makegen generate`.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::Manifest;
use crate::core::platform::PlatformContext;
use crate::generator::{render_package, render_workspace};
use crate::ops::{load_manifest, PlatformRequest};
use crate::util::fs;

/// File name of the workspace makefile at the project root.
pub const WORKSPACE_MAKEFILE: &str = "Makefile";

/// Options for the generate command.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Target platform overrides
    pub platform: PlatformRequest,

    /// Explicit manifest path (otherwise searched upward)
    pub manifest: Option<PathBuf>,

    /// Render everything but write nothing
    pub dry_run: bool,
}

/// One makefile produced by a generate pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    /// Whether the content differs from what was on disk.
    pub changed: bool,
}

/// Outcome of a generate pass.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub platform: PlatformContext,
    pub files: Vec<WrittenFile>,
}

/// Render every makefile of the project, then write them.
///
/// Nothing is written unless every makefile renders. Package makefiles
/// whose content is unchanged are left untouched so make does not see a
/// newer timestamp. The workspace makefile is always rewritten: its
/// `Makefile: Makegen.toml` rule is only satisfied once it is newer than
/// the manifest.
pub fn generate(opts: &GenerateOptions) -> Result<GenerateResult> {
    let manifest = load_manifest(opts.manifest.as_deref())?;
    let platform = opts.platform.resolve(&manifest);
    tracing::debug!(
        "generating for os={} cc={} verbose={}",
        platform.os,
        platform.compiler,
        platform.verbose
    );

    let rendered = render_all(&manifest, &platform)?;

    let workspace = manifest.root.join(WORKSPACE_MAKEFILE);
    let mut files = Vec::with_capacity(rendered.len());
    for (path, text) in rendered {
        let changed = differs(&path, &text);
        if (changed || path == workspace) && !opts.dry_run {
            fs::write_atomic(&path, text.as_bytes())?;
            if changed {
                tracing::info!("wrote {}", path.display());
            } else {
                tracing::debug!("refreshed {}", path.display());
            }
        }
        files.push(WrittenFile { path, changed });
    }

    Ok(GenerateResult { platform, files })
}

/// Absolute paths and contents of every makefile, workspace makefile last.
pub fn render_all(
    manifest: &Manifest,
    platform: &PlatformContext,
) -> Result<Vec<(PathBuf, String)>> {
    let project = &manifest.project;
    let mut rendered = Vec::with_capacity(project.packages.len() + 1);

    for package in &project.packages {
        let text = render_package(project, package, platform)?;
        let path = manifest.root.join(project.makefile_path(package));
        rendered.push((path, text));
    }
    rendered.push((
        manifest.root.join(WORKSPACE_MAKEFILE),
        render_workspace(project, platform),
    ));

    Ok(rendered)
}

/// Every path a generate pass writes.
pub fn generated_paths(manifest: &Manifest) -> Vec<PathBuf> {
    let project = &manifest.project;
    project
        .packages
        .iter()
        .map(|p| manifest.root.join(project.makefile_path(p)))
        .chain(std::iter::once(manifest.root.join(WORKSPACE_MAKEFILE)))
        .collect()
}

fn differs(path: &Path, text: &str) -> bool {
    match std::fs::read(path) {
        Ok(existing) => existing != text.as_bytes(),
        Err(_) => true,
    }
}
