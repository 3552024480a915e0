//! Makegen.toml manifest parsing.
//!
//! The manifest declares the project, its configurations, and an ordered
//! list of `[[package]]` tables. Loading produces the read-only
//! [`Project`] model used by the generators.
//!
//! Path conventions:
//! - `bindir`, `libdir` and `outdir` are relative to the project root.
//! - `path` (package directory) is relative to the project root.
//! - `sources`, `includes`, `libpaths` and `objdir` are relative to the
//!   package directory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::core::platform::{Compiler, TargetOs};
use crate::core::project::{
    object_dir, ConfigFlag, Configuration, CxxTestSettings, Language, LinkReference, Package,
    PackageKind, Project, SourceFile,
};
use crate::util::{fs, paths};

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Makegen.toml";

/// Configurations used when the project does not declare any.
pub const DEFAULT_CONFIGURATIONS: &[&str] = &["Debug", "Release"];

/// Model validation failures.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("project declares no configurations")]
    #[diagnostic(
        code(makegen::manifest::no_configurations),
        help("remove `configurations = []` to use the defaults (Debug, Release)")
    )]
    NoConfigurations,

    #[error("configuration `{0}` is declared more than once")]
    #[diagnostic(code(makegen::manifest::duplicate_configuration))]
    DuplicateConfiguration(String),

    #[error("package `{0}` is declared more than once")]
    #[diagnostic(code(makegen::manifest::duplicate_package))]
    DuplicatePackage(String),

    #[error("package `{package}` configures unknown configuration `{config}`")]
    #[diagnostic(
        code(makegen::manifest::unknown_configuration),
        help("add `{config}` to `configurations` in the [project] table")
    )]
    UnknownConfiguration { package: String, config: String },

    #[error("package `{0}` has an empty name")]
    #[diagnostic(code(makegen::manifest::empty_name))]
    EmptyName(String),
}

/// Defaults for `makegen generate` stored in the `[generate]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateDefaults {
    pub os: Option<TargetOs>,
    pub cc: Option<Compiler>,
    pub verbose: Option<bool>,
}

/// A loaded manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub project: Project,
    pub defaults: GenerateDefaults,
    /// Directory containing the manifest; all project paths are relative to it.
    pub root: PathBuf,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    project: RawProject,

    #[serde(default, rename = "package")]
    packages: Vec<RawPackage>,

    #[serde(default)]
    generate: GenerateDefaults,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    name: String,

    #[serde(default)]
    configurations: Option<Vec<String>>,

    #[serde(default)]
    bindir: Option<String>,

    #[serde(default)]
    libdir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawPackage {
    name: String,

    kind: PackageKind,

    #[serde(default)]
    language: Language,

    #[serde(default)]
    path: Option<String>,

    #[serde(default)]
    sources: Vec<String>,

    #[serde(default)]
    links: Vec<String>,

    #[serde(flatten)]
    settings: RawSettings,

    #[serde(default)]
    config: HashMap<String, RawSettings>,

    #[serde(default)]
    cxxtest: Option<RawCxxTest>,
}

/// Settings valid both at package level and inside `[package.config.<name>]`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    defines: Vec<String>,
    includes: Vec<String>,
    flags: Vec<ConfigFlag>,
    buildoptions: Vec<String>,
    linkoptions: Vec<String>,
    libpaths: Vec<String>,
    bindir: Option<String>,
    libdir: Option<String>,
    objdir: Option<String>,
    outdir: Option<String>,
    target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct RawCxxTest {
    command: Option<String>,
    options: Option<String>,
    root_options: Option<String>,
    root_file: Option<String>,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&content, path, &root)
    }

    /// Parse manifest content. Source globs are expanded relative to `root`.
    pub fn parse(content: &str, path: &Path, root: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let configurations = match raw.project.configurations {
            Some(list) => list,
            None => DEFAULT_CONFIGURATIONS.iter().map(|s| s.to_string()).collect(),
        };
        validate_configurations(&configurations)?;

        let mut project = Project::new(raw.project.name, configurations);
        let mut seen = HashSet::new();

        let mut per_dir: HashMap<String, usize> = HashMap::new();
        for raw_pkg in &raw.packages {
            *per_dir.entry(package_dir(raw_pkg)).or_default() += 1;
        }

        for raw_pkg in raw.packages {
            if raw_pkg.name.trim().is_empty() {
                return Err(ManifestError::EmptyName(raw_pkg.name).into());
            }
            if !seen.insert(raw_pkg.name.clone()) {
                return Err(ManifestError::DuplicatePackage(raw_pkg.name).into());
            }

            let shared = per_dir.get(&package_dir(&raw_pkg)).copied().unwrap_or(0) > 1;
            let package = convert_package(
                raw_pkg,
                &project.configurations,
                raw.project.bindir.as_deref(),
                raw.project.libdir.as_deref(),
                root,
                shared,
            )?;
            tracing::debug!(
                "loaded package `{}` ({}, {} sources)",
                package.name,
                package.kind,
                package.sources.len()
            );
            project.add_package(package);
        }

        Ok(Manifest {
            project,
            defaults: raw.generate,
            root: root.to_path_buf(),
            path: path.to_path_buf(),
        })
    }
}

fn validate_configurations(configurations: &[String]) -> Result<(), ManifestError> {
    if configurations.is_empty() {
        return Err(ManifestError::NoConfigurations);
    }
    let mut seen = HashSet::new();
    for name in configurations {
        if !seen.insert(name.as_str()) {
            return Err(ManifestError::DuplicateConfiguration(name.clone()));
        }
    }
    Ok(())
}

fn package_dir(raw: &RawPackage) -> String {
    paths::normalize(raw.path.as_deref().unwrap_or("."))
}

fn convert_package(
    raw: RawPackage,
    configurations: &[String],
    project_bindir: Option<&str>,
    project_libdir: Option<&str>,
    root: &Path,
    shared: bool,
) -> Result<Package> {
    if let Some(config) = raw.config.keys().find(|k| !configurations.contains(k)) {
        return Err(ManifestError::UnknownConfiguration {
            package: raw.name.clone(),
            config: config.clone(),
        }
        .into());
    }

    let pkg_dir = package_dir(&raw);
    let scope = shared.then_some(raw.name.as_str());
    let mut package = Package::new(&raw.name, raw.kind, raw.language, &pkg_dir, configurations);

    package.sources = expand_sources(root, &pkg_dir, &raw.sources)?
        .into_iter()
        .map(SourceFile::new)
        .collect();
    package.links = raw.links.into_iter().map(LinkReference::new).collect();

    if let Some(cxx) = raw.cxxtest {
        let defaults = CxxTestSettings::for_package(&raw.name);
        package.cxxtest = CxxTestSettings {
            command: cxx.command.unwrap_or(defaults.command),
            options: cxx.options.unwrap_or(defaults.options),
            root_options: cxx.root_options.unwrap_or(defaults.root_options),
            root_file: cxx.root_file.unwrap_or(defaults.root_file),
        };
    }

    for config in &mut package.configurations {
        if let Some(dir) = project_bindir {
            config.bin_dir = paths::normalize(dir);
        }
        if let Some(dir) = project_libdir {
            config.lib_dir = paths::normalize(dir);
        }
        apply_settings(config, &pkg_dir, scope, &raw.settings);
        if let Some(overrides) = raw.config.get(&config.name) {
            apply_settings(config, &pkg_dir, scope, overrides);
        }
    }

    Ok(package)
}

/// Layer `settings` onto `config`: lists append, scalars replace.
///
/// `scope` is the package name when its directory holds other packages.
fn apply_settings(
    config: &mut Configuration,
    pkg_dir: &str,
    scope: Option<&str>,
    settings: &RawSettings,
) {
    config.defines.extend(settings.defines.iter().cloned());
    config.include_paths.extend(settings.includes.iter().cloned());
    config.flags.extend(settings.flags.iter().copied());
    config.build_options.extend(settings.buildoptions.iter().cloned());
    config.link_options.extend(settings.linkoptions.iter().cloned());
    config.lib_paths.extend(settings.libpaths.iter().cloned());

    if let Some(dir) = &settings.bindir {
        config.bin_dir = paths::normalize(dir);
    }
    if let Some(dir) = &settings.libdir {
        config.lib_dir = paths::normalize(dir);
    }
    if let Some(dir) = &settings.outdir {
        config.out_dir = Some(paths::normalize(dir));
    }
    if let Some(dir) = &settings.objdir {
        // Objects stay per-configuration even under a custom base directory.
        config.obj_dir = object_dir(pkg_dir, dir, scope, &config.name);
    }
    if let Some(target) = &settings.target {
        config.target = target.clone();
    }
}

/// Expand source patterns relative to the package directory.
///
/// Literal paths are kept as written, whether or not they exist yet; glob
/// patterns are expanded against the filesystem in sorted order.
fn expand_sources(root: &Path, pkg_dir: &str, patterns: &[String]) -> Result<Vec<String>> {
    let base = root.join(pkg_dir);
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for pattern in patterns {
        let matches = if is_glob(pattern) {
            fs::glob_files(&base, std::slice::from_ref(pattern))?
                .iter()
                .map(|p| paths::to_slash(&fs::relative_path(&base, p)))
                .collect()
        } else {
            vec![paths::normalize(pattern)]
        };

        if matches.is_empty() {
            tracing::warn!("source pattern `{}` matched no files", pattern);
        }
        for path in matches {
            if seen.insert(path.clone()) {
                sources.push(path);
            }
        }
    }

    Ok(sources)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Search `start` and its ancestors for a manifest.
pub fn find_manifest(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(MANIFEST_NAME))
        .find(|candidate| candidate.is_file())
}
