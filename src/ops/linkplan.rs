//! Implementation of `makegen linkplan`.
//!
//! Shows how each link reference of a package resolves for one
//! configuration, in the order it appears on the link line.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::core::platform::{Compiler, PlatformContext, TargetOs};
use crate::core::project::Project;
use crate::generator::workspace::sibling_dependencies;
use crate::generator::{LinkResolver, ResolvedLink};
use crate::ops::{load_manifest, PlatformRequest};

/// Options for the linkplan command.
#[derive(Debug, Clone, Default)]
pub struct LinkplanOptions {
    pub package: String,
    /// Configuration name (defaults to the first one)
    pub config: Option<String>,
    pub platform: PlatformRequest,
    pub manifest: Option<PathBuf>,
}

/// Resolved link references of one package.
#[derive(Debug, Clone, Serialize)]
pub struct LinkPlan {
    pub package: String,
    pub config: String,
    pub os: TargetOs,
    pub compiler: Compiler,
    pub links: Vec<PlannedLink>,
    /// Link-order dependencies (`LDDEPS`).
    pub dependencies: Vec<String>,
    /// Sibling packages that must be built first.
    pub build_after: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedLink {
    pub name: String,
    #[serde(flatten)]
    pub resolved: ResolvedLink,
}

pub fn linkplan(opts: &LinkplanOptions) -> Result<LinkPlan> {
    let manifest = load_manifest(opts.manifest.as_deref())?;
    let platform = opts.platform.resolve(&manifest);
    plan(&manifest.project, &opts.package, opts.config.as_deref(), &platform)
}

/// Build the plan for `package` in `project`.
pub fn plan(
    project: &Project,
    package: &str,
    config: Option<&str>,
    platform: &PlatformContext,
) -> Result<LinkPlan> {
    let pkg = project.package(package).ok_or_else(|| {
        let names: Vec<&str> = project.packages.iter().map(|p| p.name.as_str()).collect();
        anyhow!(
            "package `{}` not found\n\
             available packages: {}",
            package,
            if names.is_empty() {
                "(none)".to_string()
            } else {
                names.join(", ")
            }
        )
    })?;

    let config = match config {
        Some(name) => pkg.configuration(name).ok_or_else(|| {
            anyhow!(
                "configuration `{}` not declared\n\
                 available configurations: {}",
                name,
                project.configurations.join(", ")
            )
        })?,
        None => pkg
            .configurations
            .first()
            .ok_or_else(|| anyhow!("package `{}` has no configurations", package))?,
    };

    let resolver = LinkResolver::new(project, pkg, &config.name, platform.os);
    let links = pkg
        .links
        .iter()
        .map(|link| PlannedLink {
            name: link.name.clone(),
            resolved: resolver.resolve(&link.name),
        })
        .collect();

    Ok(LinkPlan {
        package: pkg.name.clone(),
        config: config.name.clone(),
        os: platform.os,
        compiler: platform.compiler,
        links,
        dependencies: resolver.dependencies(),
        build_after: sibling_dependencies(project, pkg)
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

impl LinkPlan {
    /// Human-readable listing.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Link order for '{}' ({}, {}):\n\n",
            self.package, self.config, self.os
        );
        if self.links.is_empty() {
            out.push_str("  (no link dependencies)\n");
            return out;
        }

        for (index, link) in self.links.iter().enumerate() {
            let (token, origin) = match &link.resolved {
                ResolvedLink::Sibling { path, .. } => (path.as_str(), "sibling package"),
                ResolvedLink::TestGenerator { .. } => ("(nothing)", "test generator package"),
                ResolvedLink::External { flag } => (flag.as_str(), "external library"),
            };
            out.push_str(&format!("  {}. {}\n", index + 1, token));
            out.push_str(&format!("     From: {} ({})\n", link.name, origin));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::project::PackageKind;
    use crate::test_support::{linux_gcc, package, project};

    fn sample() -> Project {
        project(vec![
            package("core", PackageKind::Lib, "core"),
            package("suite", PackageKind::CxxTestGen, "tests"),
            package("app", PackageKind::Exe, "app").with_links(["core", "suite", "pthread"]),
        ])
    }

    #[test]
    fn test_plan_lists_links_in_order() {
        let project = sample();
        let plan = plan(&project, "app", Some("Release"), &linux_gcc()).unwrap();

        assert_eq!(plan.config, "Release");
        assert_eq!(plan.links.len(), 3);
        assert_eq!(plan.dependencies, vec!["../libcore.a"]);
        assert_eq!(plan.build_after, vec!["core", "suite"]);

        let text = plan.render();
        assert!(text.contains("  1. ../libcore.a\n     From: core (sibling package)\n"));
        assert!(text.contains("  3. -lpthread\n"));
    }

    #[test]
    fn test_plan_defaults_to_first_configuration() {
        let project = sample();
        let plan = plan(&project, "core", None, &linux_gcc()).unwrap();
        assert_eq!(plan.config, "Debug");
        assert!(plan.render().contains("(no link dependencies)"));
    }

    #[test]
    fn test_plan_serializes_resolution_kind() {
        let project = sample();
        let windows = PlatformContext::new(TargetOs::Windows, Compiler::Gcc);
        let plan = plan(&project, "app", None, &windows).unwrap();
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["links"][0]["kind"], "sibling");
        assert_eq!(json["links"][0]["path"], "../libcore.a");
        assert_eq!(json["links"][1]["kind"], "test-generator");
        assert_eq!(json["links"][2]["flag"], "-lpthread");
        assert_eq!(json["os"], "windows");
    }

    #[test]
    fn test_unknown_package_lists_available() {
        let project = sample();
        let err = plan(&project, "nope", None, &linux_gcc()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("package `nope` not found"));
        assert!(message.contains("core, suite, app"));
    }

    #[test]
    fn test_unknown_configuration_is_an_error() {
        let project = sample();
        let err = plan(&project, "app", Some("Profile"), &linux_gcc()).unwrap_err();
        assert!(err.to_string().contains("configuration `Profile` not declared"));
    }
}
