//! Link reference resolution.
//!
//! A link reference names either a sibling package in the same project or
//! an external library. Siblings contribute their artifact path both to the
//! link line and to `LDDEPS` (so a rebuilt library relinks its dependents);
//! external libraries only contribute `-l<name>`.

use serde::Serialize;

use crate::core::platform::TargetOs;
use crate::core::project::{LinkReference, Package, Project};
use crate::util::paths;

/// The outcome of resolving one link reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResolvedLink {
    /// A sibling package artifact, relative to the referencing package.
    Sibling { package: String, path: String },
    /// A sibling that produces nothing linkable.
    TestGenerator { package: String },
    /// A library expected to exist outside the project.
    External { flag: String },
}

impl ResolvedLink {
    /// Token placed on the link line, if any.
    pub fn link_token(&self) -> Option<&str> {
        match self {
            ResolvedLink::Sibling { path, .. } => Some(path),
            ResolvedLink::TestGenerator { .. } => None,
            ResolvedLink::External { flag } => Some(flag),
        }
    }

    /// Entry for the link-dependency list, if any.
    pub fn dependency(&self) -> Option<&str> {
        match self {
            ResolvedLink::Sibling { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Resolves link references of one package for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    project: &'a Project,
    package: &'a Package,
    config_name: &'a str,
    os: TargetOs,
}

impl<'a> LinkResolver<'a> {
    pub fn new(
        project: &'a Project,
        package: &'a Package,
        config_name: &'a str,
        os: TargetOs,
    ) -> Self {
        LinkResolver {
            project,
            package,
            config_name,
            os,
        }
    }

    /// Resolve a single name.
    pub fn resolve(&self, name: &str) -> ResolvedLink {
        let Some(sibling) = self.project.package(name) else {
            return ResolvedLink::External {
                flag: format!("-l{}", name),
            };
        };

        if !sibling.kind.is_linkable() {
            return ResolvedLink::TestGenerator {
                package: sibling.name.clone(),
            };
        }

        // Configurations are project-wide; fall back to the sibling's first
        // one for hand-built models that diverge.
        let config = sibling
            .configuration(self.config_name)
            .or_else(|| sibling.configurations.first());
        let target = match config {
            Some(config) => sibling.target_path(config, self.os),
            None => paths::join(".", &sibling.kind.output_filename(&sibling.name, self.os)),
        };

        ResolvedLink::Sibling {
            package: sibling.name.clone(),
            path: local_path(paths::relative_to(&self.package.path, &target)),
        }
    }

    /// Resolve every link reference of the package, in declaration order.
    pub fn resolve_all(&self) -> impl Iterator<Item = ResolvedLink> + 'a {
        let resolver = *self;
        let package: &'a Package = self.package;
        package
            .links
            .iter()
            .map(move |link: &LinkReference| resolver.resolve(&link.name))
    }

    /// Tokens for the link line.
    pub fn link_tokens(&self) -> Vec<String> {
        self.resolve_all()
            .filter_map(|r| r.link_token().map(str::to_string))
            .collect()
    }

    /// Ordered link-dependency list.
    pub fn dependencies(&self) -> Vec<String> {
        self.resolve_all()
            .filter_map(|r| r.dependency().map(str::to_string))
            .collect()
    }
}

/// Keep a `./` on artifacts beside the makefile so shells never search `$PATH`.
fn local_path(path: String) -> String {
    if path.contains('/') {
        path
    } else {
        format!("./{}", path)
    }
}
