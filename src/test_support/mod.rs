//! Test helpers for makegen unit tests.
//!
//! Model builders construct projects in memory; [`fixtures`] lays out
//! projects on disk for tests that go through the manifest loader.

pub mod fixtures;

pub use fixtures::*;

use crate::core::platform::{Compiler, PlatformContext, TargetOs};
use crate::core::project::{Language, Package, PackageKind, Project};

/// Configuration names used by the builders.
pub fn configs() -> Vec<String> {
    vec!["Debug".to_string(), "Release".to_string()]
}

/// A C package with Debug and Release configurations.
pub fn package(name: &str, kind: PackageKind, path: &str) -> Package {
    Package::new(name, kind, Language::C, path, &configs())
}

/// A project named `demo` holding `packages` in order.
pub fn project(packages: Vec<Package>) -> Project {
    packages
        .into_iter()
        .fold(Project::new("demo", configs()), Project::with_package)
}

/// Non-verbose GCC on a Unix-like OS.
pub fn linux_gcc() -> PlatformContext {
    PlatformContext::new(TargetOs::Other, Compiler::Gcc)
}
