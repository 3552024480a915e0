//! Core data structures for makegen.
//!
//! - The project model (packages, configurations, sources, links)
//! - Platform and toolchain identity
//! - Manifest loading

pub mod manifest;
pub mod platform;
pub mod project;

pub use manifest::{find_manifest, Manifest, ManifestError, MANIFEST_NAME};
pub use platform::{Compiler, PlatformContext, TargetOs};
pub use project::{
    ConfigFlag, Configuration, Language, LinkReference, Package, PackageKind, Project, SourceFile,
    SourceKind,
};
