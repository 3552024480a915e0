//! GNU make backend.
//!
//! [`makefile`] writes one makefile per package; [`workspace`] writes the
//! top-level makefile that drives them. Both are pure functions of the
//! project model and a [`PlatformContext`](crate::core::platform::PlatformContext).

pub mod error;
pub mod flags;
pub mod links;
pub mod makefile;
pub mod sources;
pub mod workspace;

pub use error::GenerateError;
pub use links::{LinkResolver, ResolvedLink};
pub use makefile::{render_package, PackageEmitter};
pub use workspace::{build_order, render_workspace};

use crate::core::platform::TargetOs;
use crate::core::project::PackageKind;

/// Windowed executables on macOS are linked into an application bundle.
pub(crate) fn is_app_bundle(kind: PackageKind, os: TargetOs) -> bool {
    kind == PackageKind::WinExe && os.is_macosx()
}
