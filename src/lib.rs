//! makegen - GNU make makefile generator for C and C++ projects
//!
//! This crate turns a declarative project model (usually loaded from
//! `Makegen.toml`) into one makefile per package plus a workspace makefile
//! that drives them.

pub mod core;
pub mod generator;
pub mod ops;
pub mod util;

/// Model builders and on-disk fixtures for unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{Manifest, PlatformContext, Project};
pub use crate::generator::GenerateError;
