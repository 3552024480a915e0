//! Platform and toolchain identity for makefile generation.
//!
//! The generator never probes the machine it runs on for compilers; the
//! platform context is plain data chosen by the caller (CLI flags, manifest
//! defaults, or host detection).

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Operating system the generated makefile targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    /// Microsoft Windows (MinGW / Cygwin style GNU make)
    Windows,
    /// Apple macOS
    #[serde(alias = "macos", alias = "darwin")]
    #[value(alias = "macos", alias = "darwin")]
    Macosx,
    /// Linux, the BSDs, and every other Unix-like system
    #[serde(alias = "linux", alias = "bsd")]
    #[value(alias = "linux", alias = "bsd")]
    Other,
}

impl TargetOs {
    /// The OS this binary was compiled for.
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            TargetOs::Windows
        } else if cfg!(target_os = "macos") {
            TargetOs::Macosx
        } else {
            TargetOs::Other
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, TargetOs::Windows)
    }

    pub fn is_macosx(&self) -> bool {
        matches!(self, TargetOs::Macosx)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOs::Windows => "windows",
            TargetOs::Macosx => "macosx",
            TargetOs::Other => "other",
        }
    }
}

impl fmt::Display for TargetOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiler family the makefile invokes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Compiler {
    /// GCC and drivers compatible with it (`$(CC)` / `$(CXX)`)
    #[default]
    #[serde(alias = "clang")]
    #[value(alias = "clang")]
    Gcc,
    /// Digital Mars C/C++ (legacy)
    Dmc,
}

impl Compiler {
    /// Whether the compiler understands GCC driver options such as `-MD` and `-shared`.
    pub fn is_gcc_family(&self) -> bool {
        matches!(self, Compiler::Gcc)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Compiler::Gcc => "gcc",
            Compiler::Dmc => "dmc",
        }
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything about the build environment that influences emitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformContext {
    pub os: TargetOs,
    pub compiler: Compiler,
    /// Emit recipes without `@` echo suppression and progress lines.
    pub verbose: bool,
}

impl PlatformContext {
    pub fn new(os: TargetOs, compiler: Compiler) -> Self {
        PlatformContext {
            os,
            compiler,
            verbose: false,
        }
    }

    /// Host OS with the GCC toolchain.
    pub fn host() -> Self {
        Self::new(TargetOs::host(), Compiler::Gcc)
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Recipe prefix that suppresses command echo.
    pub fn quiet_prefix(&self) -> &'static str {
        if self.verbose {
            ""
        } else {
            "@"
        }
    }
}

impl Default for PlatformContext {
    fn default() -> Self {
        Self::host()
    }
}
