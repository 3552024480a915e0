//! Makefile generation errors.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::platform::Compiler;

/// Error while emitting a makefile.
///
/// Unknown link names and unrecognized source extensions are not errors:
/// they resolve to `-l<name>` and are skipped, respectively.
#[derive(Debug, Error, Diagnostic)]
pub enum GenerateError {
    #[error("cannot compile `{source_path}` in package `{package}` with {compiler}")]
    #[diagnostic(
        code(makegen::generate::unsupported_source),
        help("assembly sources need the gcc toolchain; rerun with `--cc gcc`")
    )]
    UnsupportedSource {
        package: String,
        source_path: String,
        compiler: Compiler,
    },

    #[error("package `{package}` has no configurations")]
    #[diagnostic(code(makegen::generate::no_configurations))]
    NoConfigurations { package: String },

    #[error("failed to write makefile for `{package}`")]
    #[diagnostic(code(makegen::generate::sink))]
    Sink {
        package: String,
        #[source]
        source: std::io::Error,
    },
}

impl GenerateError {
    pub(crate) fn sink(package: &str) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
        move |source| GenerateError::Sink {
            package: package.to_string(),
            source,
        }
    }
}
