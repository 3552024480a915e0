//! On-disk project fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::manifest::MANIFEST_NAME;

/// A temporary project directory with a manifest and source files.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Create a project whose manifest is `manifest`.
    pub fn new(manifest: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_NAME), manifest).unwrap();
        ProjectFixture { dir }
    }

    /// A two-package project: a static library and an executable linking it.
    pub fn app_and_lib() -> Self {
        Self::new(
            r#"[project]
name = "demo"

[[package]]
name = "core"
kind = "lib"
path = "core"
sources = ["*.c"]

[[package]]
name = "app"
kind = "exe"
path = "app"
sources = ["main.c"]
links = ["core", "m"]
"#,
        )
        .with_file("core/core.c", "int core(void) { return 0; }\n")
        .with_file("core/util.c", "int util(void) { return 1; }\n")
        .with_file("app/main.c", "int main(void) { return 0; }\n")
    }

    /// Add a file relative to the project root.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join(MANIFEST_NAME)
    }

    /// Read a file relative to the project root.
    pub fn read(&self, path: &str) -> String {
        fs::read_to_string(self.dir.path().join(path)).unwrap()
    }
}
