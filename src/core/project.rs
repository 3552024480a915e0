//! The in-memory project model.
//!
//! A [`Project`] is built once by the manifest loader (or by hand in tests)
//! and is read-only while makefiles are emitted. Per-configuration data is
//! always reached through an explicit [`Configuration`] reference.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::platform::TargetOs;
use crate::util::paths;

/// Source language of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    C,
    #[serde(rename = "c++", alias = "cpp", alias = "cxx")]
    Cxx,
}

impl Language {
    /// Make variable naming the link driver for this language.
    pub fn driver_var(&self) -> &'static str {
        match self {
            Language::C => "CC",
            Language::Cxx => "CXX",
        }
    }

    /// Name used in makefile headers.
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::C => "C",
            Language::Cxx => "C++",
        }
    }
}

/// What a package produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Console executable
    #[serde(alias = "bin")]
    Exe,
    /// Windowed (GUI) executable
    WinExe,
    /// Shared library
    #[serde(alias = "shared")]
    Dll,
    /// Static library
    #[serde(alias = "static", alias = "staticlib")]
    Lib,
    /// CxxTest suite generated from headers
    CxxTestGen,
    /// Runs the artifacts it links against
    Run,
}

impl PackageKind {
    /// Human-readable description used in makefile headers.
    pub fn description(&self) -> &'static str {
        match self {
            PackageKind::Exe => "Console Executable",
            PackageKind::WinExe => "Windowed Executable",
            PackageKind::Dll => "Shared Library",
            PackageKind::Lib => "Static Library",
            PackageKind::CxxTestGen => "CxxTest Generator",
            PackageKind::Run => "Run Target",
        }
    }

    /// Output filename for a target base name on the given OS.
    pub fn output_filename(&self, name: &str, os: TargetOs) -> String {
        match self {
            PackageKind::Exe | PackageKind::WinExe | PackageKind::Run => {
                if os.is_windows() {
                    format!("{}.exe", name)
                } else {
                    name.to_string()
                }
            }
            PackageKind::Dll => match os {
                TargetOs::Windows => format!("{}.dll", name),
                TargetOs::Macosx => format!("lib{}.dylib", name),
                TargetOs::Other => format!("lib{}.so", name),
            },
            PackageKind::Lib => format!("lib{}.a", name),
            PackageKind::CxxTestGen => name.to_string(),
        }
    }

    /// Whether the kind produces something that can sit on a link line.
    pub fn is_linkable(&self) -> bool {
        !matches!(self, PackageKind::CxxTestGen)
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Named boolean build switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfigFlag {
    NoSymbols,
    Optimize,
    OptimizeSize,
    OptimizeSpeed,
    ExtraWarnings,
    FatalWarnings,
    NoFramePointer,
    NoExceptions,
    NoRtti,
    Dylib,
}

/// Base of object directories when the manifest sets no `objdir`.
pub const DEFAULT_OBJ_DIR: &str = "obj";

/// Object directory of one configuration: `<package_dir>/<base>/<Config>`.
///
/// Packages sharing a directory pass their name as `scope` and get
/// `<package_dir>/<base>/<name>/<Config>` so their objects never collide.
pub fn object_dir(package_dir: &str, base: &str, scope: Option<&str>, config: &str) -> String {
    match scope {
        Some(name) => paths::join(package_dir, &format!("{}/{}/{}", base, name, config)),
        None => paths::join(package_dir, &format!("{}/{}", base, config)),
    }
}

/// One named build variant of a package.
///
/// Directory fields are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub name: String,
    pub bin_dir: String,
    pub lib_dir: String,
    pub obj_dir: String,
    /// Explicit output directory; see [`Configuration::out_dir`].
    pub out_dir: Option<String>,
    /// Target base name, without prefix or extension.
    pub target: String,
    pub defines: Vec<String>,
    /// Include directories, relative to the package directory.
    pub include_paths: Vec<String>,
    pub flags: BTreeSet<ConfigFlag>,
    pub build_options: Vec<String>,
    pub link_options: Vec<String>,
    /// Library search directories, relative to the package directory.
    pub lib_paths: Vec<String>,
}

impl Configuration {
    /// A configuration with default directories for a package at `package_dir`.
    pub fn new(name: impl Into<String>, package_dir: &str, target: impl Into<String>) -> Self {
        let name = name.into();
        let obj_dir = object_dir(package_dir, DEFAULT_OBJ_DIR, None, &name);
        Configuration {
            name,
            bin_dir: ".".to_string(),
            lib_dir: ".".to_string(),
            obj_dir,
            out_dir: None,
            target: target.into(),
            defines: Vec::new(),
            include_paths: Vec::new(),
            flags: BTreeSet::new(),
            build_options: Vec::new(),
            link_options: Vec::new(),
            lib_paths: Vec::new(),
        }
    }

    pub fn has_flag(&self, flag: ConfigFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Directory the package artifact is written to.
    ///
    /// Static libraries go to the library directory unless overridden,
    /// everything else to the binary directory.
    pub fn out_dir(&self, kind: PackageKind) -> &str {
        match (&self.out_dir, kind) {
            (Some(dir), _) => dir,
            (None, PackageKind::Lib) => &self.lib_dir,
            (None, _) => &self.bin_dir,
        }
    }
}

/// Classification of a source file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    C,
    Cxx,
    /// GNU assembler source run through the preprocessor
    Assembly,
    /// Netwide assembler source
    Nasm,
    /// Windows resource script
    Resource,
    Header,
    Other,
}

impl SourceKind {
    pub fn from_path(path: &str) -> Self {
        match paths::extension(path).as_deref() {
            Some(".c") => SourceKind::C,
            Some(".cc" | ".cpp" | ".cxx" | ".c++") => SourceKind::Cxx,
            Some(".s") => SourceKind::Assembly,
            Some(".asm") => SourceKind::Nasm,
            Some(".rc") => SourceKind::Resource,
            Some(".h" | ".hh" | ".hpp" | ".hxx") => SourceKind::Header,
            _ => SourceKind::Other,
        }
    }

    /// Whether files of this kind become entries of the object list.
    pub fn is_compiled(&self) -> bool {
        matches!(
            self,
            SourceKind::C | SourceKind::Cxx | SourceKind::Assembly | SourceKind::Nasm
        )
    }
}

/// A file listed in a package, relative to the package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>) -> Self {
        SourceFile {
            path: paths::normalize(&path.into()),
        }
    }

    pub fn kind(&self) -> SourceKind {
        SourceKind::from_path(&self.path)
    }

    pub fn stem(&self) -> &str {
        paths::file_stem(&self.path)
    }
}

/// A name on a package's link line, resolved at emission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub name: String,
}

impl LinkReference {
    pub fn new(name: impl Into<String>) -> Self {
        LinkReference { name: name.into() }
    }
}

/// Settings for packages of kind [`PackageKind::CxxTestGen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CxxTestSettings {
    /// Generator command
    pub command: String,
    /// Options passed when generating each test part
    pub options: String,
    /// Options passed when generating the runner
    pub root_options: String,
    /// Runner source file, relative to the package directory
    pub root_file: String,
}

impl CxxTestSettings {
    pub fn for_package(name: &str) -> Self {
        CxxTestSettings {
            command: "cxxtestgen.py".to_string(),
            options: String::new(),
            root_options: String::new(),
            root_file: format!("{}_runner.cpp", name),
        }
    }
}

/// A buildable unit of the project.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub kind: PackageKind,
    pub language: Language,
    /// Package directory, relative to the project root.
    pub path: String,
    pub configurations: Vec<Configuration>,
    pub sources: Vec<SourceFile>,
    pub links: Vec<LinkReference>,
    pub cxxtest: CxxTestSettings,
}

impl Package {
    /// A package with one default configuration per name in `configs`.
    pub fn new(
        name: impl Into<String>,
        kind: PackageKind,
        language: Language,
        path: &str,
        configs: &[String],
    ) -> Self {
        let name = name.into();
        let path = paths::normalize(path);
        let configurations = configs
            .iter()
            .map(|c| Configuration::new(c.clone(), &path, name.clone()))
            .collect();
        let cxxtest = CxxTestSettings::for_package(&name);
        Package {
            name,
            kind,
            language,
            path,
            configurations,
            sources: Vec::new(),
            links: Vec::new(),
            cxxtest,
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.sources = sources.into_iter().map(SourceFile::new).collect();
        self
    }

    pub fn with_links(mut self, links: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.links = links.into_iter().map(LinkReference::new).collect();
        self
    }

    /// Look up a configuration by name.
    pub fn configuration(&self, name: &str) -> Option<&Configuration> {
        self.configurations.iter().find(|c| c.name == name)
    }

    /// Path of the built artifact for `config`, relative to the project root.
    pub fn target_path(&self, config: &Configuration, os: TargetOs) -> String {
        paths::join(
            config.out_dir(self.kind),
            &self.kind.output_filename(&config.target, os),
        )
    }
}

/// The whole project: ordered packages sharing one set of configuration names.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub configurations: Vec<String>,
    pub packages: Vec<Package>,
}

impl Project {
    pub fn new(name: impl Into<String>, configurations: Vec<String>) -> Self {
        Project {
            name: name.into(),
            configurations,
            packages: Vec::new(),
        }
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.add_package(package);
        self
    }

    /// Append a package.
    ///
    /// When the package's directory already holds another package, every
    /// package there with a default object directory is moved to its own
    /// `obj/<name>/<Config>`.
    pub fn add_package(&mut self, package: Package) {
        let dir = package.path.clone();
        self.packages.push(package);
        if self.packages.iter().filter(|p| p.path == dir).count() < 2 {
            return;
        }

        for pkg in self.packages.iter_mut().filter(|p| p.path == dir) {
            for config in &mut pkg.configurations {
                let unscoped = object_dir(&pkg.path, DEFAULT_OBJ_DIR, None, &config.name);
                if config.obj_dir == unscoped {
                    let scope = Some(pkg.name.as_str());
                    config.obj_dir = object_dir(&pkg.path, DEFAULT_OBJ_DIR, scope, &config.name);
                }
            }
        }
    }

    /// Whether another package lives in the same directory as `package`.
    pub fn shares_directory(&self, package: &Package) -> bool {
        self.packages
            .iter()
            .any(|p| p.name != package.name && p.path == package.path)
    }

    /// Find a sibling package by name.
    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn package_index(&self, name: &str) -> Option<usize> {
        self.packages.iter().position(|p| p.name == name)
    }

    /// Name of the makefile generated for `package`, relative to its directory.
    ///
    /// A package owns its directory (and gets a plain `Makefile`) when it is
    /// the only package there and the directory is not the project root.
    pub fn makefile_name(&self, package: &Package) -> String {
        if package.path == "." || self.shares_directory(package) {
            format!("{}.make", package.name)
        } else {
            "Makefile".to_string()
        }
    }

    /// Path of the makefile generated for `package`, relative to the project root.
    pub fn makefile_path(&self, package: &Package) -> String {
        paths::join(&package.path, &self.makefile_name(package))
    }
}
