//! Per-configuration make variables.
//!
//! Each configuration block of a package makefile is a set of variable
//! assignments derived from the configuration's declarative settings. The
//! toggled tokens are described by ordered rule tables so every switch can
//! be tested on its own; [`compose`] evaluates them once per configuration.

use crate::core::platform::PlatformContext;
use crate::core::project::{ConfigFlag, Configuration, Package, PackageKind, Project};
use crate::generator::is_app_bundle;
use crate::generator::links::LinkResolver;
use crate::util::paths;

/// Everything a flag rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct FlagContext<'a> {
    pub package: &'a Package,
    pub config: &'a Configuration,
    pub platform: &'a PlatformContext,
}

impl FlagContext<'_> {
    fn has(&self, flag: ConfigFlag) -> bool {
        self.config.has_flag(flag)
    }

    fn is_dll(&self) -> bool {
        self.package.kind == PackageKind::Dll
    }
}

/// A token emitted when its predicate holds.
#[derive(Clone, Copy)]
pub struct FlagRule {
    pub token: &'static str,
    pub applies: fn(&FlagContext<'_>) -> bool,
}

impl std::fmt::Debug for FlagRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagRule").field("token", &self.token).finish()
    }
}

/// Appended to `CFLAGS` after `$(CPPFLAGS)`, in this order.
pub const COMPILE_RULES: &[FlagRule] = &[
    FlagRule {
        token: "-fPIC",
        applies: |cx: &FlagContext<'_>| cx.is_dll() && !cx.platform.os.is_windows(),
    },
    FlagRule {
        token: "-g",
        applies: |cx: &FlagContext<'_>| !cx.has(ConfigFlag::NoSymbols),
    },
    FlagRule {
        token: "-Os",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::OptimizeSize),
    },
    FlagRule {
        token: "-O3",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::OptimizeSpeed),
    },
    // Size and speed take precedence over plain optimize.
    FlagRule {
        token: "-O2",
        applies: |cx: &FlagContext<'_>| {
            cx.has(ConfigFlag::Optimize)
                && !cx.has(ConfigFlag::OptimizeSize)
                && !cx.has(ConfigFlag::OptimizeSpeed)
        },
    },
    FlagRule {
        token: "-Wall",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::ExtraWarnings),
    },
    FlagRule {
        token: "-Werror",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::FatalWarnings),
    },
    FlagRule {
        token: "-fomit-frame-pointer",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::NoFramePointer),
    },
];

/// Appended to `CXXFLAGS` after `$(CFLAGS)`.
pub const CXX_RULES: &[FlagRule] = &[
    FlagRule {
        token: "--no-exceptions",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::NoExceptions),
    },
    FlagRule {
        token: "--no-rtti",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::NoRtti),
    },
];

/// Appended to `LDFLAGS` after the directory search flags, before grouping.
pub const LINK_RULES: &[FlagRule] = &[
    FlagRule {
        token: "-shared",
        applies: |cx: &FlagContext<'_>| cx.is_dll() && cx.platform.compiler.is_gcc_family(),
    },
    FlagRule {
        token: "-s",
        applies: |cx: &FlagContext<'_>| cx.has(ConfigFlag::NoSymbols),
    },
    FlagRule {
        token: "-dynamiclib -flat_namespace",
        applies: |cx: &FlagContext<'_>| cx.platform.os.is_macosx() && cx.has(ConfigFlag::Dylib),
    },
];

/// Evaluate a rule table.
pub fn apply_rules<'r>(
    rules: &'r [FlagRule],
    cx: &'r FlagContext<'r>,
) -> impl Iterator<Item = &'static str> + 'r {
    rules.iter().filter(move |r| (r.applies)(cx)).map(|r| r.token)
}

/// The composed variable block of one configuration.
///
/// Flag lists hold the tokens that follow each variable's fixed prefix
/// (`CFLAGS += $(CPPFLAGS)`, `LDFLAGS += -L$(BINDIR) -L$(LIBDIR)`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigVars {
    pub name: String,
    pub bin_dir: String,
    pub lib_dir: String,
    pub obj_dir: String,
    pub out_dir: String,
    pub cppflags: Vec<String>,
    pub cflags: Vec<String>,
    pub cxxflags: Vec<String>,
    pub ldflags: Vec<String>,
    pub lddeps: Vec<String>,
    pub target: String,
    pub macapp: Option<String>,
    pub bldcmd: String,
}

impl ConfigVars {
    /// Render the guarded `ifeq ($(CONFIG),...)` block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("ifeq ($(CONFIG),{})\n", self.name));
        out.push_str(&format!("  BINDIR := {}\n", self.bin_dir));
        out.push_str(&format!("  LIBDIR := {}\n", self.lib_dir));
        out.push_str(&format!("  OBJDIR := {}\n", self.obj_dir));
        out.push_str(&format!("  OUTDIR := {}\n", self.out_dir));
        push_var(&mut out, "  CPPFLAGS :=", &self.cppflags);
        push_var(&mut out, "  CFLAGS += $(CPPFLAGS)", &self.cflags);
        push_var(&mut out, "  CXXFLAGS := $(CFLAGS)", &self.cxxflags);
        push_var(&mut out, "  LDFLAGS += -L$(BINDIR) -L$(LIBDIR)", &self.ldflags);
        push_var(&mut out, "  LDDEPS :=", &self.lddeps);
        out.push_str(&format!("  TARGET := {}\n", self.target));
        if let Some(macapp) = &self.macapp {
            out.push_str(&format!("  MACAPP := {}\n", macapp));
        }
        out.push_str(&format!("  BLDCMD = {}\n", self.bldcmd));
        out.push_str("endif\n\n");
        out
    }
}

fn push_var(out: &mut String, prefix: &str, tokens: &[String]) {
    out.push_str(prefix);
    for token in tokens {
        out.push(' ');
        out.push_str(token);
    }
    out.push('\n');
}

/// Compose the variable block for `config` of `package`.
pub fn compose(
    project: &Project,
    package: &Package,
    config: &Configuration,
    platform: &PlatformContext,
) -> ConfigVars {
    let cx = FlagContext {
        package,
        config,
        platform,
    };
    let os = platform.os;
    let resolver = LinkResolver::new(project, package, &config.name, os);

    // dmc has no equivalent of -MD
    let mut cppflags = Vec::new();
    if platform.compiler.is_gcc_family() {
        cppflags.push("-MD".to_string());
    }
    cppflags.extend(config.defines.iter().map(|d| format!("-D \"{}\"", d)));
    cppflags.extend(config.include_paths.iter().map(|i| format!("-I \"{}\"", i)));

    let mut cflags: Vec<String> = apply_rules(COMPILE_RULES, &cx).map(String::from).collect();
    cflags.extend(config.build_options.iter().cloned());

    let cxxflags = apply_rules(CXX_RULES, &cx).map(String::from).collect();

    // Grouping lets static libraries with circular references resolve in
    // any order. Apple's linker has no --start-group.
    let grouped = !os.is_macosx();
    let mut ldflags: Vec<String> = apply_rules(LINK_RULES, &cx).map(String::from).collect();
    if grouped {
        ldflags.push("-Xlinker --start-group".to_string());
    }
    ldflags.extend(config.link_options.iter().cloned());
    ldflags.extend(config.lib_paths.iter().map(|p| format!("-L\"{}\"", p)));
    ldflags.extend(resolver.link_tokens());
    if grouped {
        ldflags.push("-Xlinker --end-group".to_string());
    }

    let filename = package.kind.output_filename(&config.target, os);
    let bundle = is_app_bundle(package.kind, os);
    let target = if package.kind == PackageKind::CxxTestGen {
        "$(OBJECTS)".to_string()
    } else {
        filename.clone()
    };
    let macapp = bundle.then(|| format!("{}.app/Contents", filename));

    ConfigVars {
        name: config.name.clone(),
        bin_dir: paths::relative_to(&package.path, &config.bin_dir),
        lib_dir: paths::relative_to(&package.path, &config.lib_dir),
        obj_dir: paths::relative_to(&package.path, &config.obj_dir),
        out_dir: paths::relative_to(&package.path, config.out_dir(package.kind)),
        cppflags,
        cflags,
        cxxflags,
        ldflags,
        lddeps: resolver.dependencies(),
        target,
        macapp,
        bldcmd: build_command(package, bundle),
    }
}

/// The `BLDCMD` recipe for the package kind.
pub fn build_command(package: &Package, bundle: bool) -> String {
    match package.kind {
        PackageKind::Lib => {
            "ar -cr $(OUTDIR)/$(TARGET) $(OBJECTS); ranlib $(OUTDIR)/$(TARGET)".to_string()
        }
        PackageKind::CxxTestGen => "true".to_string(),
        PackageKind::Run => "for a in $(LDDEPS); do echo Running $$a; $$a; done".to_string(),
        PackageKind::Exe | PackageKind::WinExe | PackageKind::Dll => {
            let output = if bundle {
                "$(OUTDIR)/$(MACAPP)/MacOS/$(TARGET)"
            } else {
                "$(OUTDIR)/$(TARGET)"
            };
            format!(
                "$({}) -o {} $(OBJECTS) $(LDFLAGS) $(RESOURCES)",
                package.language.driver_var(),
                output
            )
        }
    }
}
