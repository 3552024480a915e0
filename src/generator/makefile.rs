//! Package makefile emission.
//!
//! A package makefile is written in a fixed sequence of sections:
//!
//! 1. header and default `CONFIG`
//! 2. one guarded variable block per configuration
//! 3. `OBJECTS` and (Windows only) `RESOURCES`
//! 4. directory helpers and `.PHONY`
//! 5. the main build target, then `clean`
//! 6. one rule per compiled file
//! 7. the `-include` of generated dependency files
//!
//! Any error aborts the whole package; callers are expected to discard
//! what was written to the sink so far.

use std::io::Write;

use crate::core::manifest::MANIFEST_NAME;
use crate::core::platform::PlatformContext;
use crate::core::project::{Package, PackageKind, Project};
use crate::generator::error::GenerateError;
use crate::generator::{flags, is_app_bundle, sources};

/// Portable "create directory if missing" helpers.
///
/// `ComSpec` is only set when make runs under the Windows command
/// interpreter, which has no `mkdir -p`.
const MKDIR_HELPERS: &str = "\
CMD := $(subst \\,\\\\,$(ComSpec)$(COMSPEC))
ifeq (,$(CMD))
  CMD_MKBINDIR := mkdir -p $(BINDIR)
  CMD_MKLIBDIR := mkdir -p $(LIBDIR)
  CMD_MKOUTDIR := mkdir -p $(OUTDIR)
  CMD_MKOBJDIR := mkdir -p $(OBJDIR)
else
  CMD_MKBINDIR := $(CMD) /c if not exist $(subst /,\\\\,$(BINDIR)) mkdir $(subst /,\\\\,$(BINDIR))
  CMD_MKLIBDIR := $(CMD) /c if not exist $(subst /,\\\\,$(LIBDIR)) mkdir $(subst /,\\\\,$(LIBDIR))
  CMD_MKOUTDIR := $(CMD) /c if not exist $(subst /,\\\\,$(OUTDIR)) mkdir $(subst /,\\\\,$(OUTDIR))
  CMD_MKOBJDIR := $(CMD) /c if not exist $(subst /,\\\\,$(OBJDIR)) mkdir $(subst /,\\\\,$(OBJDIR))
endif

.PHONY: clean

";

/// Writes the makefile of one package.
pub struct PackageEmitter<'a> {
    project: &'a Project,
    package: &'a Package,
    platform: &'a PlatformContext,
}

impl<'a> PackageEmitter<'a> {
    pub fn new(project: &'a Project, package: &'a Package, platform: &'a PlatformContext) -> Self {
        PackageEmitter {
            project,
            package,
            platform,
        }
    }

    /// Render the makefile into an owned string.
    pub fn render(&self) -> Result<String, GenerateError> {
        let mut buf = Vec::new();
        self.emit(&mut buf)?;
        // Everything written is built from UTF-8 strings.
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Write the makefile to `out`.
    pub fn emit(&self, out: &mut dyn Write) -> Result<(), GenerateError> {
        let package = self.package;
        tracing::debug!("emitting makefile for `{}`", package.name);

        let mut text = String::new();
        self.header(&mut text)?;
        self.config_blocks(&mut text);
        self.object_lists(&mut text);
        text.push_str(MKDIR_HELPERS);
        self.main_target(&mut text);
        self.clean_target(&mut text);
        self.file_rules(&mut text)?;
        if package.kind != PackageKind::CxxTestGen {
            text.push_str("-include $(OBJECTS:%.o=%.d)\n\n");
        }

        out.write_all(text.as_bytes())
            .and_then(|_| out.flush())
            .map_err(GenerateError::sink(&package.name))
    }

    fn header(&self, text: &mut String) -> Result<(), GenerateError> {
        let package = self.package;
        let first = package
            .configurations
            .first()
            .ok_or_else(|| GenerateError::NoConfigurations {
                package: package.name.clone(),
            })?;

        text.push_str(&format!(
            "# {} {} Makefile autogenerated by makegen\n",
            package.language.display_name(),
            package.kind.description()
        ));
        text.push_str(&format!(
            "# Don't edit this file! Instead edit `{}` then rerun `makegen generate`\n\n",
            MANIFEST_NAME
        ));
        text.push_str(&format!("ifndef CONFIG\n  CONFIG={}\nendif\n\n", first.name));
        Ok(())
    }

    fn config_blocks(&self, text: &mut String) {
        for config in &self.package.configurations {
            tracing::trace!("configuration block `{}`", config.name);
            let vars = flags::compose(self.project, self.package, config, self.platform);
            text.push_str(&vars.render());
        }
    }

    fn object_lists(&self, text: &mut String) {
        text.push_str("OBJECTS := \\\n");
        for entry in sources::object_entries(self.package) {
            text.push_str(&format!("\t{} \\\n", entry));
        }
        text.push('\n');

        if self.platform.os.is_windows() {
            text.push_str("RESOURCES := \\\n");
            for entry in sources::resource_entries(self.package, self.platform) {
                text.push_str(&format!("\t{} \\\n", entry));
            }
            text.push('\n');
        }
    }

    fn main_target(&self, text: &mut String) {
        let package = self.package;
        let quiet = self.platform.quiet_prefix();
        let bundle = is_app_bundle(package.kind, self.platform.os);

        if bundle {
            text.push_str(
                "all: $(OUTDIR)/$(MACAPP)/PkgInfo $(OUTDIR)/$(MACAPP)/Info.plist \
                 $(OUTDIR)/$(MACAPP)/MacOS/$(TARGET)\n\n",
            );
            text.push_str("$(OUTDIR)/$(MACAPP)/MacOS/$(TARGET)");
        } else if package.kind == PackageKind::CxxTestGen {
            text.push_str("all");
        } else {
            text.push_str("$(OUTDIR)/$(TARGET)");
        }
        text.push_str(": $(OBJECTS) $(LDDEPS) $(RESOURCES)\n");

        match package.kind {
            PackageKind::CxxTestGen => {
                let cxx = &package.cxxtest;
                let mut command = vec![cxx.command.as_str(), "--root"];
                if !cxx.root_options.is_empty() {
                    command.push(&cxx.root_options);
                }
                text.push_str(&format!(
                    "\t@{} -o {}\n\n",
                    command.join(" "),
                    cxx.root_file
                ));
            }
            PackageKind::Run => {
                text.push_str(&format!("\t{}$(BLDCMD)\n\n", quiet));
            }
            _ => {
                if !self.platform.verbose {
                    text.push_str(&format!("\t@echo Linking {}\n", package.name));
                }
                text.push_str(&format!("\t-{}$(CMD_MKBINDIR)\n", quiet));
                text.push_str(&format!("\t-{}$(CMD_MKLIBDIR)\n", quiet));
                text.push_str(&format!("\t-{}$(CMD_MKOUTDIR)\n", quiet));
                if bundle {
                    text.push_str(&format!(
                        "\t-{}if [ ! -d $(OUTDIR)/$(MACAPP)/MacOS ]; then mkdir -p $(OUTDIR)/$(MACAPP)/MacOS; fi\n",
                        quiet
                    ));
                }
                text.push_str(&format!("\t{}$(BLDCMD)\n\n", quiet));
            }
        }

        if bundle {
            text.push_str("$(OUTDIR)/$(MACAPP)/PkgInfo:\n\n");
            text.push_str("$(OUTDIR)/$(MACAPP)/Info.plist:\n\n");
        }
    }

    fn clean_target(&self, text: &mut String) {
        let package = self.package;
        let quiet = self.platform.quiet_prefix();

        text.push_str("clean:\n");
        text.push_str(&format!("\t@echo Cleaning {}\n", package.name));
        if is_app_bundle(package.kind, self.platform.os) {
            text.push_str(&format!("\t-{}rm -rf $(OUTDIR)/$(TARGET).app $(OBJDIR)\n", quiet));
        } else if package.kind == PackageKind::CxxTestGen {
            text.push_str(&format!("\t-{}rm -f $(OBJECTS)\n", quiet));
        } else {
            text.push_str(&format!("\t-{}rm -rf $(OUTDIR)/$(TARGET) $(OBJDIR)\n", quiet));
        }
        text.push('\n');
    }

    fn file_rules(&self, text: &mut String) -> Result<(), GenerateError> {
        for source in &self.package.sources {
            if let Some(rule) = sources::compile_rule(self.package, source, self.platform)? {
                text.push_str(&rule.render(self.platform));
                text.push('\n');
            }
        }

        if self.platform.os.is_windows() {
            for source in &self.package.sources {
                if let Some(rule) = sources::resource_rule(source, self.platform) {
                    text.push_str(&rule.render(self.platform));
                    text.push('\n');
                }
            }
        }
        Ok(())
    }
}

/// Render the makefile of `package`.
pub fn render_package(
    project: &Project,
    package: &Package,
    platform: &PlatformContext,
) -> Result<String, GenerateError> {
    PackageEmitter::new(project, package, platform).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Compiler, TargetOs};
    use crate::core::project::Language;
    use crate::test_support::{linux_gcc, package, project};

    fn windows_gcc() -> PlatformContext {
        PlatformContext::new(TargetOs::Windows, Compiler::Gcc)
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_windows_executable_example() {
        let mut app = package("app", PackageKind::Exe, ".").with_sources(["a.cpp", "b.c", "x.rc"]);
        app.language = Language::Cxx;
        app.configurations.truncate(1);
        let project = project(vec![app]);

        let text = render_package(&project, &project.packages[0], &windows_gcc()).unwrap();

        assert!(text.starts_with("# C++ Console Executable Makefile autogenerated by makegen\n"));
        assert!(text.contains("OBJECTS := \\\n\t$(OBJDIR)/a.o \\\n\t$(OBJDIR)/b.o \\\n\n"));
        assert!(text.contains("RESOURCES := \\\n\t$(OBJDIR)/x.res \\\n\n"));
        assert_eq!(count(&text, "ifeq ($(CONFIG),"), 1);
        assert!(text.contains("ifeq ($(CONFIG),Debug)\n"));
        assert!(text.contains(
            "  BLDCMD = $(CXX) -o $(OUTDIR)/$(TARGET) $(OBJECTS) $(LDFLAGS) $(RESOURCES)\n"
        ));
        assert!(text.contains("  TARGET := app.exe\n"));
        assert_eq!(count(&text, "windres $< -O coff -o $@"), 1);
        assert!(text.contains("$(OBJDIR)/x.res: x.rc\n"));
    }

    #[test]
    fn test_linux_static_library_example() {
        let lib = package("core", PackageKind::Lib, ".").with_sources(["a.c", "x.rc"]);
        let project = project(vec![lib]);

        let text = render_package(&project, &project.packages[0], &linux_gcc()).unwrap();

        assert!(text.contains(
            "  BLDCMD = ar -cr $(OUTDIR)/$(TARGET) $(OBJECTS); ranlib $(OUTDIR)/$(TARGET)\n"
        ));
        assert!(!text.contains("RESOURCES :="));
        assert!(!text.contains("windres"));
        assert!(text.contains("-Xlinker --start-group"));
        assert!(text.contains("-Xlinker --end-group"));
        assert!(text.contains("$(OUTDIR)/$(TARGET): $(OBJECTS) $(LDDEPS) $(RESOURCES)\n"));
        assert!(text.ends_with("-include $(OBJECTS:%.o=%.d)\n\n"));
    }

    #[test]
    fn test_run_target_example() {
        let lib = package("libA", PackageKind::Lib, ".");
        let run = package("check", PackageKind::Run, ".").with_links(["libA"]);
        let project = project(vec![lib, run]);

        let text = render_package(&project, &project.packages[1], &linux_gcc()).unwrap();

        assert!(text.contains("  LDDEPS := ./liblibA.a\n"));
        assert!(text.contains("  BLDCMD = for a in $(LDDEPS); do echo Running $$a; $$a; done\n"));
        assert!(text.contains(
            "$(OUTDIR)/$(TARGET): $(OBJECTS) $(LDDEPS) $(RESOURCES)\n\t@$(BLDCMD)\n\n"
        ));
        assert!(!text.contains("Linking check"));
    }

    #[test]
    fn test_run_target_executes_local_sibling() {
        let tester = package("tester", PackageKind::Exe, ".");
        let run = package("check", PackageKind::Run, ".").with_links(["tester"]);
        let project = project(vec![tester, run]);

        let text = render_package(&project, &project.packages[1], &linux_gcc()).unwrap();

        assert!(text.contains("  LDDEPS := ./tester\n"));
        assert!(text.contains("  OBJDIR := obj/check/Debug\n"));
    }

    #[test]
    fn test_one_block_per_configuration_in_order() {
        let project = project(vec![package("core", PackageKind::Lib, ".")]);
        let text = render_package(&project, &project.packages[0], &linux_gcc()).unwrap();

        assert!(text.contains("ifndef CONFIG\n  CONFIG=Debug\nendif\n\n"));
        let debug = text.find("ifeq ($(CONFIG),Debug)\n").unwrap();
        let release = text.find("ifeq ($(CONFIG),Release)\n").unwrap();
        assert!(debug < release);
        assert_eq!(count(&text, "ifeq ($(CONFIG),"), 2);
        assert!(text.contains("  OBJDIR := obj/Debug\n"));
        assert!(text.contains("  OBJDIR := obj/Release\n"));
    }

    #[test]
    fn test_full_library_makefile() {
        let mut lib = package("core", PackageKind::Lib, ".").with_sources(["core.c"]);
        lib.configurations.truncate(1);
        let project = project(vec![lib]);

        let text = render_package(&project, &project.packages[0], &linux_gcc()).unwrap();
        let expected = "\
# C Static Library Makefile autogenerated by makegen
# Don't edit this file! Instead edit `Makegen.toml` then rerun `makegen generate`

ifndef CONFIG
  CONFIG=Debug
endif

ifeq ($(CONFIG),Debug)
  BINDIR := .
  LIBDIR := .
  OBJDIR := obj/Debug
  OUTDIR := .
  CPPFLAGS := -MD
  CFLAGS += $(CPPFLAGS) -g
  CXXFLAGS := $(CFLAGS)
  LDFLAGS += -L$(BINDIR) -L$(LIBDIR) -Xlinker --start-group -Xlinker --end-group
  LDDEPS :=
  TARGET := libcore.a
  BLDCMD = ar -cr $(OUTDIR)/$(TARGET) $(OBJECTS); ranlib $(OUTDIR)/$(TARGET)
endif

OBJECTS := \\
\t$(OBJDIR)/core.o \\

CMD := $(subst \\,\\\\,$(ComSpec)$(COMSPEC))
ifeq (,$(CMD))
  CMD_MKBINDIR := mkdir -p $(BINDIR)
  CMD_MKLIBDIR := mkdir -p $(LIBDIR)
  CMD_MKOUTDIR := mkdir -p $(OUTDIR)
  CMD_MKOBJDIR := mkdir -p $(OBJDIR)
else
  CMD_MKBINDIR := $(CMD) /c if not exist $(subst /,\\\\,$(BINDIR)) mkdir $(subst /,\\\\,$(BINDIR))
  CMD_MKLIBDIR := $(CMD) /c if not exist $(subst /,\\\\,$(LIBDIR)) mkdir $(subst /,\\\\,$(LIBDIR))
  CMD_MKOUTDIR := $(CMD) /c if not exist $(subst /,\\\\,$(OUTDIR)) mkdir $(subst /,\\\\,$(OUTDIR))
  CMD_MKOBJDIR := $(CMD) /c if not exist $(subst /,\\\\,$(OBJDIR)) mkdir $(subst /,\\\\,$(OBJDIR))
endif

.PHONY: clean

$(OUTDIR)/$(TARGET): $(OBJECTS) $(LDDEPS) $(RESOURCES)
\t@echo Linking core
\t-@$(CMD_MKBINDIR)
\t-@$(CMD_MKLIBDIR)
\t-@$(CMD_MKOUTDIR)
\t@$(BLDCMD)

clean:
\t@echo Cleaning core
\t-@rm -rf $(OUTDIR)/$(TARGET) $(OBJDIR)

$(OBJDIR)/core.o: core.c
\t-@$(CMD_MKOBJDIR)
\t@echo $(notdir $<)
\t@$(CC) $(CFLAGS) -MF $(OBJDIR)/core.d -o $@ -c $<

-include $(OBJECTS:%.o=%.d)

";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_macosx_windowed_executable_bundle() {
        let app = package("Viewer", PackageKind::WinExe, ".").with_sources(["main.c"]);
        let project = project(vec![app]);
        let mac = PlatformContext::new(TargetOs::Macosx, Compiler::Gcc);

        let text = render_package(&project, &project.packages[0], &mac).unwrap();

        assert!(text.contains("  MACAPP := Viewer.app/Contents\n"));
        assert!(text.contains(
            "all: $(OUTDIR)/$(MACAPP)/PkgInfo $(OUTDIR)/$(MACAPP)/Info.plist $(OUTDIR)/$(MACAPP)/MacOS/$(TARGET)\n\n"
        ));
        assert!(text.contains("$(OUTDIR)/$(MACAPP)/MacOS/$(TARGET): $(OBJECTS) $(LDDEPS) $(RESOURCES)\n"));
        assert!(text.contains("then mkdir -p $(OUTDIR)/$(MACAPP)/MacOS; fi\n"));
        assert!(text.contains("$(OUTDIR)/$(MACAPP)/PkgInfo:\n\n$(OUTDIR)/$(MACAPP)/Info.plist:\n\n"));
        assert!(text.contains("\t-@rm -rf $(OUTDIR)/$(TARGET).app $(OBJDIR)\n"));
        assert!(!text.contains("--start-group"));
    }

    #[test]
    fn test_test_generator_makefile() {
        let mut suite = package("suite", PackageKind::CxxTestGen, ".")
            .with_sources(["tests/A.h", "tests/B.h", "tests/helper.cpp"]);
        suite.language = Language::Cxx;
        suite.cxxtest.root_options = "--error-printer".to_string();
        let project = project(vec![suite]);

        let text = render_package(&project, &project.packages[0], &linux_gcc()).unwrap();

        assert!(text.contains("  TARGET := $(OBJECTS)\n"));
        assert!(text.contains("OBJECTS := \\\n\ttests/A.cpp \\\n\ttests/B.cpp \\\n\n"));
        assert!(text.contains(
            "all: $(OBJECTS) $(LDDEPS) $(RESOURCES)\n\t@cxxtestgen.py --root --error-printer -o suite_runner.cpp\n\n"
        ));
        assert!(text.contains("\t-@rm -f $(OBJECTS)\n"));
        assert!(text.contains("tests/A.cpp: tests/A.h\n"));
        assert!(!text.contains("-include"));
        assert!(!text.contains("helper"));
    }

    #[test]
    fn test_verbose_makefile_has_no_echo_suppression() {
        let lib = package("core", PackageKind::Lib, ".").with_sources(["core.c"]);
        let project = project(vec![lib]);
        let verbose = linux_gcc().with_verbose(true);

        let text = render_package(&project, &project.packages[0], &verbose).unwrap();

        assert!(!text.contains("\t@$("));
        assert!(!text.contains("-@"));
        assert!(!text.contains("Linking core"));
        assert!(!text.contains("@echo $(notdir $<)"));
        assert!(text.contains("\t$(CC) $(CFLAGS) -MF $(OBJDIR)/core.d -o $@ -c $<\n"));
        assert!(text.contains("\t-rm -rf $(OUTDIR)/$(TARGET) $(OBJDIR)\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let app = package("app", PackageKind::Exe, "app")
            .with_sources(["main.c", "util.cpp"])
            .with_links(["core", "z"]);
        let project = project(vec![package("core", PackageKind::Lib, "core"), app]);

        let first = render_package(&project, &project.packages[1], &linux_gcc()).unwrap();
        let second = render_package(&project, &project.packages[1], &linux_gcc()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_unsupported_source_aborts() {
        let app = package("app", PackageKind::Exe, ".").with_sources(["boot.s"]);
        let project = project(vec![app]);
        let dmc = PlatformContext::new(TargetOs::Windows, Compiler::Dmc);

        let err = render_package(&project, &project.packages[0], &dmc).unwrap_err();
        assert!(err.to_string().contains("boot.s"));
    }

    #[test]
    fn test_sink_failure_is_reported() {
        struct FailingSink;
        impl Write for FailingSink {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let project = project(vec![package("core", PackageKind::Lib, ".")]);
        let platform = linux_gcc();
        let emitter = PackageEmitter::new(&project, &project.packages[0], &platform);
        let err = emitter.emit(&mut FailingSink).unwrap_err();
        assert!(matches!(err, GenerateError::Sink { .. }));
    }

    #[test]
    fn test_no_configurations_is_an_error() {
        let mut lib = package("core", PackageKind::Lib, ".");
        lib.configurations.clear();
        let project = project(vec![lib]);
        let err = render_package(&project, &project.packages[0], &linux_gcc()).unwrap_err();
        assert!(matches!(err, GenerateError::NoConfigurations { .. }));
    }
}
