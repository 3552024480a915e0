//! Source classification and per-file build rules.
//!
//! Every source whose kind compiles to an object gets exactly one static
//! rule. Listing each file explicitly, rather than using a wildcard pattern
//! rule, keeps the output testable and avoids `VPATH`.

use crate::core::platform::{Compiler, PlatformContext};
use crate::core::project::{Package, PackageKind, SourceFile, SourceKind};
use crate::generator::error::GenerateError;
use crate::util::paths;

/// One explicit make rule producing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRule {
    pub output: String,
    pub input: String,
    /// Create `$(OBJDIR)` before running the recipe.
    pub make_obj_dir: bool,
    pub commands: Vec<String>,
}

impl FileRule {
    /// Render the rule. The caller separates consecutive rules.
    pub fn render(&self, platform: &PlatformContext) -> String {
        let quiet = platform.quiet_prefix();
        let mut out = format!("{}: {}\n", self.output, self.input);
        if self.make_obj_dir {
            out.push_str(&format!("\t-{}$(CMD_MKOBJDIR)\n", quiet));
        }
        if !platform.verbose {
            out.push_str("\t@echo $(notdir $<)\n");
        }
        for command in &self.commands {
            out.push_str(&format!("\t{}{}\n", quiet, command));
        }
        out
    }
}

/// Whether `source` takes part in the build of `package`.
fn participates(package: &Package, kind: SourceKind) -> bool {
    match package.kind {
        PackageKind::CxxTestGen => kind == SourceKind::Header,
        _ => kind.is_compiled(),
    }
}

/// Object list entry for `source`, or `None` when it is not compiled.
///
/// Test generator packages list the generated `.cpp` next to each header
/// instead of an object file.
pub fn object_entry(package: &Package, source: &SourceFile) -> Option<String> {
    let kind = source.kind();
    if !participates(package, kind) {
        return None;
    }
    if package.kind == PackageKind::CxxTestGen {
        Some(paths::with_extension(&source.path, ".cpp"))
    } else {
        Some(format!("$(OBJDIR)/{}.o", source.stem()))
    }
}

/// Resource list entry for `source` (Windows only).
pub fn resource_entry(source: &SourceFile, platform: &PlatformContext) -> Option<String> {
    (platform.os.is_windows() && source.kind() == SourceKind::Resource)
        .then(|| format!("$(OBJDIR)/{}.res", source.stem()))
}

/// All object list entries of a package, in source order.
pub fn object_entries(package: &Package) -> impl Iterator<Item = String> + '_ {
    package.sources.iter().filter_map(move |s| object_entry(package, s))
}

/// All resource list entries of a package, in source order.
pub fn resource_entries<'a>(
    package: &'a Package,
    platform: &'a PlatformContext,
) -> impl Iterator<Item = String> + 'a {
    package.sources.iter().filter_map(move |s| resource_entry(s, platform))
}

/// Build rule for one source, or `None` when the file is not compiled.
pub fn compile_rule(
    package: &Package,
    source: &SourceFile,
    platform: &PlatformContext,
) -> Result<Option<FileRule>, GenerateError> {
    let kind = source.kind();
    if !participates(package, kind) {
        return Ok(None);
    }

    if package.kind == PackageKind::CxxTestGen {
        return Ok(Some(generator_rule(package, source)));
    }

    let stem = source.stem();
    let commands = match (kind, platform.compiler) {
        (SourceKind::C, Compiler::Gcc) => vec![format!(
            "$(CC) $(CFLAGS) -MF $(OBJDIR)/{}.d -o $@ -c $<",
            stem
        )],
        (SourceKind::Cxx, Compiler::Gcc) => vec![format!(
            "$(CXX) $(CXXFLAGS) -MF $(OBJDIR)/{}.d -o $@ -c $<",
            stem
        )],
        (SourceKind::Assembly, Compiler::Gcc) => {
            vec!["$(CC) -x assembler-with-cpp $(CPPFLAGS) -o $@ -c $<".to_string()]
        }
        (SourceKind::C, Compiler::Dmc) => vec!["dmc $(CFLAGS) -o $@ -c $<".to_string()],
        (SourceKind::Cxx, Compiler::Dmc) => {
            vec!["dmc -cpp -Ae -Ar -mn $(CXXFLAGS) -o $@ -c $<".to_string()]
        }
        (SourceKind::Assembly, Compiler::Dmc) => {
            return Err(GenerateError::UnsupportedSource {
                package: package.name.clone(),
                source_path: source.path.clone(),
                compiler: platform.compiler,
            });
        }
        (SourceKind::Nasm, _) => nasm_commands(source, platform),
        _ => return Ok(None),
    };

    Ok(Some(FileRule {
        output: format!("$(OBJDIR)/{}.o", stem),
        input: source.path.clone(),
        make_obj_dir: true,
        commands,
    }))
}

/// Resource compiler rule for one source (Windows only).
pub fn resource_rule(source: &SourceFile, platform: &PlatformContext) -> Option<FileRule> {
    let output = resource_entry(source, platform)?;
    Some(FileRule {
        output,
        input: source.path.clone(),
        make_obj_dir: true,
        commands: vec!["windres $< -O coff -o $@".to_string()],
    })
}

/// Assemble step plus a separate dependency listing step.
fn nasm_commands(source: &SourceFile, platform: &PlatformContext) -> Vec<String> {
    let mut base = String::from("nasm ");
    if !platform.os.is_windows() {
        base.push_str("-dDONT_USE_UNDERLINE=1 ");
    }
    base.push_str(&format!("-i{}/", paths::parent(&source.path)));

    vec![
        format!("{} -f elf -o $@ $<", base),
        format!("{} -M -o $@ $< >$(OBJDIR)/{}.d", base, source.stem()),
    ]
}

/// Generate a test part source from a header.
fn generator_rule(package: &Package, source: &SourceFile) -> FileRule {
    let output = paths::with_extension(&source.path, ".cpp");
    let cxx = &package.cxxtest;
    let mut command = vec![cxx.command.as_str(), "--part"];
    if !cxx.options.is_empty() {
        command.push(&cxx.options);
    }
    let command = format!("{} -o {} {}", command.join(" "), output, source.path);

    FileRule {
        output,
        input: source.path.clone(),
        make_obj_dir: false,
        commands: vec![command],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::TargetOs;
    use crate::test_support::{linux_gcc, package};

    fn windows_gcc() -> PlatformContext {
        PlatformContext::new(TargetOs::Windows, Compiler::Gcc)
    }

    #[test]
    fn test_object_entries_skip_headers_and_unknown_files() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources([
            "src/a.cpp",
            "src/b.c",
            "src/c.s",
            "src/d.asm",
            "src/a.h",
            "res/x.rc",
            "README.md",
        ]);

        let entries: Vec<_> = object_entries(&pkg).collect();
        assert_eq!(
            entries,
            vec![
                "$(OBJDIR)/a.o",
                "$(OBJDIR)/b.o",
                "$(OBJDIR)/c.o",
                "$(OBJDIR)/d.o"
            ]
        );
    }

    #[test]
    fn test_resources_only_on_windows() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["a.c", "res/x.rc"]);

        let on_windows: Vec<_> = resource_entries(&pkg, &windows_gcc()).collect();
        assert_eq!(on_windows, vec!["$(OBJDIR)/x.res"]);

        let on_linux: Vec<_> = resource_entries(&pkg, &linux_gcc()).collect();
        assert!(on_linux.is_empty());
        assert!(resource_rule(&pkg.sources[1], &linux_gcc()).is_none());
    }

    #[test]
    fn test_gcc_cxx_rule() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["src/main.cpp"]);
        let rule = compile_rule(&pkg, &pkg.sources[0], &linux_gcc()).unwrap().unwrap();

        assert_eq!(
            rule.render(&linux_gcc()),
            "$(OBJDIR)/main.o: src/main.cpp\n\
             \t-@$(CMD_MKOBJDIR)\n\
             \t@echo $(notdir $<)\n\
             \t@$(CXX) $(CXXFLAGS) -MF $(OBJDIR)/main.d -o $@ -c $<\n"
        );
    }

    #[test]
    fn test_verbose_rule_keeps_commands_visible() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["util.c"]);
        let verbose = linux_gcc().with_verbose(true);
        let rule = compile_rule(&pkg, &pkg.sources[0], &verbose).unwrap().unwrap();

        assert_eq!(
            rule.render(&verbose),
            "$(OBJDIR)/util.o: util.c\n\
             \t-$(CMD_MKOBJDIR)\n\
             \t$(CC) $(CFLAGS) -MF $(OBJDIR)/util.d -o $@ -c $<\n"
        );
    }

    #[test]
    fn test_assembly_rule() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["boot.s"]);
        let rule = compile_rule(&pkg, &pkg.sources[0], &linux_gcc()).unwrap().unwrap();
        assert_eq!(
            rule.commands,
            vec!["$(CC) -x assembler-with-cpp $(CPPFLAGS) -o $@ -c $<"]
        );
    }

    #[test]
    fn test_dmc_rules() {
        let dmc = PlatformContext::new(TargetOs::Windows, Compiler::Dmc);
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["a.c", "b.cpp", "c.s"]);

        let c = compile_rule(&pkg, &pkg.sources[0], &dmc).unwrap().unwrap();
        assert_eq!(c.commands, vec!["dmc $(CFLAGS) -o $@ -c $<"]);

        let cxx = compile_rule(&pkg, &pkg.sources[1], &dmc).unwrap().unwrap();
        assert_eq!(cxx.commands, vec!["dmc -cpp -Ae -Ar -mn $(CXXFLAGS) -o $@ -c $<"]);

        let err = compile_rule(&pkg, &pkg.sources[2], &dmc).unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedSource { .. }));
    }

    #[test]
    fn test_nasm_rule_defines_underline_macro_off_windows() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["asm/fast.asm"]);

        let rule = compile_rule(&pkg, &pkg.sources[0], &linux_gcc()).unwrap().unwrap();
        assert_eq!(
            rule.commands,
            vec![
                "nasm -dDONT_USE_UNDERLINE=1 -iasm/ -f elf -o $@ $<",
                "nasm -dDONT_USE_UNDERLINE=1 -iasm/ -M -o $@ $< >$(OBJDIR)/fast.d",
            ]
        );

        let rule = compile_rule(&pkg, &pkg.sources[0], &windows_gcc()).unwrap().unwrap();
        assert_eq!(rule.commands[0], "nasm -iasm/ -f elf -o $@ $<");
    }

    #[test]
    fn test_resource_rule() {
        let pkg = package("app", PackageKind::Exe, ".").with_sources(["res/app.rc"]);
        let rule = resource_rule(&pkg.sources[0], &windows_gcc()).unwrap();
        assert_eq!(
            rule.render(&windows_gcc()),
            "$(OBJDIR)/app.res: res/app.rc\n\
             \t-@$(CMD_MKOBJDIR)\n\
             \t@echo $(notdir $<)\n\
             \t@windres $< -O coff -o $@\n"
        );
        assert!(compile_rule(&pkg, &pkg.sources[0], &windows_gcc()).unwrap().is_none());
    }

    #[test]
    fn test_test_generator_uses_headers_only() {
        let mut pkg = package("suite", PackageKind::CxxTestGen, ".")
            .with_sources(["tests/Foo.h", "tests/main.cpp", "notes.txt"]);
        pkg.cxxtest.options = "--have-eh".to_string();

        let entries: Vec<_> = object_entries(&pkg).collect();
        assert_eq!(entries, vec!["tests/Foo.cpp"]);

        let rule = compile_rule(&pkg, &pkg.sources[0], &linux_gcc()).unwrap().unwrap();
        assert_eq!(
            rule.render(&linux_gcc()),
            "tests/Foo.cpp: tests/Foo.h\n\
             \t@echo $(notdir $<)\n\
             \t@cxxtestgen.py --part --have-eh -o tests/Foo.cpp tests/Foo.h\n"
        );
        assert!(compile_rule(&pkg, &pkg.sources[1], &linux_gcc()).unwrap().is_none());
    }

    #[test]
    fn test_every_compiled_source_yields_one_rule() {
        let pkg = package("app", PackageKind::Lib, ".")
            .with_sources(["a.c", "b.cpp", "c.s", "d.asm", "e.h", "f.rc", "g.txt"]);
        let rules = pkg
            .sources
            .iter()
            .filter_map(|s| compile_rule(&pkg, s, &linux_gcc()).unwrap())
            .count();
        assert_eq!(rules, object_entries(&pkg).count());
    }
}
