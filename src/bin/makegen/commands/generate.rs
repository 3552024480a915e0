//! `makegen generate` command

use anyhow::Result;

use crate::cli::GenerateArgs;
use makegen::ops::{generate, GenerateOptions};

pub fn execute(args: GenerateArgs) -> Result<()> {
    // Only an explicit flag overrides the manifest's `verbose`.
    let verbose = args.verbose_makefiles.then_some(true);
    let opts = GenerateOptions {
        platform: args.platform.request(verbose),
        manifest: args.manifest,
        dry_run: args.dry_run,
    };

    let result = generate(&opts)?;
    let platform = result.platform;

    let verb = if opts.dry_run { "Would write" } else { "Wrote" };
    let mut changed = 0;
    for file in &result.files {
        if file.changed {
            changed += 1;
            eprintln!("{:>12} {}", verb, file.path.display());
        }
    }

    eprintln!(
        "    Finished {} of {} makefiles changed (os: {}, cc: {})",
        changed,
        result.files.len(),
        platform.os,
        platform.compiler
    );

    Ok(())
}
