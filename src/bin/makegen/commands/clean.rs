//! `makegen clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use makegen::ops::{clean, CleanOptions};

pub fn execute(args: CleanArgs) -> Result<()> {
    let removed = clean(&CleanOptions {
        manifest: args.manifest,
    })?;

    if removed.is_empty() {
        eprintln!("     Nothing to clean");
    }
    for path in &removed {
        eprintln!("     Removed {}", path.display());
    }

    Ok(())
}
