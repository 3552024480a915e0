//! `makegen linkplan` command

use anyhow::Result;

use crate::cli::LinkplanArgs;
use makegen::ops::{linkplan, LinkplanOptions};

pub fn execute(args: LinkplanArgs) -> Result<()> {
    let plan = linkplan(&LinkplanOptions {
        package: args.package,
        config: args.config,
        platform: args.platform.request(None),
        manifest: args.manifest,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print!("{}", plan.render());
    }

    Ok(())
}
