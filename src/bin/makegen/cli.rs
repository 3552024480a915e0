//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use makegen::core::platform::{Compiler, TargetOs};
use makegen::ops::PlatformRequest;

/// makegen - GNU make makefile generator for C and C++ projects
#[derive(Parser)]
#[command(name = "makegen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write makefiles for every package in Makegen.toml
    Generate(GenerateArgs),

    /// Show how a package's link references resolve
    Linkplan(LinkplanArgs),

    /// Remove generated makefiles
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Platform selection shared by commands that render make text.
#[derive(Args)]
pub struct PlatformArgs {
    /// Target operating system (defaults to the host)
    #[arg(long, value_enum, env = "MAKEGEN_OS")]
    pub os: Option<TargetOs>,

    /// Compiler family
    #[arg(long, value_enum, env = "MAKEGEN_CC")]
    pub cc: Option<Compiler>,
}

impl PlatformArgs {
    pub fn request(&self, verbose: Option<bool>) -> PlatformRequest {
        PlatformRequest {
            os: self.os,
            cc: self.cc,
            verbose,
        }
    }
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Emit makefiles that echo every command
    #[arg(long)]
    pub verbose_makefiles: bool,

    /// Path to Makegen.toml (searched upward by default)
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Render makefiles without writing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct LinkplanArgs {
    /// Package to show the link plan for
    pub package: String,

    /// Configuration name (defaults to the first declared)
    #[arg(long)]
    pub config: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub platform: PlatformArgs,

    /// Path to Makegen.toml (searched upward by default)
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Path to Makegen.toml (searched upward by default)
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
