//! Clap derive structures for the `restsync` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// restsync -- keep REST API objects in line with declared JSON
#[derive(Debug, Parser)]
#[command(
    name = "restsync",
    version,
    about = "Declaratively sync JSON documents with REST API objects",
    long_about = "Reads a manifest describing a REST API client and the objects it manages,\n\
        compares each declared JSON document with what the server holds, and\n\
        creates, updates or deletes objects to match.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Manifest file (defaults to restsync.toml in the config directory)
    #[arg(long, short = 'm', env = "RESTSYNC_MANIFEST", global = true)]
    pub manifest: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "RESTSYNC_OUTPUT",
        default_value = "json",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates (overrides the manifest)
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Dump every request and response
    #[arg(long, global = true)]
    pub debug: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show what apply would do for an object
    Plan(PlanArgs),

    /// Create or update an object to match its declaration
    Apply(ObjectArgs),

    /// Read an object and print its state
    Get(ObjectArgs),

    /// Delete an object
    #[command(alias = "delete")]
    Destroy(ObjectArgs),

    /// Check connectivity using the client's test path
    Probe,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ObjectArgs {
    /// Object name from the manifest's [objects] tables
    pub object: String,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub target: ObjectArgs,

    /// Exit with a non-zero status when the object would change
    #[arg(long)]
    pub fail_on_drift: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
