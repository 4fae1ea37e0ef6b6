//! CLI command definitions for the `skillrt` binary.
//!
//! Uses clap derive macros for argument parsing. Every command except
//! `completions` runs against a freshly scanned registry.

pub mod prompt;
pub mod skill;
pub mod tool;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use skillrt_types::skill::SkillKind;

/// Discover, activate, and use agent skills.
#[derive(Parser)]
#[command(name = "skillrt", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List indexed skills.
    #[command(alias = "ls")]
    List {
        /// Only show skills of this type.
        #[arg(long = "type", value_parser = parse_kind)]
        kind: Option<SkillKind>,

        /// Only show skills whose name starts with this prefix.
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Show one skill's metadata and instructions.
    Show {
        /// Skill name or `type:name`.
        name: String,
    },

    /// Print the skills prompt block.
    Prompt {
        /// Skills to render as active, in order.
        #[arg(long, value_delimiter = ',')]
        active: Vec<String>,

        /// Omit skill locations.
        #[arg(long)]
        tool_only: bool,
    },

    /// Read a resource file from a skill.
    Read {
        /// Skill name or `type:name`.
        skill: String,

        /// Path relative to the skill root.
        path: String,
    },

    /// Run a script from a skill's `scripts/` directory.
    Run {
        /// Skill name or `type:name`.
        skill: String,

        /// Script path relative to the skill root.
        path: String,

        /// Timeout in milliseconds (clamped to the configured maximum).
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Arguments passed to the script.
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Rescan skill sources and print presence.
    Check,

    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn parse_kind(s: &str) -> Result<SkillKind, String> {
    s.parse()
}
