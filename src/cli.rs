//! Command line interface definition for git-gauge.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "git-gauge")]
#[command(about = "AI-assisted commit quality analysis for git repositories")]
#[command(version)]
pub struct Cli {
    /// Repository working directory
    #[arg(long, global = true, default_value = ".")]
    pub repo: String,

    /// Repository identifier used for caching (default: derived from the path)
    #[arg(long, global = true)]
    pub repo_id: Option<String>,

    /// Model to use for AI analysis
    #[arg(long, global = true, env = "GIT_GAUGE_LLM_MODEL")]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze commit quality over a recent window
    Analyze {
        /// How many days of history to analyze
        #[arg(long, default_value_t = 30)]
        days: i64,

        /// Recompute even when a fresh cached result exists
        #[arg(long)]
        force_refresh: bool,

        /// Skip the per-commit diff review (message analysis only)
        #[arg(long)]
        basic: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Report the quality trend over persisted history
    Trends {
        /// History window in days
        #[arg(long, default_value_t = 30)]
        days: i64,

        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print the cache key the current request would use
    CacheKey {
        /// History window in days
        #[arg(long, default_value_t = 30)]
        days: i64,
    },

    /// Delete cached analyses older than a cutoff
    Prune {
        /// Age cutoff in days
        #[arg(long, default_value_t = 30)]
        older_than_days: i64,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output.
    Pretty,
    /// JSON output.
    Json,
}
