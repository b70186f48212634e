//! CLI definitions and command implementations for lifelog.

pub mod commands;

use clap::{ArgGroup, Parser, Subcommand};
use lifelog_export::config::API_KEY_ENV;
use lifelog_export::{ExportFormat, ExportLayout};
use std::path::PathBuf;

/// lifelog - Fetch, tag and export your lifelog transcripts
#[derive(Parser)]
#[command(name = "lifelog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: <config dir>/lifelog/lifelog.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API key (overrides api_key in the config file)
    #[arg(long, global = true, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List lifelogs for a day or a time range
    List {
        /// Single day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Range start (ISO 8601)
        #[arg(long)]
        start: Option<String>,

        /// Range end (ISO 8601)
        #[arg(long)]
        end: Option<String>,

        /// Maximum number of lifelogs to show (0 lets the API decide)
        #[arg(short, long, default_value = "5")]
        limit: i32,

        /// IANA timezone, e.g. America/Los_Angeles
        #[arg(long)]
        timezone: Option<String>,
    },

    /// Export one lifelog or all of them to disk
    #[command(group(
        ArgGroup::new("selection")
            .required(true)
            .args(["id", "all"]),
    ))]
    Export {
        /// Lifelog ID to export
        #[arg(long)]
        id: Option<String>,

        /// Export every lifelog the API lists
        #[arg(long)]
        all: bool,

        /// Fetch again and overwrite lifelogs that are already on disk
        #[arg(long)]
        repull: bool,

        /// Output format (default from config, else json)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Directory layout (default from config, else flat)
        #[arg(long, value_enum)]
        layout: Option<ExportLayout>,

        /// Output directory (default from config)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Records per page with --all (default from config, else 50)
        #[arg(long)]
        page_size: Option<i32>,
    },
}
