//! lifelog CLI - Fetch, tag and export lifelog transcripts
//!
//! Usage:
//!   lifelog list              - Show recent lifelogs
//!   lifelog export --id <ID>  - Export one lifelog
//!   lifelog export --all      - Export everything not yet on disk

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("lifelog={}", log_level).parse()?)
                .add_directive(format!("lifelog_export={}", log_level).parse()?),
        )
        .with_target(false)
        .init();

    let settings = cli::commands::Settings::load(cli.config.as_deref(), cli.api_key)?;

    match cli.command {
        Commands::List {
            date,
            start,
            end,
            limit,
            timezone,
        } => cli::commands::list(&settings, date, start, end, limit, timezone),
        Commands::Export {
            id,
            all: _,
            repull,
            format,
            layout,
            dir,
            page_size,
        } => {
            let args = cli::commands::ExportArgs {
                id,
                repull,
                format,
                layout,
                dir,
                page_size,
            };
            cli::commands::export(&settings, args)
        }
    }
}
