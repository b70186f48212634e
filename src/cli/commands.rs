//! Command implementations for the lifelog CLI.
//!
//! Main commands:
//! - list: Print one line per lifelog for a day or range
//! - export: Write one or all lifelogs to the output directory

use anyhow::{bail, Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use lifelog_export::config::default_config_path;
use lifelog_export::export::ExportOutcome;
use lifelog_export::{
    Config, ExportEvent, ExportFormat, ExportLayout, ExportOptions, Exporter, LifelogClient,
    LifelogSource, ListQuery,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Config file plus the API key given on the command line or environment.
pub struct Settings {
    pub config: Config,
    pub api_key: Option<String>,
}

impl Settings {
    pub fn load(config_path: Option<&Path>, api_key: Option<String>) -> Result<Self> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);

        // An explicitly named config file must exist
        let config = if config_path.is_some() {
            Config::load(&path)?
        } else {
            Config::load_or_default(&path)?
        };
        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(Self { config, api_key })
    }

    fn client(&self) -> Result<LifelogClient> {
        let api_key = self.config.resolve_api_key(self.api_key.as_deref())?;
        let client = LifelogClient::with_options(
            &api_key,
            &self.config.api.base_url,
            self.config.api.timeout(),
        )?;
        Ok(client)
    }
}

/// Flags of the export command.
pub struct ExportArgs {
    pub id: Option<String>,
    pub repull: bool,
    pub format: Option<ExportFormat>,
    pub layout: Option<ExportLayout>,
    pub dir: Option<PathBuf>,
    pub page_size: Option<i32>,
}

// ============ LIST COMMAND ============

pub fn list(
    settings: &Settings,
    date: Option<String>,
    start: Option<String>,
    end: Option<String>,
    limit: i32,
    timezone: Option<String>,
) -> Result<()> {
    let client = settings.client()?;

    let query = ListQuery {
        limit,
        cursor: None,
        date,
        start,
        end,
        timezone: settings.config.resolve_timezone(timezone.as_deref()),
    };

    let page = client
        .list_lifelogs(&query)
        .context("Cannot list lifelogs")?;

    if page.lifelogs.is_empty() {
        println!("{}", "No lifelogs found.".yellow());
        return Ok(());
    }

    for log in &page.lifelogs {
        println!(
            "[{}] {} {}",
            log.start_time.dimmed(),
            log.title.white().bold(),
            format!("(ID: {})", log.id).dimmed()
        );
    }

    if let Some(cursor) = &page.next_cursor {
        tracing::debug!(cursor = %cursor, "More lifelogs available");
    }

    Ok(())
}

// ============ EXPORT COMMAND ============

pub fn export(settings: &Settings, args: ExportArgs) -> Result<()> {
    let config = &settings.config;

    // Resolve everything before the first request
    let client = settings.client()?;
    let destination = config.resolve_export_dir(args.dir.as_deref())?;

    let cancel = Arc::new(AtomicBool::new(false));
    let options = ExportOptions {
        force: args.repull,
        format: args.format.unwrap_or(config.export.format),
        layout: args.layout.unwrap_or(config.export.layout),
        page_size: args.page_size.unwrap_or(config.export.page_size),
        timezone: config.resolve_timezone(None),
        cancel: Some(Arc::clone(&cancel)),
        ..ExportOptions::default()
    };

    let exporter = Exporter::new(&client, &destination, options);

    match args.id {
        Some(id) => export_one(&exporter, &id),
        None => export_all(&exporter, cancel),
    }
}

fn export_one(exporter: &Exporter<'_>, id: &str) -> Result<()> {
    match exporter
        .export_one(id)
        .with_context(|| format!("Cannot export lifelog {}", id))?
    {
        ExportOutcome::Written(paths) => {
            println!("{} Saved lifelog {}", "✓".green(), id.cyan());
            for path in paths {
                println!("  {}", path.display().to_string().dimmed());
            }
        }
        ExportOutcome::Skipped => {
            println!(
                "{} Lifelog {} already exported (use {} to overwrite)",
                "•".yellow(),
                id.cyan(),
                "--repull".cyan()
            );
        }
    }
    Ok(())
}

fn export_all(exporter: &Exporter<'_>, cancel: Arc<AtomicBool>) -> Result<()> {
    println!("{}", "Exporting lifelogs".bold().cyan());
    println!(
        "  Destination: {}",
        exporter.destination().display().to_string().dimmed()
    );
    println!();

    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("Cannot install Ctrl+C handler")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("  {spinner:.cyan} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let mut written = 0usize;
    let result = exporter.export_all_with(|event| match event {
        ExportEvent::PageFetched { page, records } => {
            pb.set_message(format!("Page {} ({} lifelogs)", page, records));
        }
        ExportEvent::Written { id, .. } => {
            written += 1;
            pb.set_message(format!("Saved {} ({} new)", id, written));
        }
        ExportEvent::Skipped { id } => {
            pb.set_message(format!("Skipped {}", id));
        }
        ExportEvent::Failed { id, .. } => {
            pb.set_message(format!("Failed {}", id));
        }
    });
    pb.finish_and_clear();

    let report = result.context("Export aborted")?;

    println!("{}", "Export summary".bold());
    println!("  Pages:   {}", report.pages);
    println!("  Written: {}", report.written.to_string().green());
    println!("  Skipped: {}", report.skipped.to_string().yellow());
    println!("  Failed:  {}", report.failures.len().to_string().red());

    for (id, error) in &report.failures {
        println!("  {} {}: {}", "✗".red(), id.cyan(), error);
    }

    if report.cancelled {
        println!();
        println!("{}", "Export cancelled. Run again to continue.".yellow());
    }

    if !report.failures.is_empty() {
        bail!("{} lifelog(s) failed to export", report.failures.len());
    }

    Ok(())
}
