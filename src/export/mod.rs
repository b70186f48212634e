//! Export pipeline - Pull lifelogs page by page, tag them and write them to disk.
//!
//! Pipeline per run:
//! 1. Scan the destination for already exported IDs
//! 2. Walk the cursor chain of the listing endpoint
//! 3. For each record not yet exported: fetch, enrich, write
//!
//! A failing record is logged and collected in the report; only listing
//! failures, configuration errors and runaway pagination abort the run.

pub mod index;
pub mod writer;

pub use index::ExportIndex;
pub use writer::{ExportFormat, ExportLayout, ExportMeta, ExportTarget, ExportWriter, WriteOutcome};

use crate::client::LifelogSource;
use crate::error::{LifelogError, Result};
use crate::model::ListQuery;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Records requested per page during a full export.
pub const DEFAULT_PAGE_SIZE: i32 = 50;

/// Pages fetched before a run is considered a pagination loop.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Pause between page fetches, to stay under the API rate limit.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(250);

/// Options for an export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Re-fetch and overwrite records that were already exported
    pub force: bool,
    pub format: ExportFormat,
    pub layout: ExportLayout,
    pub page_size: i32,
    pub max_pages: usize,
    pub page_delay: Duration,
    /// Timezone passed to the listing endpoint
    pub timezone: Option<String>,
    /// Checked between records and between pages
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            force: false,
            format: ExportFormat::default(),
            layout: ExportLayout::default(),
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: DEFAULT_PAGE_DELAY,
            timezone: None,
            cancel: None,
        }
    }
}

/// Result of exporting a single lifelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Files written
    Written(Vec<PathBuf>),
    /// Already exported; nothing was fetched
    Skipped,
}

/// Progress notifications emitted during a full export.
#[derive(Debug)]
pub enum ExportEvent<'a> {
    PageFetched { page: usize, records: usize },
    Written { id: &'a str, paths: &'a [PathBuf] },
    Skipped { id: &'a str },
    Failed { id: &'a str, error: &'a LifelogError },
}

/// Summary of a full export.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Pages fetched
    pub pages: usize,
    /// Records written this run
    pub written: usize,
    /// Records skipped because they were already exported
    pub skipped: usize,
    /// Records that failed, with the error for each
    pub failures: Vec<(String, LifelogError)>,
    /// Whether the run stopped early on request
    pub cancelled: bool,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }
}

/// Drives single and full exports against a [`LifelogSource`].
pub struct Exporter<'a> {
    source: &'a dyn LifelogSource,
    writer: ExportWriter,
    options: ExportOptions,
}

impl<'a> Exporter<'a> {
    pub fn new(
        source: &'a dyn LifelogSource,
        destination: impl Into<PathBuf>,
        options: ExportOptions,
    ) -> Self {
        let writer = ExportWriter::new(destination, options.format, options.layout);
        Self {
            source,
            writer,
            options,
        }
    }

    pub fn destination(&self) -> &Path {
        self.writer.destination()
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export one lifelog by ID.
    ///
    /// Skips without fetching when the ID is already exported, unless
    /// `force` is set. Every error is returned to the caller.
    pub fn export_one(&self, id: &str) -> Result<ExportOutcome> {
        if !self.options.force && ExportIndex::scan(self.destination())?.contains(id) {
            debug!(id, "Lifelog already exported, skipping");
            return Ok(ExportOutcome::Skipped);
        }

        match self.pull(id)? {
            WriteOutcome::Written(paths) => {
                info!(id, "Saved lifelog");
                Ok(ExportOutcome::Written(paths))
            }
            WriteOutcome::Skipped(_) => Ok(ExportOutcome::Skipped),
        }
    }

    /// Export every lifelog the API lists.
    pub fn export_all(&self) -> Result<ExportReport> {
        self.export_all_with(|_| {})
    }

    /// Export every lifelog, reporting progress through `on_event`.
    pub fn export_all_with<F>(&self, mut on_event: F) -> Result<ExportReport>
    where
        F: FnMut(ExportEvent<'_>),
    {
        // With force, everything is re-pulled; the index then only guards
        // against records listed twice within this run.
        let mut exported = if self.options.force {
            ExportIndex::default()
        } else {
            ExportIndex::scan(self.destination())?
        };

        let mut report = ExportReport::default();
        let mut cursor: Option<String> = None;
        let mut followed: HashSet<String> = HashSet::new();

        'pages: loop {
            if self.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if report.pages >= self.options.max_pages {
                return Err(LifelogError::PaginationLoop {
                    pages: report.pages,
                    cursor,
                });
            }

            if report.pages > 0 && !self.options.page_delay.is_zero() {
                std::thread::sleep(self.options.page_delay);
            }

            let query = ListQuery::new(self.options.page_size)
                .with_cursor(cursor.clone())
                .with_timezone(self.options.timezone.clone());
            let page = self.source.list_lifelogs(&query)?;
            report.pages += 1;
            on_event(ExportEvent::PageFetched {
                page: report.pages,
                records: page.lifelogs.len(),
            });

            for lifelog in &page.lifelogs {
                if self.is_cancelled() {
                    report.cancelled = true;
                    break 'pages;
                }

                let id = lifelog.id.as_str();
                if exported.contains(id) {
                    debug!(id, "Lifelog already exported, skipping");
                    report.skipped += 1;
                    on_event(ExportEvent::Skipped { id });
                    continue;
                }

                match self.pull(id) {
                    Ok(WriteOutcome::Written(paths)) => {
                        exported.insert(id);
                        report.written += 1;
                        info!(id, "Saved lifelog");
                        on_event(ExportEvent::Written { id, paths: &paths });
                    }
                    Ok(WriteOutcome::Skipped(_)) => {
                        exported.insert(id);
                        report.skipped += 1;
                        on_event(ExportEvent::Skipped { id });
                    }
                    Err(error) => {
                        warn!(id, error = %error, "Failed to export lifelog");
                        on_event(ExportEvent::Failed { id, error: &error });
                        report.failures.push((id.to_string(), error));
                    }
                }
            }

            match page.next_cursor {
                None => break,
                Some(next) => {
                    if !followed.insert(next.clone()) {
                        return Err(LifelogError::PaginationLoop {
                            pages: report.pages,
                            cursor: Some(next),
                        });
                    }
                    cursor = Some(next);
                }
            }
        }

        info!(
            pages = report.pages,
            written = report.written,
            skipped = report.skipped,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "Export finished"
        );
        Ok(report)
    }

    /// Fetch, enrich and write one lifelog.
    fn pull(&self, id: &str) -> Result<WriteOutcome> {
        let record = self.source.get_enriched_lifelog(id)?;
        if !record.lifelog.offsets_consistent() {
            warn!(id, "Lifelog has content nodes ending before they start");
        }
        self.writer.write(&record, self.options.force)
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
