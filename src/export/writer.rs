//! Export writer - Persists enriched lifelogs in one of the supported layouts.
//!
//! | layout | format   | files                                                  |
//! |--------|----------|--------------------------------------------------------|
//! | flat   | json     | `lifelog_<id>.json`                                    |
//! | flat   | markdown | `lifelog_<id>.md` + `lifelog_<id>.meta.json`           |
//! | dated  | json     | `<YYYY-MM-DD>/<id>.json` + `<YYYY-MM-DD>/<id>.meta.json` |
//! | dated  | markdown | `<YYYY-MM-DD>/<id>.md` + `<YYYY-MM-DD>/<id>.meta.json`   |
//!
//! Paths depend only on the record's ID (and start date for the dated layout),
//! so repeated runs land on the same files.

use crate::error::{LifelogError, Result};
use crate::model::{EnrichedLifelog, Lifelog};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name prefix of the flat layout.
pub const FLAT_PREFIX: &str = "lifelog_";

/// Suffix of the companion metadata file.
pub const META_SUFFIX: &str = ".meta.json";

/// Body format of an exported lifelog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Full enriched record as pretty-printed JSON
    #[default]
    Json,
    /// Markdown body plus a metadata file
    Markdown,
}

impl ExportFormat {
    pub(crate) fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// Directory layout of an export destination.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExportLayout {
    /// All files directly in the destination, prefixed with `lifelog_`
    #[default]
    Flat,
    /// One subdirectory per start date
    Dated,
}

/// Metadata written next to a body file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeta {
    pub id: String,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    /// Body file name, relative to the metadata file's directory
    pub data_file: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Files an export of one lifelog produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub dir: PathBuf,
    pub body: PathBuf,
    pub meta: Option<PathBuf>,
}

impl ExportTarget {
    /// The file whose presence marks the lifelog as exported.
    ///
    /// The metadata file is written last, so an interrupted export is retried.
    pub fn marker(&self) -> &Path {
        self.meta.as_deref().unwrap_or(&self.body)
    }
}

/// Result of a single write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Files written, body first
    Written(Vec<PathBuf>),
    /// Already on disk and overwriting was not requested
    Skipped(PathBuf),
}

/// Writes enriched lifelogs under a destination directory.
#[derive(Debug, Clone)]
pub struct ExportWriter {
    destination: PathBuf,
    format: ExportFormat,
    layout: ExportLayout,
}

impl ExportWriter {
    pub fn new(destination: impl Into<PathBuf>, format: ExportFormat, layout: ExportLayout) -> Self {
        Self {
            destination: destination.into(),
            format,
            layout,
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Compute the output paths for a lifelog without touching the disk.
    pub fn target(&self, lifelog: &Lifelog) -> Result<ExportTarget> {
        let id = checked_file_stem(&lifelog.id)?;
        let ext = self.format.extension();

        let target = match (self.layout, self.format) {
            (ExportLayout::Flat, ExportFormat::Json) => ExportTarget {
                dir: self.destination.clone(),
                body: self.destination.join(format!("{}{}.{}", FLAT_PREFIX, id, ext)),
                meta: None,
            },
            (ExportLayout::Flat, ExportFormat::Markdown) => ExportTarget {
                dir: self.destination.clone(),
                body: self.destination.join(format!("{}{}.{}", FLAT_PREFIX, id, ext)),
                meta: Some(
                    self.destination
                        .join(format!("{}{}{}", FLAT_PREFIX, id, META_SUFFIX)),
                ),
            },
            (ExportLayout::Dated, _) => {
                let dir = self.destination.join(lifelog.start_date()?);
                ExportTarget {
                    body: dir.join(format!("{}.{}", id, ext)),
                    meta: Some(dir.join(format!("{}{}", id, META_SUFFIX))),
                    dir,
                }
            }
        };

        Ok(target)
    }

    /// Write one enriched lifelog.
    ///
    /// Without `overwrite`, an existing export is left untouched.
    pub fn write(&self, record: &EnrichedLifelog, overwrite: bool) -> Result<WriteOutcome> {
        let target = self.target(&record.lifelog)?;

        if !overwrite && target.marker().is_file() {
            return Ok(WriteOutcome::Skipped(target.marker().to_path_buf()));
        }

        fs::create_dir_all(&target.dir)
            .map_err(|e| LifelogError::filesystem(&target.dir, e))?;

        let body = match self.format {
            ExportFormat::Json => to_pretty_json(record, &target.body)?,
            ExportFormat::Markdown => record.lifelog.body_text().into_owned(),
        };
        write_file(&target.body, &body)?;

        let mut written = vec![target.body.clone()];

        if let Some(meta_path) = &target.meta {
            let meta = ExportMeta {
                id: record.lifelog.id.clone(),
                title: record.lifelog.title.clone(),
                start_time: record.lifelog.start_time.clone(),
                end_time: record.lifelog.end_time.clone(),
                data_file: file_name(&target.body),
                tags: record.tags.clone(),
            };
            write_file(meta_path, &to_pretty_json(&meta, meta_path)?)?;
            written.push(meta_path.clone());
        }

        Ok(WriteOutcome::Written(written))
    }
}

/// Reject IDs that cannot be used verbatim as a file name.
fn checked_file_stem(id: &str) -> Result<&str> {
    let unusable = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);
    if unusable {
        return Err(LifelogError::decode(
            "lifelog id",
            format!("{:?} cannot be used as a file name", id),
        ));
    }
    Ok(id)
}

fn to_pretty_json<T: Serialize>(value: &T, path: &Path) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| LifelogError::filesystem(path, std::io::Error::from(e)))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| LifelogError::filesystem(path, e))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
