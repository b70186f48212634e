//! Index of lifelog IDs already exported to a destination directory.
//!
//! Rebuilt from the file names at the start of each run; there is no
//! separate state file.

use super::writer::{ExportFormat, FLAT_PREFIX, META_SUFFIX};
use crate::error::{LifelogError, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ExportIndex {
    ids: HashSet<String>,
}

impl ExportIndex {
    /// Scan a destination for exported lifelogs.
    ///
    /// Recognizes `lifelog_<id>.json` and `lifelog_<id>.meta.json` at the top
    /// level and `<id>.meta.json` inside `YYYY-MM-DD` subdirectories. A
    /// missing destination yields an empty index.
    ///
    /// IDs may themselves end in `.meta`, so a `.meta.json` name only counts
    /// as metadata when its body file sits next to it.
    pub fn scan(destination: &Path) -> Result<Self> {
        let mut index = Self::default();
        if !destination.exists() {
            return Ok(index);
        }

        let (files, dirs) = list_dir(destination)?;
        for name in &files {
            if let Some(id) = id_from_flat_name(name, &files) {
                index.ids.insert(id.to_string());
            }
        }

        for dir in dirs.iter().filter(|d| is_date_dir(d)) {
            let (inner, _) = list_dir(&destination.join(dir))?;
            for name in &inner {
                if let Some(id) = id_from_dated_name(name, &inner) {
                    index.ids.insert(id.to_string());
                }
            }
        }

        tracing::debug!(
            destination = %destination.display(),
            count = index.ids.len(),
            "Scanned export destination"
        );
        Ok(index)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Record an ID as exported. Returns false if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Names of the regular files and of the subdirectories of `dir`.
fn list_dir(dir: &Path) -> Result<(HashSet<String>, Vec<String>)> {
    let entries = fs::read_dir(dir).map_err(|e| LifelogError::filesystem(dir, e))?;

    let mut files = HashSet::new();
    let mut dirs = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_file() {
            files.insert(name);
        } else if path.is_dir() {
            dirs.push(name);
        }
    }
    Ok((files, dirs))
}

/// True when a body file `<stem>.<ext>` exists for some format.
fn has_body(siblings: &HashSet<String>, stem: &str) -> bool {
    [ExportFormat::Json, ExportFormat::Markdown]
        .iter()
        .any(|format| siblings.contains(&format!("{}.{}", stem, format.extension())))
}

fn id_from_flat_name<'a>(name: &'a str, siblings: &HashSet<String>) -> Option<&'a str> {
    let rest = name.strip_prefix(FLAT_PREFIX)?;

    // Flat JSON exports have no metadata file, so only Markdown bodies count
    if let Some(stem) = rest.strip_suffix(META_SUFFIX) {
        let markdown_body = format!(
            "{}{}.{}",
            FLAT_PREFIX,
            stem,
            ExportFormat::Markdown.extension()
        );
        if !stem.is_empty() && siblings.contains(&markdown_body) {
            return Some(stem);
        }
    }

    let id = rest.strip_suffix(".json")?;
    (!id.is_empty()).then_some(id)
}

fn id_from_dated_name<'a>(name: &'a str, siblings: &HashSet<String>) -> Option<&'a str> {
    let id = name.strip_suffix(META_SUFFIX)?;
    (!id.is_empty() && has_body(siblings, id)).then_some(id)
}

fn is_date_dir(name: &str) -> bool {
    NaiveDate::parse_from_str(name, "%Y-%m-%d").is_ok()
}
