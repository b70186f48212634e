//! Lifelog Export Library
//!
//! Client and exporter for a personal lifelog API.
//! Provides the following capabilities:
//! - List lifelogs page by page with cursor pagination and date filters
//! - Look up a single lifelog by ID
//! - Tag records with a fixed keyword vocabulary
//! - Export records to JSON or Markdown files, skipping what is already on disk
//!
//! Pipeline: List (cursor pages) -> Fetch (by ID) -> Tag -> Write (flat or dated layout)

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod markdown;
pub mod model;
pub mod tags;

// Re-export main types
pub use client::{LifelogClient, LifelogSource};
pub use config::Config;
pub use error::{LifelogError, Result};
pub use export::{
    ExportEvent, ExportFormat, ExportIndex, ExportLayout, ExportOptions, ExportOutcome,
    ExportReport, Exporter,
};
pub use model::{ContentNode, EnrichedLifelog, Lifelog, LifelogPage, ListQuery};
pub use tags::generate_tags;
