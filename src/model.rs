//! Record model - Lifelogs, their content trees and list-page envelopes.
//!
//! Field names follow the API's camelCase JSON. Optional fields are omitted
//! on serialization so a decoded record round-trips to the same shape.

use crate::error::{LifelogError, Result};
use crate::markdown;
use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;

/// Decode an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A structured content block inside a lifelog (heading, blockquote, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    /// Block kind: heading1, heading2, heading3, blockquote, paragraph, ...
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub node_type: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,

    /// Milliseconds from the start of the lifelog
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_offset_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_name: Option<String>,

    /// e.g. "user" when the speaker is the device owner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_identifier: Option<String>,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    /// Create a node with only a type and text.
    pub fn new(node_type: &str, content: &str) -> Self {
        Self {
            node_type: node_type.to_string(),
            content: content.to_string(),
            start_time: None,
            end_time: None,
            start_offset_ms: None,
            end_offset_ms: None,
            speaker_name: None,
            speaker_identifier: None,
            children: Vec::new(),
        }
    }

    /// True when `endOffsetMs >= startOffsetMs` here and in every descendant.
    pub fn offsets_consistent(&self) -> bool {
        let own = match (self.start_offset_ms, self.end_offset_ms) {
            (Some(start), Some(end)) => end >= start,
            _ => true,
        };
        own && self.children.iter().all(ContentNode::offsets_consistent)
    }
}

/// One lifelog entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lifelog {
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    /// Full markdown rendering (may be omitted by the API)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub contents: Vec<ContentNode>,

    /// ISO 8601, kept verbatim
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub end_time: String,
}

impl Lifelog {
    /// Text used for tagging and for the markdown export body.
    ///
    /// Falls back to rendering the content tree when the API sent no body.
    pub fn body_text(&self) -> Cow<'_, str> {
        match self.markdown.as_deref() {
            Some(md) if !md.trim().is_empty() => Cow::Borrowed(md),
            _ => Cow::Owned(markdown::render_contents(&self.contents)),
        }
    }

    /// Calendar date (`YYYY-MM-DD`) of `startTime` in the record's own offset.
    pub fn start_date(&self) -> Result<String> {
        let parsed = DateTime::parse_from_rfc3339(&self.start_time).map_err(|e| {
            LifelogError::decode(format!("startTime of lifelog {}", self.id), e)
        })?;
        Ok(parsed.format("%Y-%m-%d").to_string())
    }

    /// True when every content node has consistent offsets.
    pub fn offsets_consistent(&self) -> bool {
        self.contents.iter().all(ContentNode::offsets_consistent)
    }
}

/// A lifelog together with the tags derived from its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedLifelog {
    #[serde(flatten)]
    pub lifelog: Lifelog,

    /// Matched keywords, in vocabulary order
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EnrichedLifelog {
    pub fn id(&self) -> &str {
        &self.lifelog.id
    }
}

/// One page of a list request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifelogPage {
    pub lifelogs: Vec<Lifelog>,
    /// `None` when this is the last page
    pub next_cursor: Option<String>,
}

/// Filters for a list request. Empty strings and `limit <= 0` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: i32,
    pub cursor: Option<String>,
    /// Single day (YYYY-MM-DD)
    pub date: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    /// IANA timezone name, e.g. "America/Los_Angeles"
    pub timezone: Option<String>,
}

impl ListQuery {
    pub fn new(limit: i32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    /// Query parameters to attach, in a fixed order.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if self.limit > 0 {
            params.push(("limit", self.limit.to_string()));
        }

        let optional = [
            ("cursor", &self.cursor),
            ("date", &self.date),
            ("start", &self.start),
            ("end", &self.end),
            ("timezone", &self.timezone),
        ];
        for (key, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((key, value.to_string()));
            }
        }

        params
    }
}

/// Response envelope of the lifelog listing endpoint.
///
/// The API has shipped two shapes: a flat `items`/`nextCursor` body and a
/// nested `data.lifelogs`/`meta.lifelogs.nextCursor` body. Both are accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope {
    Nested {
        data: NestedData,
        #[serde(default)]
        meta: NestedMeta,
    },
    Flat {
        items: Vec<Lifelog>,
        #[serde(default, rename = "nextCursor")]
        next_cursor: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct NestedData {
    #[serde(default)]
    lifelogs: Vec<Lifelog>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NestedMeta {
    #[serde(default)]
    lifelogs: NestedPagination,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NestedPagination {
    #[serde(default)]
    next_cursor: Option<String>,
    #[allow(dead_code)]
    #[serde(default)]
    count: Option<u64>,
}

impl ListEnvelope {
    pub(crate) fn into_page(self) -> LifelogPage {
        let (lifelogs, next_cursor) = match self {
            Self::Nested { data, meta } => (data.lifelogs, meta.lifelogs.next_cursor),
            Self::Flat { items, next_cursor } => (items, next_cursor),
        };

        LifelogPage {
            lifelogs,
            next_cursor: next_cursor.filter(|c| !c.is_empty()),
        }
    }
}
