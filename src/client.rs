//! Lifelog API client.
//!
//! Every request is a single attempt with a bounded timeout. Retry policy,
//! if any, belongs to the caller.

use crate::error::{LifelogError, Result};
use crate::model::{EnrichedLifelog, Lifelog, LifelogPage, ListEnvelope, ListQuery};
use crate::tags;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.limitless.ai/v1";

/// Request timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest slice of an error body kept in a request error message.
const ERROR_BODY_PREVIEW: usize = 200;

/// Anything that can list and look up lifelogs.
///
/// The export pipeline only talks to this trait, so tests can drive it with
/// an in-memory source.
pub trait LifelogSource {
    /// Fetch one page of lifelogs.
    fn list_lifelogs(&self, query: &ListQuery) -> Result<LifelogPage>;

    /// Fetch a single lifelog by ID. Fails with `NotFound` on zero matches.
    fn get_lifelog(&self, id: &str) -> Result<Lifelog>;

    /// Fetch a single lifelog and attach its keyword tags.
    fn get_enriched_lifelog(&self, id: &str) -> Result<EnrichedLifelog> {
        self.get_lifelog(id).map(tags::enrich)
    }
}

/// HTTP client for the lifelog API, authenticated with a static API key.
pub struct LifelogClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LifelogClient {
    /// Create a client for the production API with the default timeout.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_options(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom API root and timeout.
    pub fn with_options(api_key: &str, base_url: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LifelogError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lifelog-export/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            // Normalize API base URL (strip trailing slash)
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn lifelogs_url(&self) -> String {
        format!("{}/lifelogs", self.base_url)
    }

    /// GET the listing endpoint with the given parameters and decode the body.
    fn fetch(&self, params: &[(&str, String)]) -> Result<LifelogPage> {
        let url = self.lifelogs_url();
        debug!(url = %url, ?params, "Requesting lifelogs");

        let response = self
            .client
            .get(&url)
            .query(params)
            .bearer_auth(&self.api_key)
            .header("X-API-Key", &self.api_key)
            .header(ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            let message = if preview.trim().is_empty() {
                status.to_string()
            } else {
                format!("{} - {}", status, preview.trim())
            };
            return Err(LifelogError::Request {
                status: Some(status.as_u16()),
                message,
            });
        }

        let body = response.text()?;
        let envelope: ListEnvelope = serde_json::from_str(&body)
            .map_err(|e| LifelogError::decode("lifelog list response", e))?;

        Ok(envelope.into_page())
    }
}

impl LifelogSource for LifelogClient {
    fn list_lifelogs(&self, query: &ListQuery) -> Result<LifelogPage> {
        let page = self.fetch(&query.to_params())?;
        debug!(
            count = page.lifelogs.len(),
            next_cursor = ?page.next_cursor,
            "Received lifelog page"
        );
        Ok(page)
    }

    fn get_lifelog(&self, id: &str) -> Result<Lifelog> {
        let page = self.fetch(&[("id", id.to_string())])?;

        page.lifelogs
            .into_iter()
            .find(|log| log.id == id)
            .ok_or_else(|| LifelogError::NotFound { id: id.to_string() })
    }
}
