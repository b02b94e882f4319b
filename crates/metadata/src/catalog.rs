use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::CatalogMatch;

pub const DEFAULT_CATALOG_URL: &str = "https://itunes.apple.com";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("http {0}")]
    Status(u16),
    #[error("invalid search response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A remote music catalog that can answer a single free-text search.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// First hit for `term`, or `None` when the catalog has nothing.
    async fn search(&self, term: &str) -> Result<Option<CatalogMatch>, CatalogError>;
}

/// Catalog lookup over HTTP against an iTunes-style `/search` endpoint.
#[derive(Clone, Debug)]
pub struct HttpCatalog {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpCatalog {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        let base_url = base_url.trim();
        let base_url = if base_url.is_empty() {
            DEFAULT_CATALOG_URL
        } else {
            base_url
        };
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn search_url(&self, term: &str) -> String {
        format!(
            "{}/search?term={}&media=music&limit=1",
            self.base_url,
            url_escape(term)
        )
    }
}

#[async_trait]
impl CatalogClient for HttpCatalog {
    async fn search(&self, term: &str) -> Result<Option<CatalogMatch>, CatalogError> {
        let url = self.search_url(term);
        debug!(url = %url, "Catalog search");
        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        parse_search_body(&body)
    }
}

/// Maps the first entry of `results` into a match. Field names are matched
/// without regard to ASCII case.
pub fn parse_search_body(body: &str) -> Result<Option<CatalogMatch>, CatalogError> {
    let payload: Value = serde_json::from_str(body)?;
    let entry = payload
        .as_object()
        .and_then(|object| field(object, "results"))
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_object);
    let entry = match entry {
        Some(entry) => entry,
        None => return Ok(None),
    };

    Ok(Some(CatalogMatch {
        track_name: text_field(entry, "trackName"),
        artist_name: text_field(entry, "artistName"),
        album_name: text_field(entry, "collectionName"),
        artwork_url: text_field(entry, "artworkUrl100"),
    }))
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn text_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    field(object, name)
        .and_then(Value::as_str)
        .map(|value| value.to_string())
}

fn url_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
