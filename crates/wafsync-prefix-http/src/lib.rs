// # HTTP Prefix Source
//
// This crate fetches the published IP range document over HTTP and filters
// it to one service name, producing the desired prefix list for a run.
//
// ## Document format
//
// ```json
// {
//   "syncToken": "1692891241",
//   "createDate": "2024-08-27-15-30-10",
//   "prefixes": [
//     {"ip_prefix": "13.32.0.0/15", "region": "GLOBAL", "service": "CLOUDFRONT"}
//   ]
// }
// ```
//
// The document is versioned by `syncToken`/`createDate`; both are logged so
// an operator can tell which edition of the feed a run consumed, and the
// feed age is derived from `createDate`.
//
// ## Constraints
//
// - One fetch per invocation, no caching between runs
// - NO retry logic (owned by the external scheduler)
// - Filters by service name only; mask-length filtering belongs to the
//   reconciler

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::time::Duration;

use wafsync_core::config::SourceConfig;
use wafsync_core::error::{Error, Result};
use wafsync_core::traits::PrefixSource;

/// Default HTTP timeout for fetching the document
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timestamp format of the document's createDate field
const CREATE_DATE_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// The published range document, as deserialized from the feed
#[derive(Debug, Clone, Deserialize)]
pub struct RangeDocument {
    #[serde(rename = "syncToken")]
    pub sync_token: String,

    #[serde(rename = "createDate")]
    pub create_date: String,

    #[serde(default)]
    pub prefixes: Vec<RangeEntry>,
}

/// One prefix entry of the published document
#[derive(Debug, Clone, Deserialize)]
pub struct RangeEntry {
    pub ip_prefix: String,

    #[serde(default)]
    pub region: String,

    pub service: String,
}

impl RangeDocument {
    /// Prefixes belonging to the named service, in document order.
    pub fn prefixes_for_service(&self, service: &str) -> Vec<String> {
        self.prefixes
            .iter()
            .filter(|entry| entry.service == service)
            .map(|entry| entry.ip_prefix.clone())
            .collect()
    }

    /// Age of the document relative to `now`, if createDate parses.
    /// The field is informational; a malformed value is not an error.
    pub fn age(&self, now: chrono::DateTime<chrono::Utc>) -> Option<chrono::Duration> {
        let created = NaiveDateTime::parse_from_str(&self.create_date, CREATE_DATE_FORMAT)
            .ok()?
            .and_utc();
        Some(now.signed_duration_since(created))
    }
}

/// HTTP-based prefix source for the published range document
pub struct HttpPrefixSource {
    url: String,
    service: String,
    client: reqwest::Client,
}

impl HttpPrefixSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            service: config.service.clone(),
            client,
        })
    }

    async fn fetch_document(&self) -> Result<RangeDocument> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::source(format!("fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::source(format!(
                "fetch failed with status {}",
                response.status()
            )));
        }

        response
            .json::<RangeDocument>()
            .await
            .map_err(|e| Error::source(format!("invalid range document: {}", e)))
    }
}

#[async_trait]
impl PrefixSource for HttpPrefixSource {
    async fn fetch_prefixes(&self) -> Result<Vec<String>> {
        let document = self.fetch_document().await?;

        match document.age(chrono::Utc::now()) {
            Some(age) => tracing::info!(
                sync_token = %document.sync_token,
                create_date = %document.create_date,
                age_hours = age.num_hours(),
                "fetched range document"
            ),
            None => tracing::info!(
                sync_token = %document.sync_token,
                create_date = %document.create_date,
                "fetched range document (unparseable createDate)"
            ),
        }

        let prefixes = document.prefixes_for_service(&self.service);
        tracing::info!(
            service = %self.service,
            prefixes = prefixes.len(),
            "filtered prefixes for service"
        );

        Ok(prefixes)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
