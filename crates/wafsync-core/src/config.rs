//! Configuration types for the WAF sync system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Target IP set identifier (required; the run cannot start without it)
    pub ip_set_id: String,

    /// Firewall gateway configuration
    pub gateway: GatewayConfig,

    /// Prefix source configuration
    pub source: SourceConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.ip_set_id.is_empty() {
            return Err(crate::Error::config("IP set ID is required"));
        }

        self.gateway.validate()?;
        self.source.validate()?;

        Ok(())
    }
}

/// Firewall gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Geographic region of the firewall endpoint. The original tool bound
    /// to one compiled-in region; here it is always explicit configuration.
    pub region: String,

    /// Endpoint override, mainly for tests. When unset, the endpoint is
    /// derived from the region.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Dry-run mode: read operations are performed, mutations are logged
    /// and skipped.
    #[serde(default)]
    pub dry_run: bool,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.region.is_empty() {
            return Err(crate::Error::config("gateway region is required"));
        }

        if let Some(ref endpoint) = self.endpoint
            && !endpoint.starts_with("https://")
            && !endpoint.starts_with("http://")
        {
            return Err(crate::Error::config(format!(
                "gateway endpoint must be an HTTP(S) URL, got: {}",
                endpoint
            )));
        }

        Ok(())
    }
}

/// Prefix source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of the published prefix document
    pub url: String,

    /// Service name to filter the document to (e.g., "CLOUDFRONT")
    pub service: String,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("source URL is required"));
        }

        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "source URL must be an HTTP(S) URL, got: {}",
                self.url
            )));
        }

        if self.service.is_empty() {
            return Err(crate::Error::config("source service name is required"));
        }

        Ok(())
    }
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the bounded sync event channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_event_channel_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}
