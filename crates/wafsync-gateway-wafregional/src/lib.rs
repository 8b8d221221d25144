// # Regional WAF Firewall Gateway
//
// This crate implements the `FirewallGateway` trait against the regional
// WAF's JSON API.
//
// ## Wire protocol
//
// Every operation is a POST to `/` on the regional endpoint with
// `Content-Type: application/x-amz-json-1.1` and the operation selected by
// the `X-Amz-Target` header:
//
// - `AWSWAF_Regional_20161128.GetChangeToken` — `{}` →
//   `{"ChangeToken": "..."}`
// - `AWSWAF_Regional_20161128.GetIPSet` — `{"IPSetId": "..."}` →
//   `{"IPSet": {"IPSetDescriptors": [{"Type": "IPV4", "Value": "..."}]}}`
// - `AWSWAF_Regional_20161128.UpdateIPSet` — change token, set ID, and the
//   update batch
//
// Requests are SigV4-signed (service `waf-regional`). Error responses carry
// `{"__type": "...#WAFStaleDataException", "message": "..."}`; known codes
// are mapped to `ProtocolErrorKind` before propagation, everything else is
// an opaque transport error.
//
// ## Constraints
//
// - One remote call per trait method invocation
// - NO retry or backoff (a failed call aborts the run; the scheduler re-runs)
// - NO token caching (tokens are single-use by protocol)
// - NO background tasks
//
// ## Dry-run mode
//
// With `dry_run` set, token issuance and reads are performed but
// `UpdateIPSet` is logged and skipped, so a run can be validated without
// mutating the IP set.
//
// ## Security
//
// The secret access key NEVER appears in logs or Debug output.

pub mod sigv4;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use wafsync_core::config::GatewayConfig;
use wafsync_core::error::{Error, ProtocolErrorKind, Result};
use wafsync_core::traits::{ChangeToken, FirewallGateway, IpSetUpdate, UpdateAction};

/// API version prefix for the X-Amz-Target header
const TARGET_PREFIX: &str = "AWSWAF_Regional_20161128";

/// Signing name of the regional WAF service
const SERVICE_NAME: &str = "waf-regional";

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Static credentials for request signing
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the secret key.
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// Regional WAF gateway
pub struct WafRegionalGateway {
    endpoint: String,
    host: String,
    region: String,
    credentials: Credentials,
    client: reqwest::Client,
    dry_run: bool,
}

impl std::fmt::Debug for WafRegionalGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WafRegionalGateway")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("credentials", &self.credentials)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

// ---- wire types -----------------------------------------------------------

#[derive(Serialize)]
struct GetChangeTokenRequest {}

#[derive(Deserialize)]
struct GetChangeTokenResponse {
    #[serde(rename = "ChangeToken")]
    change_token: String,
}

#[derive(Serialize)]
struct GetIpSetRequest {
    #[serde(rename = "IPSetId")]
    ip_set_id: String,
}

#[derive(Deserialize)]
struct GetIpSetResponse {
    #[serde(rename = "IPSet")]
    ip_set: IpSetBody,
}

#[derive(Deserialize)]
struct IpSetBody {
    #[serde(rename = "IPSetDescriptors", default)]
    descriptors: Vec<IpSetDescriptor>,
}

#[derive(Serialize, Deserialize)]
struct IpSetDescriptor {
    #[serde(rename = "Type")]
    descriptor_type: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct UpdateIpSetRequest {
    #[serde(rename = "ChangeToken")]
    change_token: String,
    #[serde(rename = "IPSetId")]
    ip_set_id: String,
    #[serde(rename = "Updates")]
    updates: Vec<WireUpdate>,
}

#[derive(Serialize)]
struct WireUpdate {
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "IPSetDescriptor")]
    descriptor: IpSetDescriptor,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(rename = "__type", default)]
    error_type: String,
    #[serde(default, alias = "Message")]
    message: String,
}

// ---------------------------------------------------------------------------

/// Map a wire error code to its structured kind.
///
/// Unknown codes return `None` and propagate as opaque transport errors.
fn map_error_code(code: &str) -> Option<ProtocolErrorKind> {
    match code {
        "WAFStaleDataException" => Some(ProtocolErrorKind::StaleChangeToken),
        "WAFInternalErrorException" => Some(ProtocolErrorKind::InternalError),
        "WAFInvalidAccountException" => Some(ProtocolErrorKind::InvalidAccount),
        "WAFInvalidOperationException" => Some(ProtocolErrorKind::InvalidOperation),
        "WAFInvalidParameterException" => Some(ProtocolErrorKind::InvalidParameter),
        "WAFNonexistentContainerException" => Some(ProtocolErrorKind::NonexistentContainer),
        "WAFNonexistentItemException" => Some(ProtocolErrorKind::NonexistentItem),
        "WAFReferencedItemException" => Some(ProtocolErrorKind::ReferencedItem),
        "WAFLimitsExceededException" => Some(ProtocolErrorKind::LimitsExceeded),
        _ => None,
    }
}

/// Strip the namespace prefix from an `__type` value
/// (`"com.amazonaws...#WAFStaleDataException"` → `"WAFStaleDataException"`).
fn error_code(error_type: &str) -> &str {
    error_type
        .rsplit('#')
        .next()
        .unwrap_or(error_type)
}

fn wire_update(update: &IpSetUpdate) -> WireUpdate {
    WireUpdate {
        action: match update.action {
            UpdateAction::Insert => "INSERT".to_string(),
            UpdateAction::Delete => "DELETE".to_string(),
        },
        descriptor: IpSetDescriptor {
            descriptor_type: descriptor_type(&update.cidr).to_string(),
            value: update.cidr.clone(),
        },
    }
}

fn descriptor_type(cidr: &str) -> &'static str {
    if cidr.contains(':') { "IPV6" } else { "IPV4" }
}

impl WafRegionalGateway {
    /// Create a new gateway from configuration and credentials.
    ///
    /// The endpoint is derived from the configured region unless an explicit
    /// override is set (mainly for tests).
    pub fn new(config: &GatewayConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;

        if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
            return Err(Error::config("gateway credentials are required"));
        }

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://waf-regional.{}.amazonaws.com", config.region));

        let host = endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        if config.dry_run {
            tracing::warn!("gateway running in DRY-RUN mode, mutations will be skipped");
        }

        Ok(Self {
            endpoint,
            host,
            region: config.region.clone(),
            credentials,
            client,
            dry_run: config.dry_run,
        })
    }

    /// POST one operation and return the raw response body.
    async fn post(&self, operation: &str, body: String) -> Result<String> {
        let target = format!("{}.{}", TARGET_PREFIX, operation);
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut signed_headers = vec![
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), self.host.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
            ("x-amz-target".to_string(), target.clone()),
        ];
        if let Some(token) = self.credentials.session_token() {
            signed_headers.push(("x-amz-security-token".to_string(), token.to_string()));
        }

        let params = sigv4::SigningParams {
            region: &self.region,
            service: SERVICE_NAME,
            timestamp: now,
        };
        let authorization = sigv4::authorization_header(
            &self.credentials,
            &params,
            &signed_headers,
            body.as_bytes(),
        );

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Date", &amz_date)
            .header("X-Amz-Target", &target)
            .header("Authorization", authorization);
        if let Some(token) = self.credentials.session_token() {
            request = request.header("X-Amz-Security-Token", token);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("{}: failed to read response: {}", operation, e)))?;

        if status.is_success() {
            return Ok(text);
        }

        // Structured protocol errors come back as JSON with an __type code.
        if let Ok(wire) = serde_json::from_str::<WireError>(&text) {
            let code = error_code(&wire.error_type);
            if let Some(kind) = map_error_code(code) {
                return Err(Error::protocol(kind, wire.message));
            }
        }

        Err(Error::transport(format!(
            "{} failed with status {}: {}",
            operation, status, text
        )))
    }
}

#[async_trait]
impl FirewallGateway for WafRegionalGateway {
    async fn issue_change_token(&self) -> Result<ChangeToken> {
        let body = serde_json::to_string(&GetChangeTokenRequest {})
            .map_err(|e| Error::transport(e.to_string()))?;
        let text = self.post("GetChangeToken", body).await?;

        let parsed: GetChangeTokenResponse = serde_json::from_str(&text)
            .map_err(|e| Error::transport(format!("GetChangeToken: invalid response: {}", e)))?;

        tracing::debug!("issued change token");
        Ok(ChangeToken(parsed.change_token))
    }

    async fn read_ip_set(&self, set_id: &str) -> Result<Vec<String>> {
        let body = serde_json::to_string(&GetIpSetRequest {
            ip_set_id: set_id.to_string(),
        })
        .map_err(|e| Error::transport(e.to_string()))?;
        let text = self.post("GetIPSet", body).await?;

        let parsed: GetIpSetResponse = serde_json::from_str(&text)
            .map_err(|e| Error::transport(format!("GetIPSet: invalid response: {}", e)))?;

        let values: Vec<String> = parsed
            .ip_set
            .descriptors
            .into_iter()
            .map(|d| d.value)
            .collect();

        tracing::debug!(set_id, entries = values.len(), "read IP set");
        Ok(values)
    }

    async fn apply_updates(
        &self,
        set_id: &str,
        token: &ChangeToken,
        batch: &[IpSetUpdate],
    ) -> Result<()> {
        let request = UpdateIpSetRequest {
            change_token: token.as_str().to_string(),
            ip_set_id: set_id.to_string(),
            updates: batch.iter().map(wire_update).collect(),
        };
        let body = serde_json::to_string(&request).map_err(|e| Error::transport(e.to_string()))?;

        if self.dry_run {
            tracing::info!(
                set_id,
                updates = batch.len(),
                payload = %body,
                "[DRY-RUN] would submit UpdateIPSet"
            );
            return Ok(());
        }

        self.post("UpdateIPSet", body).await?;
        tracing::debug!(set_id, updates = batch.len(), "update batch applied");
        Ok(())
    }
}
