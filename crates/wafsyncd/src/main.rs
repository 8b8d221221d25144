// # wafsyncd - WAF IP set sync runner
//
// One-shot runner: each invocation performs one full reconciliation of the
// target IP set against the published prefix list, then exits. Scheduling
// (and retry after failures) belongs to the external invoker; overlapping
// runs against the same IP set are unsafe because of the firewall's
// single-use change-token protocol.
//
// This is a THIN integration layer: it reads configuration, wires up the
// prefix source, gateway, and reconciler from the library crates, and maps
// the outcome to an exit code. All sync logic lives in wafsync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Target
// - `WAFSYNC_IP_SET_ID`: ID of the IP set to reconcile (required)
// - `WAFSYNC_REGION`: region of the firewall endpoint (required)
//
// ### Credentials
// - `AWS_ACCESS_KEY_ID`: access key for request signing (required)
// - `AWS_SECRET_ACCESS_KEY`: secret key for request signing (required)
// - `AWS_SESSION_TOKEN`: session token (optional)
//
// ### Prefix source
// - `WAFSYNC_RANGES_URL`: published document URL
//   (default: https://ip-ranges.amazonaws.com/ip-ranges.json)
// - `WAFSYNC_SERVICE`: service name to filter to (default: CLOUDFRONT)
//
// ### Misc
// - `WAFSYNC_LOG_LEVEL`: trace|debug|info|warn|error (default: info)
// - `WAFSYNC_MODE`: set to "dry-run" to log mutations without applying them
//
// ## Example
//
// ```bash
// export WAFSYNC_IP_SET_ID=abcd1234-...
// export WAFSYNC_REGION=ap-northeast-1
// export AWS_ACCESS_KEY_ID=...
// export AWS_SECRET_ACCESS_KEY=...
//
// wafsyncd
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use wafsync_core::{
    EngineConfig, GatewayConfig, Reconciler, SourceConfig, SyncConfig, SyncEvent,
};
use wafsync_core::traits::PrefixSource;
use wafsync_gateway_wafregional::{Credentials, WafRegionalGateway};
use wafsync_prefix_http::HttpPrefixSource;

const DEFAULT_RANGES_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";
const DEFAULT_SERVICE: &str = "CLOUDFRONT";

/// Exit codes for different termination scenarios
///
/// The invoking scheduler only needs a binary outcome; the split between
/// config and runtime failures is for the operator reading logs.
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Reconciliation completed
    Success = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Reconciliation failed at runtime
    SyncError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    ip_set_id: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
    ranges_url: String,
    service: String,
    log_level: String,
    dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            ip_set_id: env::var("WAFSYNC_IP_SET_ID").unwrap_or_default(),
            region: env::var("WAFSYNC_REGION").unwrap_or_default(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            session_token: env::var("AWS_SESSION_TOKEN").ok(),
            ranges_url: env::var("WAFSYNC_RANGES_URL")
                .unwrap_or_else(|_| DEFAULT_RANGES_URL.to_string()),
            service: env::var("WAFSYNC_SERVICE").unwrap_or_else(|_| DEFAULT_SERVICE.to_string()),
            log_level: env::var("WAFSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dry_run: env::var("WAFSYNC_MODE")
                .unwrap_or_default()
                .to_lowercase()
                == "dry-run",
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.ip_set_id.is_empty() {
            anyhow::bail!(
                "WAFSYNC_IP_SET_ID is required. \
                Set it via: export WAFSYNC_IP_SET_ID=<ip-set-id>"
            );
        }

        if self.region.is_empty() {
            anyhow::bail!(
                "WAFSYNC_REGION is required. \
                Set it via: export WAFSYNC_REGION=ap-northeast-1"
            );
        }

        if !self
            .region
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            anyhow::bail!(
                "WAFSYNC_REGION '{}' is not a valid region name. \
                Expected something like: ap-northeast-1",
                self.region
            );
        }

        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            anyhow::bail!(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are required \
                for request signing."
            );
        }

        // Check for obvious placeholder credentials (common mistake)
        let secret_lower = self.secret_access_key.to_lowercase();
        if secret_lower.contains("your_secret")
            || secret_lower.contains("replace_me")
            || secret_lower.contains("example")
        {
            anyhow::bail!(
                "AWS_SECRET_ACCESS_KEY appears to be a placeholder. \
                Use actual credentials."
            );
        }

        if !self.ranges_url.starts_with("https://") && !self.ranges_url.starts_with("http://") {
            anyhow::bail!(
                "WAFSYNC_RANGES_URL must use HTTP or HTTPS scheme. Got: {}",
                self.ranges_url
            );
        }

        if self.ranges_url.starts_with("http://") {
            eprintln!(
                "WARNING: WAFSYNC_RANGES_URL uses HTTP (not HTTPS). \
                 The prefix feed should be fetched over HTTPS."
            );
        }

        if self.service.is_empty() {
            anyhow::bail!(
                "WAFSYNC_SERVICE cannot be empty. \
                Set it via: export WAFSYNC_SERVICE=CLOUDFRONT"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "WAFSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            ip_set_id: self.ip_set_id.clone(),
            gateway: GatewayConfig {
                region: self.region.clone(),
                endpoint: None,
                dry_run: self.dry_run,
            },
            source: SourceConfig {
                url: self.ranges_url.clone(),
                service: self.service.clone(),
            },
            engine: EngineConfig::default(),
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("starting wafsyncd");
    info!(
        ip_set_id = %config.ip_set_id,
        region = %config.region,
        service = %config.service,
        dry_run = config.dry_run,
        "configuration loaded"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return SyncExitCode::SyncError.into();
        }
    };

    match rt.block_on(run_sync(&config)) {
        Ok(()) => {
            info!("reconciliation completed");
            SyncExitCode::Success.into()
        }
        Err(e) => {
            error!("reconciliation failed: {:#}", e);
            SyncExitCode::SyncError.into()
        }
    }
}

/// Wire up the source, gateway, and reconciler; run one reconciliation.
async fn run_sync(config: &Config) -> Result<()> {
    let sync_config = config.sync_config();

    let source = HttpPrefixSource::new(&sync_config.source)?;

    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
        config.session_token.clone(),
    );
    let gateway = WafRegionalGateway::new(&sync_config.gateway, credentials)?;

    let (reconciler, mut events) = Reconciler::new(Box::new(gateway), &sync_config)?;

    // Drain progress events into the operator log.
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let desired = source.fetch_prefixes().await?;
    info!(prefixes = desired.len(), "fetched desired prefix list");

    let summary = reconciler.run(&desired).await?;
    info!(
        inserted = summary.inserted,
        dropped = summary.dropped,
        current = summary.current,
        deleted = summary.deleted,
        "run summary"
    );

    drop(reconciler);
    let _ = event_logger.await;

    Ok(())
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::RunStarted { desired } => {
            info!(desired, "reconciliation run started");
        }
        SyncEvent::InsertSubmitted { submitted, dropped } => {
            info!(submitted, dropped, "insert batch submitted");
        }
        SyncEvent::CurrentSetRead { entries } => {
            info!(entries, "current IP set read");
        }
        SyncEvent::DeleteSubmitted { submitted } => {
            info!(submitted, "delete batch submitted");
        }
        SyncEvent::DeleteSkipped => {
            info!("delete phase skipped, nothing stale");
        }
        SyncEvent::RunCompleted => {
            info!("reconciliation run completed");
        }
        SyncEvent::RunFailed { error } => {
            error!(%error, "reconciliation run failed");
        }
    }
}
