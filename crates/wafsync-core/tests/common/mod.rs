//! Test doubles and common utilities for reconciler contract tests
//!
//! This module provides a scriptable gateway double that records every
//! remote call so tests can verify the token lifecycle and batch contents
//! without real network I/O.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use wafsync_core::error::{Error, ProtocolErrorKind, Result};
use wafsync_core::traits::{ChangeToken, FirewallGateway, IpSetUpdate};
use wafsync_core::{EngineConfig, GatewayConfig, SourceConfig, SyncConfig};

/// One recorded apply_updates call
#[derive(Debug, Clone)]
pub struct AppliedBatch {
    pub set_id: String,
    pub token: String,
    pub batch: Vec<IpSetUpdate>,
}

/// Which phase the mock should fail, and how
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// All calls succeed
    None,
    /// apply_updates returns a protocol error of this kind
    ProtocolOnApply(ProtocolErrorKind),
    /// apply_updates returns an opaque transport error
    TransportOnApply,
    /// issue_change_token fails with a transport error
    TransportOnToken,
}

/// Shared observation handles for a [`MockGateway`] that has been boxed
#[derive(Clone)]
pub struct MockGatewayHandle {
    tokens_issued: Arc<AtomicUsize>,
    read_calls: Arc<AtomicUsize>,
    applied: Arc<Mutex<Vec<AppliedBatch>>>,
}

impl MockGatewayHandle {
    /// Number of change tokens issued so far
    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued.load(Ordering::SeqCst)
    }

    /// Number of read_ip_set calls so far
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// All apply_updates calls recorded so far
    pub fn applied(&self) -> Vec<AppliedBatch> {
        self.applied.lock().unwrap().clone()
    }
}

/// A gateway double that counts calls and records submitted batches.
///
/// Tokens are issued as "token-1", "token-2", ... so tests can check that
/// each submitted batch carried a distinct, freshly issued token.
pub struct MockGateway {
    current: Vec<String>,
    failure: FailureMode,
    tokens_issued: Arc<AtomicUsize>,
    read_calls: Arc<AtomicUsize>,
    applied: Arc<Mutex<Vec<AppliedBatch>>>,
}

impl MockGateway {
    pub fn new(current: Vec<String>) -> Self {
        Self {
            current,
            failure: FailureMode::None,
            tokens_issued: Arc::new(AtomicUsize::new(0)),
            read_calls: Arc::new(AtomicUsize::new(0)),
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(current: Vec<String>, failure: FailureMode) -> Self {
        Self {
            failure,
            ..Self::new(current)
        }
    }

    /// Observation handles that stay valid after the gateway is boxed
    pub fn handle(&self) -> MockGatewayHandle {
        MockGatewayHandle {
            tokens_issued: Arc::clone(&self.tokens_issued),
            read_calls: Arc::clone(&self.read_calls),
            applied: Arc::clone(&self.applied),
        }
    }
}

#[async_trait]
impl FirewallGateway for MockGateway {
    async fn issue_change_token(&self) -> Result<ChangeToken> {
        if self.failure == FailureMode::TransportOnToken {
            return Err(Error::transport("token endpoint unreachable"));
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ChangeToken(format!("token-{}", n)))
    }

    async fn read_ip_set(&self, _set_id: &str) -> Result<Vec<String>> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.clone())
    }

    async fn apply_updates(
        &self,
        set_id: &str,
        token: &ChangeToken,
        batch: &[IpSetUpdate],
    ) -> Result<()> {
        match self.failure {
            FailureMode::ProtocolOnApply(kind) => {
                return Err(Error::protocol(kind, "scripted failure"));
            }
            FailureMode::TransportOnApply => {
                return Err(Error::transport("scripted transport failure"));
            }
            _ => {}
        }

        self.applied.lock().unwrap().push(AppliedBatch {
            set_id: set_id.to_string(),
            token: token.as_str().to_string(),
            batch: batch.to_vec(),
        });
        Ok(())
    }
}

/// A minimal valid configuration for contract tests
pub fn test_config() -> SyncConfig {
    SyncConfig {
        ip_set_id: "test-ip-set".to_string(),
        gateway: GatewayConfig {
            region: "ap-northeast-1".to_string(),
            endpoint: None,
            dry_run: false,
        },
        source: SourceConfig {
            url: "https://ranges.test/ip-ranges.json".to_string(),
            service: "CLOUDFRONT".to_string(),
        },
        engine: EngineConfig::default(),
    }
}

pub fn cidrs(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
