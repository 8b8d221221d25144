// # Firewall Gateway Trait
//
// Defines the interface to the firewall's remote IP set API.
//
// ## Implementations
//
// - Regional WAF: `wafsync-gateway-wafregional` crate
//
// ## Mutation protocol
//
// Every mutation call requires a freshly issued, single-use change token.
// The token is issued immediately before one `apply_updates` call, consumed
// by that call, and never reused or cached across calls or runs. At most one
// mutation call may be outstanding against a given token; the protocol
// exists to serialize concurrent writers, and a consumed or expired token
// surfaces as [`ProtocolErrorKind::StaleChangeToken`].
//
// [`ProtocolErrorKind::StaleChangeToken`]: crate::error::ProtocolErrorKind::StaleChangeToken

use async_trait::async_trait;
use crate::error::Result;

/// A single-use credential required by every mutation call.
///
/// Issued by [`FirewallGateway::issue_change_token`] immediately before one
/// `apply_updates` call and consumed by it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeToken(pub String);

impl ChangeToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether an update adds or removes an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Insert,
    Delete,
}

/// One (action, CIDR) pair of an update batch.
///
/// A batch is homogeneous: one run submits exactly one Insert batch and,
/// after re-reading remote state, exactly one Delete batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpSetUpdate {
    pub action: UpdateAction,
    pub cidr: String,
}

impl IpSetUpdate {
    pub fn insert(cidr: impl Into<String>) -> Self {
        Self {
            action: UpdateAction::Insert,
            cidr: cidr.into(),
        }
    }

    pub fn delete(cidr: impl Into<String>) -> Self {
        Self {
            action: UpdateAction::Delete,
            cidr: cidr.into(),
        }
    }
}

/// Trait for firewall gateway implementations
///
/// This trait defines the three remote operations the reconciler drives.
/// Implementations must handle the specifics of the firewall's wire protocol.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Constraints
///
/// Gateways are thin protocol adapters:
/// - One remote call per method invocation
/// - No retry or backoff logic (the run either succeeds or aborts; operational
///   retry belongs to the external scheduler)
/// - No caching of tokens or set contents
/// - No background tasks
///
/// Structured protocol errors must be mapped to
/// [`Error::Protocol`](crate::Error::Protocol) with their kind tag before
/// propagation; anything else is an opaque
/// [`Error::Transport`](crate::Error::Transport).
#[async_trait]
pub trait FirewallGateway: Send + Sync {
    /// Issue a fresh single-use change token.
    ///
    /// Must be called immediately before each `apply_updates` call; the
    /// token is invalid once consumed.
    async fn issue_change_token(&self) -> Result<ChangeToken>;

    /// Read the current contents of the IP set, in the order the firewall
    /// reports them.
    async fn read_ip_set(&self, set_id: &str) -> Result<Vec<String>>;

    /// Submit one update batch atomically against a freshly issued token.
    ///
    /// The batch either fully succeeds or the call fails; there is no
    /// partial-success state. An empty batch is a valid no-op submission.
    async fn apply_updates(
        &self,
        set_id: &str,
        token: &ChangeToken,
        batch: &[IpSetUpdate],
    ) -> Result<()>;
}
