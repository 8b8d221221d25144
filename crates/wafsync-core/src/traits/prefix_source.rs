// # Prefix Source Trait
//
// Defines the interface for fetching the desired prefix list.
//
// ## Implementations
//
// - HTTP published document: `wafsync-prefix-http` crate
//
// The source produces the ordered sequence of CIDR strings for one named
// service, already filtered from the published document. The reconciler
// treats this output as the authoritative desired state for the run and
// places no further constraint on it: no deduplication, no reordering.

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prefix source implementations
///
/// # Constraints
///
/// Sources are thin fetch adapters:
/// - One fetch per method invocation, no caching between runs
/// - No retry logic (owned by the external scheduler)
/// - No filtering beyond service-name selection; the mask-length window is
///   the reconciler's concern
#[async_trait]
pub trait PrefixSource: Send + Sync {
    /// Fetch the desired CIDR list for the configured service.
    ///
    /// Returns prefixes in document order. An empty result is passed through
    /// as-is; the reconciler decides how to treat it.
    async fn fetch_prefixes(&self) -> Result<Vec<String>>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
