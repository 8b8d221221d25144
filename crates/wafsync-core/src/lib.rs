// # wafsync-core
//
// Core library for the WAF IP set reconciliation system.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping a regional WAF
// IP set in sync with a published prefix list:
// - **PrefixSource**: Trait for fetching the desired prefix list for one service
// - **FirewallGateway**: Trait for the firewall's remote IP set operations
// - **Reconciler**: Core engine that drives the insert → read → delete flow
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Pure Planning**: Batch construction is pure and unit-testable without I/O
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Stateless Runs**: Every invocation reconciles from scratch against live
//    remote state; nothing is persisted between runs

pub mod traits;
pub mod reconciler;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{FirewallGateway, PrefixSource, ChangeToken, IpSetUpdate, UpdateAction};
pub use reconciler::{Reconciler, RunSummary, SyncEvent};
pub use config::{SyncConfig, GatewayConfig, SourceConfig, EngineConfig};
pub use error::{Error, ProtocolErrorKind, Result};
