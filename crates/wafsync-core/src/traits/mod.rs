//! Core traits for the WAF sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`PrefixSource`]: Fetch the desired prefix list for one service
//! - [`FirewallGateway`]: Drive the firewall's remote IP set operations

pub mod firewall_gateway;
pub mod prefix_source;

pub use firewall_gateway::{ChangeToken, FirewallGateway, IpSetUpdate, UpdateAction};
pub use prefix_source::PrefixSource;
