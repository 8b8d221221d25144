//! Pure batch planning
//!
//! Batch construction is deliberately free of I/O so the diff/filter rules
//! can be unit-tested without a gateway. The [`Reconciler`] wraps these
//! functions with the token lifecycle and the actual remote calls.
//!
//! [`Reconciler`]: crate::reconciler::Reconciler

use ipnet::IpNet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::IpSetUpdate;

/// Smallest mask length the firewall accepts for an IP set entry
pub const MASK_SUPPORT_MIN: u8 = 16;

/// Largest mask length the firewall accepts for an IP set entry
pub const MASK_SUPPORT_MAX: u8 = 32;

/// Delimiter used to join the desired list for the delete-phase containment test
pub const DESIRED_JOIN_DELIMITER: &str = "|";

/// Build the Insert batch from the desired prefix list.
///
/// Every entry is parsed as a CIDR; a malformed entry aborts the run with
/// [`Error::InvalidInput`] since the published feed is trusted to be
/// well-formed. Entries whose mask length falls outside
/// [`MASK_SUPPORT_MIN`]..=[`MASK_SUPPORT_MAX`] are dropped with a log line,
/// never an error. Surviving entries keep their relative order and are not
/// deduplicated.
pub fn insert_updates(desired: &[String]) -> Result<Vec<IpSetUpdate>> {
    let mut updates = Vec::with_capacity(desired.len());

    for cidr in desired {
        let net: IpNet = cidr
            .parse()
            .map_err(|_| Error::InvalidInput(cidr.clone()))?;

        let mask = net.prefix_len();
        if !(MASK_SUPPORT_MIN..=MASK_SUPPORT_MAX).contains(&mask) {
            debug!(cidr = %cidr, mask, "mask length outside supported window, dropping");
            continue;
        }

        updates.push(IpSetUpdate::insert(cidr.clone()));
    }

    Ok(updates)
}

/// Join the desired list into the single string the delete phase tests
/// containment against.
pub fn join_desired(desired: &[String]) -> String {
    desired.join(DESIRED_JOIN_DELIMITER)
}

/// Build the Delete batch: every current entry that does not occur in the
/// joined desired string becomes a delete candidate, in the order the
/// firewall reported them.
///
/// Membership is textual containment, not exact element comparison: an entry
/// is kept if it appears anywhere in the joined string. This matches the
/// deployed behavior this tool replaces.
pub fn delete_candidates(joined_desired: &str, current: &[String]) -> Vec<IpSetUpdate> {
    current
        .iter()
        .filter(|cidr| !joined_desired.contains(cidr.as_str()))
        .map(|cidr| IpSetUpdate::delete(cidr.clone()))
        .collect()
}
