//! Keeps vendor inventories in step with the accepted offers on posts.
//!
//! The post is the source of truth. When a ledger adjustment fails after the post change has committed, the
//! divergence is logged with the 🚨️ marker for an operator to reconcile.
use std::time::Duration;

use log::*;
use reverie_common::ResourceVector;

use crate::{
    db_types::{JobRequest, PostId},
    helpers::with_store_timeout,
    pseudonym::PseudonymScheme,
    traits::InventoryManagement,
};

/// Maps every accepted offer on the post to its vendor. Offers whose key cannot be decoded are logged and skipped.
pub(crate) fn decode_accepted(pseudonyms: &PseudonymScheme, post: &JobRequest) -> Vec<(String, ResourceVector)> {
    post.accepted
        .iter()
        .filter_map(|(key, offer)| match pseudonyms.identity_for(key) {
            Ok(vendor) => Some((vendor, offer.content)),
            Err(e) => {
                error!(
                    "🚨️ Accepted offer {key} on post {} cannot be traced to a vendor. {e}. Its content {} will not be \
                     returned to anyone automatically.",
                    post.id, offer.content
                );
                None
            },
        })
        .collect()
}

/// Returns the accepted content to each vendor. Never fails the caller; failures are logged for reconciliation.
pub(crate) async fn release_to_vendors<B: InventoryManagement>(
    db: &B,
    post_id: PostId,
    entries: Vec<(String, ResourceVector)>,
    limit: Duration,
) {
    if entries.is_empty() {
        trace!("🔄️ Post {post_id} has no accepted offers. Nothing to release");
        return;
    }
    let count = entries.len();
    match with_store_timeout(limit, db.bulk_release(entries.clone())).await {
        Ok(result) => {
            for (vendor, reason) in &result.failed {
                let amount = entries.iter().find(|(v, _)| v == vendor).map(|(_, a)| *a).unwrap_or_default();
                error!("🚨️ Post {post_id}: releasing {amount} to {vendor} failed. {reason}. Manual reconciliation needed.");
            }
            debug!("🔄️ Post {post_id}: released inventory to {} of {count} vendors", result.released.len());
        },
        Err(e) => {
            let summary = entries.iter().map(|(v, a)| format!("{v}: {a}")).collect::<Vec<_>>().join("; ");
            error!("🚨️ Post {post_id}: bulk release failed. {e}. Pending releases: {summary}");
        },
    }
}

/// Logs a balance that the ledger allowed to go negative.
pub(crate) fn report_balance(vendor: &str, balance: &ResourceVector) {
    let negatives = balance.negative_fields();
    if !negatives.is_empty() {
        error!(
            "🚨️ The inventory of {vendor} is negative in {negatives:?} ({balance}). Another reservation must have \
             raced this one."
        );
    }
}
