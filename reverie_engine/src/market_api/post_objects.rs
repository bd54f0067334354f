use serde::{Deserialize, Serialize};

use crate::db_types::{Offer, PostSummary, VendorOfferView};

/// A vendor's own offers across the marketplace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorOffers {
    /// `OPEN` posts carrying a pending offer from the vendor.
    pub pending: Vec<VendorOfferView>,
    /// `OPEN` or `ONGOING` posts carrying an accepted offer from the vendor.
    pub accepted: Vec<VendorOfferView>,
}

/// A single post as one vendor sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorPostView {
    pub post: PostSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<Offer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<Offer>,
}
