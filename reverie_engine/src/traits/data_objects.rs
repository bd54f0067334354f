use reverie_common::Category;
use serde::{Deserialize, Serialize};

use crate::db_types::VendorKey;

/// Outcome of [`crate::traits::InventoryManagement::bulk_release`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReleaseResult {
    /// Vendors whose release committed.
    pub released: Vec<String>,
    /// Vendors whose release failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl BulkReleaseResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Search parameters for the vendor feed of open posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPostQuery {
    /// Posts this vendor has already bid on, or been accepted on, are left out.
    pub vendor_key: VendorKey,
    /// Only posts that still need at least one of these categories are returned. Must not be empty.
    pub categories: Vec<Category>,
    /// Zero-based page number.
    pub page: i64,
    pub page_size: i64,
}

impl OpenPostQuery {
    pub fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }
}
