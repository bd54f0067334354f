use log::*;
use reverie_common::ResourceVector;
use thiserror::Error;

use crate::traits::data_objects::BulkReleaseResult;

#[derive(Debug, Clone, Error)]
pub enum InventoryStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{0} is not a registered vendor")]
    VendorNotFound(String),
    #[error("The inventory of {0} has already been initialized")]
    AlreadyInitialized(String),
}

impl From<sqlx::Error> for InventoryStoreError {
    fn from(e: sqlx::Error) -> Self {
        InventoryStoreError::DatabaseError(e.to_string())
    }
}

/// The vendor inventory ledger.
///
/// `reserve` and `release` are unconditional field-wise adjustments. The ledger does not veto a reservation that
/// drives a balance below zero; callers check availability beforehand and the ledger reports the resulting balance.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Sets the starting inventory of a vendor. This can happen exactly once per vendor.
    async fn initialize_inventory(
        &self,
        vendor: &str,
        inventory: ResourceVector,
    ) -> Result<ResourceVector, InventoryStoreError>;

    /// The current balance of `vendor`, or `None` if they are not a registered vendor.
    async fn fetch_inventory(&self, vendor: &str) -> Result<Option<ResourceVector>, InventoryStoreError>;

    /// Debits `amount` from the vendor's balance and returns the new balance.
    async fn reserve(&self, vendor: &str, amount: ResourceVector) -> Result<ResourceVector, InventoryStoreError>;

    /// Credits `amount` to the vendor's balance and returns the new balance.
    async fn release(&self, vendor: &str, amount: ResourceVector) -> Result<ResourceVector, InventoryStoreError>;

    /// Releases every entry independently. A failure on one entry does not stop the others.
    async fn bulk_release(
        &self,
        entries: Vec<(String, ResourceVector)>,
    ) -> Result<BulkReleaseResult, InventoryStoreError> {
        let mut result = BulkReleaseResult::default();
        for (vendor, amount) in entries {
            match self.release(&vendor, amount).await {
                Ok(balance) => {
                    trace!("🗃️ Released {amount} to {vendor}. Balance is now {balance}");
                    result.released.push(vendor);
                },
                Err(e) => {
                    warn!("🗃️ Could not release {amount} to {vendor}. {e}");
                    result.failed.push((vendor, e.to_string()));
                },
            }
        }
        Ok(result)
    }
}
