use std::fmt::Debug;

use log::*;
use reverie_common::ResourceVector;

use crate::{
    db_types::{Caller, Role},
    helpers::with_store_timeout,
    market_api::{guards::require_role, EngineConfig, MarketError},
    traits::InventoryManagement,
};

/// Access to the vendor inventory ledger from outside the offer flow.
pub struct InventoryApi<B> {
    db: B,
    config: EngineConfig,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    /// Sets the starting stock of `vendor`. Only an admin may do this, and only once per vendor.
    pub async fn initialize_vendor_inventory(
        &self,
        caller: &Caller,
        vendor: &str,
        inventory: ResourceVector,
    ) -> Result<ResourceVector, MarketError> {
        require_role(caller, Role::Admin, "initialize an inventory")?;
        inventory.validate_quantities()?;
        let balance =
            with_store_timeout(self.config.store_timeout, self.db.initialize_inventory(vendor, inventory)).await?;
        info!("🔄️ {} initialized the inventory of {vendor} to {balance}", caller.email);
        Ok(balance)
    }

    /// The caller's own current stock.
    pub async fn inventory_for(&self, caller: &Caller) -> Result<ResourceVector, MarketError> {
        require_role(caller, Role::Vendor, "view an inventory")?;
        with_store_timeout(self.config.store_timeout, self.db.fetch_inventory(&caller.email))
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("{} is not a registered vendor", caller.email)))
    }
}
