use crate::traits::{InventoryManagement, JobRequestManagement, NotificationManagement, UserManagement};

/// The complete set of behaviour a storage backend needs to run the marketplace.
///
/// Backends are cheap to clone; every API struct holds its own copy.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase:
    Clone + JobRequestManagement + InventoryManagement + UserManagement + NotificationManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the underlying connections. The default does nothing.
    async fn close(&mut self) {}
}
