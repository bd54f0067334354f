//! Reverie Marketplace Engine
//!
//! The engine reconciles offers against job requests and vendor inventories for a construction equipment
//! marketplace. Clients post job requests ("posts") that need quantities of equipment and labour. Vendors bid against
//! those posts from their own stock, under a pseudonymous key. Accepting a bid reserves the vendor's inventory, and
//! closing a post returns it.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend ([`SqliteDatabase`]). You should never need to call
//!    the backend directly. The data types it stores are defined in [`mod@db_types`] and are public.
//! 2. The engine public API ([`mod@market_api`]). This is where the business rules live: the post state machine,
//!    the offer protocol and the inventory ledger updates.
//!
//! The engine also emits events (see [`mod@events`]) after each committed change. The server hooks these up to the
//! notification feeds.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod market_api;
pub mod pseudonym;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use market_api::{
    EngineConfig,
    InventoryApi,
    MarketError,
    MessageTemplate,
    NotificationApi,
    OfferFlowApi,
    PostApi,
    ResourceBound,
    UserApi,
    VendorOffers,
    VendorPostView,
};
pub use pseudonym::{KeyDecodeError, PseudonymScheme};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    BulkReleaseResult,
    InventoryManagement,
    JobRequestManagement,
    MarketplaceDatabase,
    NotificationManagement,
    UserManagement,
};
