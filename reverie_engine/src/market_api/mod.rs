//! # Marketplace engine public API
//!
//! The `market_api` module exposes the programmatic API of the engine. Every API struct is created by supplying a
//! storage backend that implements the traits it needs, and every call takes the already-authenticated [`Caller`].
//!
//! * [`PostApi`] is the client side of a job request: create, edit, activate, deactivate, complete and delete.
//! * [`OfferFlowApi`] is the offer protocol: vendors make and retract offers, owners accept, reject and ask for
//!   changes. It keeps the vendor inventory ledger in step with accepted offers.
//! * [`InventoryApi`] initializes and reads vendor inventories.
//! * [`UserApi`] registers users.
//! * [`NotificationApi`] turns engine events into per-user notifications and serves the feeds.
//!
//! ```rust,ignore
//! use reverie_engine::{OfferFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = OfferFlowApi::new(db, pseudonyms, producers);
//! let offer = api.make_offer(&vendor, post_id, content, 1500.0).await?;
//! ```
//!
//! [`Caller`]: crate::db_types::Caller
mod config;
mod errors;
mod guards;
mod inventory_api;
mod job_request_api;
mod ledger;
mod notification_api;
mod offer_flow_api;
mod post_objects;
mod user_api;

pub use config::{EngineConfig, DEFAULT_STORE_TIMEOUT, NOTIFICATION_PAGE_SIZE, POST_PAGE_SIZE};
pub use errors::{MarketError, ResourceBound};
pub use inventory_api::InventoryApi;
pub use job_request_api::PostApi;
pub use notification_api::{MessageTemplate, NotificationApi};
pub use offer_flow_api::OfferFlowApi;
pub use post_objects::{VendorOffers, VendorPostView};
pub use user_api::UserApi;
