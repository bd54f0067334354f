//! # Storage backend contracts
//!
//! This module defines the behaviour a storage backend must expose to act as the marketplace store. The engine APIs
//! in [`crate::market_api`] are written against these traits only.
//!
//! * [`JobRequestManagement`] stores posts, their requirements and the pending and accepted offers on them. All the
//!   conditional mutations of a post (status transitions, offer acceptance and the like) are atomic here.
//! * [`InventoryManagement`] is the vendor inventory ledger.
//! * [`UserManagement`] stores registered users.
//! * [`NotificationManagement`] stores per-recipient notification feeds.
//! * [`MarketplaceDatabase`] bundles them all.
mod data_objects;
mod inventory_management;
mod job_request_management;
mod marketplace_database;
mod notification_management;
mod user_management;

pub use data_objects::{BulkReleaseResult, OpenPostQuery};
pub use inventory_management::{InventoryManagement, InventoryStoreError};
pub use job_request_management::{JobRequestManagement, JobRequestStoreError};
pub use marketplace_database::MarketplaceDatabase;
pub use notification_management::{NotificationManagement, NotificationStoreError};
pub use user_management::{UserManagement, UserStoreError};
