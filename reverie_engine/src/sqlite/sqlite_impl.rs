//! `SqliteDatabase` is a concrete implementation of a marketplace storage backend.
//!
//! It implements all the traits defined in the [`crate::traits`] module.
//!
//! SQLite serialises writers. Every mutating method here opens a transaction whose first statement is a write, so the
//! write lock is held from the precondition check until commit.
use std::fmt::Debug;

use chrono::Utc;
use log::*;
use reverie_common::ResourceVector;
use sqlx::SqlitePool;

use super::db::{db_url, inventory, new_pool, notifications, offers, posts, users};
use crate::{
    db_types::{
        JobRequest,
        JobRequestUpdate,
        NewJobRequest,
        NewNotification,
        NewOffer,
        NewUser,
        Notification,
        Offer,
        OfferState,
        PostId,
        PostStatus,
        PostSummary,
        Role,
        User,
        VendorKey,
        VendorOfferView,
    },
    traits::{
        InventoryManagement,
        InventoryStoreError,
        JobRequestManagement,
        JobRequestStoreError,
        MarketplaceDatabase,
        NotificationManagement,
        NotificationStoreError,
        OpenPostQuery,
        UserManagement,
        UserStoreError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) {
        self.pool.close().await;
    }
}

impl JobRequestManagement for SqliteDatabase {
    async fn insert_post(&self, owner: &str, post: NewJobRequest) -> Result<JobRequest, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        let id = posts::insert_post(owner, &post, Utc::now(), &mut tx).await?;
        let result = posts::fetch_post(id, &mut tx).await?.ok_or(JobRequestStoreError::PostNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ New post {id} created by {owner}");
        Ok(result)
    }

    async fn fetch_post(&self, id: PostId) -> Result<Option<JobRequest>, JobRequestStoreError> {
        let mut conn = self.pool.acquire().await?;
        let post = posts::fetch_post(id, &mut conn).await?;
        Ok(post)
    }

    async fn update_post_details(
        &self,
        id: PostId,
        owner: &str,
        update: JobRequestUpdate,
    ) -> Result<JobRequest, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        posts::update_details(id, owner, &update, Utc::now(), &mut tx).await?;
        let result = posts::fetch_post(id, &mut tx).await?.ok_or(JobRequestStoreError::PostNotFound(id))?;
        tx.commit().await?;
        Ok(result)
    }

    async fn transition_status(
        &self,
        id: PostId,
        owner: &str,
        from: PostStatus,
        to: PostStatus,
    ) -> Result<JobRequest, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        posts::set_status(id, owner, from, to, Utc::now(), &mut tx).await?;
        // Read inside the transaction so the accepted set is exactly the one the transition froze.
        let result = posts::fetch_post(id, &mut tx).await?.ok_or(JobRequestStoreError::PostNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Post {id} is now {to}");
        Ok(result)
    }

    async fn upsert_pending_offer(
        &self,
        id: PostId,
        key: &VendorKey,
        offer: NewOffer,
    ) -> Result<Offer, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        posts::lock_post(id, None, PostStatus::Open, &mut tx).await?;
        let replaced = offers::delete_offer(id, key, OfferState::Pending, &mut tx).await?;
        let offer = Offer {
            vendor_name: offer.vendor_name,
            rate: offer.rate,
            content: offer.content,
            created_at: Utc::now(),
            accepted_at: None,
        };
        offers::insert_pending(id, key, &offer, &mut tx).await?;
        tx.commit().await?;
        if replaced {
            debug!("🗃️ Pending offer {key} on post {id} replaced with {}", offer.content);
        } else {
            debug!("🗃️ Pending offer {key} on post {id} created with {}", offer.content);
        }
        Ok(offer)
    }

    async fn remove_pending_offer(
        &self,
        id: PostId,
        key: &VendorKey,
        owner: Option<&str>,
    ) -> Result<Option<Offer>, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        posts::lock_post(id, owner, PostStatus::Open, &mut tx).await?;
        let offer = offers::fetch_offer(id, key, OfferState::Pending, &mut tx).await?;
        if offer.is_some() {
            offers::delete_offer(id, key, OfferState::Pending, &mut tx).await?;
            tx.commit().await?;
            debug!("🗃️ Pending offer {key} removed from post {id}");
        } else {
            trace!("🗃️ No pending offer {key} on post {id}. Nothing to remove");
        }
        Ok(offer)
    }

    async fn accept_pending_offer(
        &self,
        id: PostId,
        owner: &str,
        key: &VendorKey,
    ) -> Result<Offer, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        posts::lock_post(id, Some(owner), PostStatus::Open, &mut tx).await?;
        let mut offer = offers::fetch_offer(id, key, OfferState::Pending, &mut tx).await?.ok_or_else(|| {
            JobRequestStoreError::OfferNotFound { id, key: key.clone(), state: OfferState::Pending }
        })?;
        let short = posts::debit_requirements(id, &offer.content, &mut tx).await?;
        if !short.is_empty() {
            // Dropping the transaction rolls back the partial debit.
            debug!("🗃️ Offer {key} over-satisfies post {id} in {short:?}. Acceptance rolled back");
            return Err(JobRequestStoreError::RequirementConflict { id, categories: short });
        }
        let now = Utc::now();
        offer.accepted_at = Some(now);
        offers::merge_accepted(id, key, &offer, &mut tx).await?;
        offers::delete_offer(id, key, OfferState::Pending, &mut tx).await?;
        posts::touch_post(id, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Offer {key} accepted on post {id} with {}", offer.content);
        Ok(offer)
    }

    async fn remove_accepted_offer(
        &self,
        id: PostId,
        owner: &str,
        key: &VendorKey,
    ) -> Result<Offer, JobRequestStoreError> {
        let mut tx = self.pool.begin().await?;
        posts::lock_post(id, Some(owner), PostStatus::Open, &mut tx).await?;
        let offer = offers::fetch_offer(id, key, OfferState::Accepted, &mut tx).await?.ok_or_else(|| {
            JobRequestStoreError::OfferNotFound { id, key: key.clone(), state: OfferState::Accepted }
        })?;
        posts::credit_requirements(id, &offer.content, &mut tx).await?;
        offers::delete_offer(id, key, OfferState::Accepted, &mut tx).await?;
        posts::touch_post(id, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Accepted offer {key} removed from post {id}. {} credited back to requirements", offer.content);
        Ok(offer)
    }

    async fn fetch_open_posts(&self, query: OpenPostQuery) -> Result<Vec<PostSummary>, JobRequestStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = posts::search_open_posts(query, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_posts_for_owner(
        &self,
        owner: &str,
        statuses: &[PostStatus],
    ) -> Result<Vec<JobRequest>, JobRequestStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = posts::fetch_posts_for_owner(owner, statuses, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_posts_with_offer_from(
        &self,
        key: &VendorKey,
        state: OfferState,
        statuses: &[PostStatus],
    ) -> Result<Vec<VendorOfferView>, JobRequestStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = posts::fetch_posts_with_offer_from(key, state, statuses, &mut conn).await?;
        Ok(result)
    }
}

impl SqliteDatabase {
    async fn adjust_inventory(
        &self,
        vendor: &str,
        delta: ResourceVector,
    ) -> Result<ResourceVector, InventoryStoreError> {
        let mut tx = self.pool.begin().await?;
        if !users::touch_vendor(vendor, Utc::now(), &mut tx).await? {
            return Err(InventoryStoreError::VendorNotFound(vendor.to_string()));
        }
        let balance = inventory::adjust_balance(vendor, &delta, &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn initialize_inventory(
        &self,
        vendor: &str,
        inventory: ResourceVector,
    ) -> Result<ResourceVector, InventoryStoreError> {
        let mut tx = self.pool.begin().await?;
        if !users::claim_inventory_initialization(vendor, Utc::now(), &mut tx).await? {
            let is_vendor = users::fetch_user(vendor, &mut tx)
                .await?
                .is_some_and(|u| u.role == Role::Vendor);
            return if is_vendor {
                Err(InventoryStoreError::AlreadyInitialized(vendor.to_string()))
            } else {
                Err(InventoryStoreError::VendorNotFound(vendor.to_string()))
            };
        }
        let balance = inventory::adjust_balance(vendor, &inventory, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Inventory of {vendor} initialized to {balance}");
        Ok(balance)
    }

    async fn fetch_inventory(&self, vendor: &str) -> Result<Option<ResourceVector>, InventoryStoreError> {
        let mut conn = self.pool.acquire().await?;
        match users::fetch_user(vendor, &mut conn).await? {
            Some(user) if user.role == Role::Vendor => {
                let balance = inventory::fetch_balance(vendor, &mut conn).await?;
                Ok(Some(balance))
            },
            _ => Ok(None),
        }
    }

    async fn reserve(&self, vendor: &str, amount: ResourceVector) -> Result<ResourceVector, InventoryStoreError> {
        let balance = self.adjust_inventory(vendor, -amount).await?;
        debug!("🗃️ Reserved {amount} from {vendor}");
        Ok(balance)
    }

    async fn release(&self, vendor: &str, amount: ResourceVector) -> Result<ResourceVector, InventoryStoreError> {
        let balance = self.adjust_inventory(vendor, amount).await?;
        debug!("🗃️ Released {amount} to {vendor}");
        Ok(balance)
    }
}

impl UserManagement for SqliteDatabase {
    async fn insert_user(&self, user: NewUser) -> Result<User, UserStoreError> {
        let mut conn = self.pool.acquire().await?;
        let email = user.email.clone();
        let user = users::insert_user(user, Utc::now(), &mut conn)
            .await?
            .ok_or(UserStoreError::UserAlreadyExists(email))?;
        debug!("🗃️ User {} registered as {}", user.email, user.role);
        Ok(user)
    }

    async fn fetch_user(&self, email: &str) -> Result<Option<User>, UserStoreError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(email, &mut conn).await?;
        Ok(user)
    }
}

impl NotificationManagement for SqliteDatabase {
    async fn insert_notifications(
        &self,
        batch: Vec<NewNotification>,
    ) -> Result<Vec<Notification>, NotificationStoreError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();
        let mut result = Vec::with_capacity(batch.len());
        for notification in batch {
            result.push(notifications::insert_notification(notification, now, &mut tx).await?);
        }
        tx.commit().await?;
        trace!("🗃️ Stored {} notifications", result.len());
        Ok(result)
    }

    async fn fetch_notifications(
        &self,
        recipient: &str,
        unread_only: bool,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Notification>, NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = notifications::fetch_notifications(recipient, unread_only, page, page_size, &mut conn).await?;
        Ok(result)
    }

    async fn mark_notification_read(&self, recipient: &str, id: i64) -> Result<Notification, NotificationStoreError> {
        let mut conn = self.pool.acquire().await?;
        notifications::mark_read(recipient, id, &mut conn).await?.ok_or(NotificationStoreError::NotificationNotFound(id))
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Migrations are embedded in the binary.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}
