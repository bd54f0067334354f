use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Caller, JobRequest, JobRequestUpdate, NewJobRequest, PostId, PostStatus, Role},
    events::{EventProducers, PostStatusChangedEvent},
    helpers::with_store_timeout,
    market_api::{
        guards::{ensure_owner, require_role, validate_new_post, validate_update},
        ledger::{decode_accepted, release_to_vendors},
        EngineConfig,
        MarketError,
    },
    pseudonym::PseudonymScheme,
    traits::{InventoryManagement, JobRequestManagement},
};

/// `PostApi` drives the client side of a job request: creating and editing posts and moving them through their
/// lifecycle.
///
/// ```text
///              activate            mark_complete
///     OPEN  ------------->  ONGOING ------------>  COMPLETED
///       ^  <-------------
///       |    deactivate
///       +---- delete ---->  DELETED
/// ```
///
/// Leaving the board for good (`COMPLETED` or `DELETED`) returns the accepted inventory to the vendors.
pub struct PostApi<B> {
    db: B,
    pseudonyms: PseudonymScheme,
    producers: EventProducers,
    config: EngineConfig,
}

impl<B> Debug for PostApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PostApi")
    }
}

impl<B> PostApi<B> {
    pub fn new(db: B, pseudonyms: PseudonymScheme, producers: EventProducers) -> Self {
        Self { db, pseudonyms, producers, config: EngineConfig::default() }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PostApi<B>
where B: JobRequestManagement + InventoryManagement
{
    pub async fn create_job_request(&self, caller: &Caller, post: NewJobRequest) -> Result<JobRequest, MarketError> {
        require_role(caller, Role::Client, "create a post")?;
        validate_new_post(&post)?;
        let post = with_store_timeout(self.config.store_timeout, self.db.insert_post(&caller.email, post)).await?;
        info!("🔄️ {} created post {} needing {}", caller.email, post.id, post.requirements);
        Ok(post)
    }

    /// Edits an `OPEN` post.
    ///
    /// New requirements replace the remaining need as-is. They are not re-checked against the offers already on the
    /// post: accepted offers stay accepted, and pending offers are checked against the new requirements when they are
    /// accepted.
    pub async fn update_job_request(
        &self,
        caller: &Caller,
        id: PostId,
        update: JobRequestUpdate,
    ) -> Result<JobRequest, MarketError> {
        require_role(caller, Role::Client, "edit a post")?;
        validate_update(&update)?;
        let post =
            with_store_timeout(self.config.store_timeout, self.db.update_post_details(id, &caller.email, update))
                .await?;
        for (key, offer) in &post.pending {
            if !offer.content.fits_within(&post.requirements) {
                warn!(
                    "🔄️ Pending offer {key} on post {id} now exceeds the requirements in {:?}. It cannot be accepted \
                     as it stands.",
                    offer.content.exceeding(&post.requirements)
                );
            }
        }
        debug!("🔄️ Post {id} updated by {}", caller.email);
        Ok(post)
    }

    /// `OPEN` -> `ONGOING`. Offers are frozen from here on.
    pub async fn activate(&self, caller: &Caller, id: PostId) -> Result<JobRequest, MarketError> {
        self.transition(caller, id, PostStatus::Open, PostStatus::Ongoing).await
    }

    /// `ONGOING` -> `OPEN`.
    pub async fn deactivate(&self, caller: &Caller, id: PostId) -> Result<JobRequest, MarketError> {
        self.transition(caller, id, PostStatus::Ongoing, PostStatus::Open).await
    }

    /// `ONGOING` -> `COMPLETED`. Returns all accepted inventory to the vendors.
    pub async fn mark_complete(&self, caller: &Caller, id: PostId) -> Result<JobRequest, MarketError> {
        self.transition(caller, id, PostStatus::Ongoing, PostStatus::Completed).await
    }

    /// `OPEN` -> `DELETED`. Returns all accepted inventory to the vendors.
    pub async fn delete_job_request(&self, caller: &Caller, id: PostId) -> Result<JobRequest, MarketError> {
        self.transition(caller, id, PostStatus::Open, PostStatus::Deleted).await
    }

    async fn transition(
        &self,
        caller: &Caller,
        id: PostId,
        from: PostStatus,
        to: PostStatus,
    ) -> Result<JobRequest, MarketError> {
        require_role(caller, Role::Client, "change the status of a post")?;
        // The store reads the accepted set in the same transaction as the status change, so a second concurrent
        // completion fails here and cannot release the same inventory twice.
        let post =
            with_store_timeout(self.config.store_timeout, self.db.transition_status(id, &caller.email, from, to))
                .await?;
        info!("🔄️ Post {id} moved from {from} to {to} by {}", caller.email);
        let accepted = decode_accepted(&self.pseudonyms, &post);
        let vendors = accepted.iter().map(|(vendor, _)| vendor.clone()).collect::<Vec<_>>();
        if to.is_terminal() {
            release_to_vendors(&self.db, id, accepted, self.config.store_timeout).await;
        }
        self.producers.publish_status_changed(PostStatusChangedEvent::new(&post, from, vendors));
        Ok(post)
    }

    /// The caller's `OPEN` and `ONGOING` posts, with all their offers.
    pub async fn fetch_posts_owned_by_client(&self, caller: &Caller) -> Result<Vec<JobRequest>, MarketError> {
        require_role(caller, Role::Client, "list their posts")?;
        let statuses = [PostStatus::Open, PostStatus::Ongoing];
        with_store_timeout(self.config.store_timeout, self.db.fetch_posts_for_owner(&caller.email, &statuses)).await
    }

    pub async fn fetch_post_for_owner(&self, caller: &Caller, id: PostId) -> Result<JobRequest, MarketError> {
        require_role(caller, Role::Client, "view a post")?;
        let post = with_store_timeout(self.config.store_timeout, self.db.fetch_post(id))
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Post {id} does not exist")))?;
        ensure_owner(&post, caller)?;
        Ok(post)
    }
}
