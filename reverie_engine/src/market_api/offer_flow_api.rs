use std::fmt::Debug;

use log::*;
use reverie_common::{Category, ResourceVector};

use crate::{
    db_types::{Caller, JobRequest, NewOffer, Offer, OfferState, PostId, PostStatus, PostSummary, Role, VendorKey},
    events::{EventProducers, OfferEvent, PostRef},
    helpers::with_store_timeout,
    market_api::{
        guards::{
            check_bound,
            ensure_owner,
            ensure_status,
            page_offset,
            require_role,
            validate_offer_content,
            validate_rate,
        },
        ledger::report_balance,
        EngineConfig,
        MarketError,
        ResourceBound,
        VendorOffers,
        VendorPostView,
    },
    pseudonym::PseudonymScheme,
    traits::{InventoryManagement, JobRequestManagement, OpenPostQuery},
};

/// `OfferFlowApi` runs the offer protocol between vendors and the owner of a post.
///
/// Vendors make, replace and retract pending offers. The owner accepts or rejects them, rejects previously accepted
/// offers, and asks vendors for changes. Every offer mutation requires the post to be `OPEN`.
///
/// Accepting an offer touches two aggregates. The post is updated first, atomically; the vendor's inventory is
/// reserved afterwards. If the reservation fails, the post keeps the acceptance and the call returns
/// [`MarketError::PartialCommit`].
pub struct OfferFlowApi<B> {
    db: B,
    pseudonyms: PseudonymScheme,
    producers: EventProducers,
    config: EngineConfig,
}

impl<B> Debug for OfferFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OfferFlowApi")
    }
}

impl<B> OfferFlowApi<B> {
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

    /// The key under which `vendor`'s offers are filed.
    pub fn vendor_key(&self, vendor: &str) -> Result<VendorKey, MarketError> {
        Ok(self.pseudonyms.key_for(vendor)?)
    }
}

impl<B> OfferFlowApi<B>
where B: JobRequestManagement + InventoryManagement
{
    async fn fetch_post(&self, id: PostId) -> Result<JobRequest, MarketError> {
        with_store_timeout(self.config.store_timeout, self.db.fetch_post(id))
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("Post {id} does not exist")))
    }

    async fn vendor_stock(&self, vendor: &str) -> Result<ResourceVector, MarketError> {
        with_store_timeout(self.config.store_timeout, self.db.fetch_inventory(vendor))
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("{vendor} is not a registered vendor")))
    }

    //----------------------------------------   Vendor side   ----------------------------------------------------

    /// Makes an offer on an `OPEN` post, replacing any pending offer the vendor already has there.
    ///
    /// The content must be non-negative, offer something, fit within the remaining requirements and fit within the
    /// vendor's current stock. Nothing is reserved until the owner accepts.
    pub async fn make_offer(
        &self,
        caller: &Caller,
        id: PostId,
        content: ResourceVector,
        rate: f64,
    ) -> Result<Offer, MarketError> {
        require_role(caller, Role::Vendor, "make an offer")?;
        validate_offer_content(&content)?;
        validate_rate(rate)?;
        let post = self.fetch_post(id).await?;
        ensure_status(&post, PostStatus::Open)?;
        check_bound(&content, &post.requirements, ResourceBound::Requirement)?;
        let stock = self.vendor_stock(&caller.email).await?;
        check_bound(&content, &stock, ResourceBound::VendorStock)?;
        let key = self.vendor_key(&caller.email)?;
        let offer = NewOffer { vendor_name: caller.name.clone(), rate, content };
        let offer = with_store_timeout(self.config.store_timeout, self.db.upsert_pending_offer(id, &key, offer)).await?;
        info!("🔄️ {} offered {content} on post {id}", caller.email);
        self.producers
            .publish_offer_event(OfferEvent::Made { post: PostRef::from(&post), vendor_name: caller.name.clone() });
        Ok(offer)
    }

    /// Withdraws the caller's pending offer. Returns `false` if there was nothing to withdraw.
    pub async fn retract_offer(&self, caller: &Caller, id: PostId) -> Result<bool, MarketError> {
        require_role(caller, Role::Vendor, "retract an offer")?;
        let key = self.vendor_key(&caller.email)?;
        let removed = with_store_timeout(self.config.store_timeout, self.db.remove_pending_offer(id, &key, None)).await?;
        let Some(offer) = removed else {
            debug!("🔄️ {} has no pending offer on post {id}", caller.email);
            return Ok(false);
        };
        info!("🔄️ {} retracted their offer of {} from post {id}", caller.email, offer.content);
        if let Ok(post) = self.fetch_post(id).await {
            self.producers
                .publish_offer_event(OfferEvent::Retracted { post: PostRef::from(&post), vendor_name: offer.vendor_name });
        }
        Ok(true)
    }

    /// `OPEN` posts that still need any of `categories`, leaving out posts the caller already has an offer on.
    /// Oldest activity first; `page` is zero-based.
    pub async fn fetch_open_posts_for_vendor(
        &self,
        caller: &Caller,
        categories: &[String],
        page: i64,
    ) -> Result<Vec<PostSummary>, MarketError> {
        require_role(caller, Role::Vendor, "browse open posts")?;
        if categories.is_empty() {
            return Err(MarketError::ValidationError("At least one category is required".into()));
        }
        page_offset(page, self.config.post_page_size)?;
        let categories =
            categories.iter().map(|c| c.trim().parse::<Category>()).collect::<Result<Vec<_>, _>>()?;
        let query = OpenPostQuery {
            vendor_key: self.vendor_key(&caller.email)?,
            categories,
            page,
            page_size: self.config.post_page_size,
        };
        with_store_timeout(self.config.store_timeout, self.db.fetch_open_posts(query)).await
    }

    pub async fn fetch_offers_for_vendor(&self, caller: &Caller) -> Result<VendorOffers, MarketError> {
        require_role(caller, Role::Vendor, "list their offers")?;
        let key = self.vendor_key(&caller.email)?;
        let timeout = self.config.store_timeout;
        let pending =
            with_store_timeout(timeout, self.db.fetch_posts_with_offer_from(&key, OfferState::Pending, &[
                PostStatus::Open,
            ]))
            .await?;
        let accepted =
            with_store_timeout(timeout, self.db.fetch_posts_with_offer_from(&key, OfferState::Accepted, &[
                PostStatus::Open,
                PostStatus::Ongoing,
            ]))
            .await?;
        Ok(VendorOffers { pending, accepted })
    }

    pub async fn fetch_post_for_vendor(&self, caller: &Caller, id: PostId) -> Result<VendorPostView, MarketError> {
        require_role(caller, Role::Vendor, "view a post")?;
        let key = self.vendor_key(&caller.email)?;
        let post = self.fetch_post(id).await?;
        let pending = post.pending.get(&key).cloned();
        let accepted = post.accepted.get(&key).cloned();
        Ok(VendorPostView { post: post.summary(), pending, accepted })
    }

    //----------------------------------------    Owner side   ----------------------------------------------------

    /// Asks the vendor behind `key` to change their pending offer to `desired`. Nothing on the post changes; the
    /// vendor is notified.
    pub async fn request_offer_change(
        &self,
        caller: &Caller,
        id: PostId,
        key: &VendorKey,
        desired: ResourceVector,
    ) -> Result<(), MarketError> {
        require_role(caller, Role::Client, "request an offer change")?;
        validate_offer_content(&desired)?;
        let post = self.fetch_post(id).await?;
        ensure_owner(&post, caller)?;
        ensure_status(&post, PostStatus::Open)?;
        if !post.pending.contains_key(key) {
            return Err(MarketError::NotFound(format!("Post {id} has no pending offer under key {key}")));
        }
        check_bound(&desired, &post.requirements, ResourceBound::Requirement)?;
        let vendor = self.pseudonyms.identity_for(key)?;
        let stock = self.vendor_stock(&vendor).await?;
        check_bound(&desired, &stock, ResourceBound::VendorStock)?;
        debug!("🔄️ Owner of post {id} asked for {desired} from offer {key}");
        self.producers.publish_offer_event(OfferEvent::ChangeRequested { post: PostRef::from(&post), vendor, desired });
        Ok(())
    }

    /// Accepts the pending offer under `key`.
    ///
    /// The offer is checked against the requirements and the vendor's stock, then accepted atomically on the post
    /// (requirements debited, content merged into any earlier acceptance from the same vendor). The vendor's
    /// inventory is reserved afterwards. Returns the offer that was accepted.
    pub async fn accept_offer(&self, caller: &Caller, id: PostId, key: &VendorKey) -> Result<Offer, MarketError> {
        require_role(caller, Role::Client, "accept an offer")?;
        let post = self.fetch_post(id).await?;
        ensure_owner(&post, caller)?;
        ensure_status(&post, PostStatus::Open)?;
        let pending = post
            .pending
            .get(key)
            .ok_or_else(|| MarketError::NotFound(format!("Post {id} has no pending offer under key {key}")))?;
        check_bound(&pending.content, &post.requirements, ResourceBound::Requirement)?;
        let vendor = self.pseudonyms.identity_for(key)?;
        let stock = self.vendor_stock(&vendor).await?;
        check_bound(&pending.content, &stock, ResourceBound::VendorStock)?;

        let timeout = self.config.store_timeout;
        let accepted = with_store_timeout(timeout, self.db.accept_pending_offer(id, &caller.email, key)).await?;
        info!("🔄️ Offer {key} on post {id} accepted with {}", accepted.content);

        let reservation = with_store_timeout(timeout, self.db.reserve(&vendor, accepted.content)).await;
        self.producers.publish_offer_event(OfferEvent::Accepted { post: PostRef::from(&post), vendor: vendor.clone() });
        match reservation {
            Ok(balance) => {
                report_balance(&vendor, &balance);
                debug!("🔄️ Reserved {} from {vendor}. Balance: {balance}", accepted.content);
                Ok(accepted)
            },
            Err(e) => {
                error!(
                    "🚨️ Offer {key} on post {id} was accepted, but reserving {} from {vendor} failed. {e}. The \
                     inventory ledger must be reconciled by hand.",
                    accepted.content
                );
                Err(MarketError::PartialCommit {
                    completed: format!("Accepting offer {key} on post {id}"),
                    failed_step: format!("reserving {} from the vendor", accepted.content),
                    reason: e.to_string(),
                })
            },
        }
    }

    /// Removes the pending offer under `key`. The vendor is notified.
    pub async fn reject_pending_offer(&self, caller: &Caller, id: PostId, key: &VendorKey) -> Result<Offer, MarketError> {
        require_role(caller, Role::Client, "reject an offer")?;
        let removed =
            with_store_timeout(self.config.store_timeout, self.db.remove_pending_offer(id, key, Some(&caller.email)))
                .await?
                .ok_or_else(|| MarketError::NotFound(format!("Post {id} has no pending offer under key {key}")))?;
        info!("🔄️ Pending offer {key} on post {id} rejected");
        self.notify_rejection(id, key, false).await;
        Ok(removed)
    }

    /// Removes the accepted offer under `key`, credits its content back to the requirements and returns it to the
    /// vendor's inventory.
    pub async fn reject_accepted_offer(
        &self,
        caller: &Caller,
        id: PostId,
        key: &VendorKey,
    ) -> Result<Offer, MarketError> {
        require_role(caller, Role::Client, "reject an offer")?;
        // Decode first: an offer we cannot trace to a vendor cannot be released, so it must stay accepted.
        let vendor = self.pseudonyms.identity_for(key)?;
        let timeout = self.config.store_timeout;
        let removed = with_store_timeout(timeout, self.db.remove_accepted_offer(id, &caller.email, key)).await?;
        info!("🔄️ Accepted offer {key} on post {id} rejected. {} is back on the requirements", removed.content);
        let release = with_store_timeout(timeout, self.db.release(&vendor, removed.content)).await;
        self.notify_rejection(id, key, true).await;
        match release {
            Ok(balance) => {
                debug!("🔄️ Released {} to {vendor}. Balance: {balance}", removed.content);
                Ok(removed)
            },
            Err(e) => {
                error!(
                    "🚨️ Accepted offer {key} on post {id} was rejected, but releasing {} to {vendor} failed. {e}. The \
                     inventory ledger must be reconciled by hand.",
                    removed.content
                );
                Err(MarketError::PartialCommit {
                    completed: format!("Rejecting accepted offer {key} on post {id}"),
                    failed_step: format!("releasing {} to the vendor", removed.content),
                    reason: e.to_string(),
                })
            },
        }
    }

    async fn notify_rejection(&self, id: PostId, key: &VendorKey, was_accepted: bool) {
        let vendor = match self.pseudonyms.identity_for(key) {
            Ok(v) => v,
            Err(e) => {
                warn!("🔄️ Cannot notify the vendor behind {key} of the rejection. {e}");
                return;
            },
        };
        match self.fetch_post(id).await {
            Ok(post) => self.producers.publish_offer_event(OfferEvent::Rejected {
                post: PostRef::from(&post),
                vendor,
                was_accepted,
            }),
            Err(e) => warn!("🔄️ Cannot notify {vendor} of the rejection on post {id}. {e}"),
        }
    }
}
