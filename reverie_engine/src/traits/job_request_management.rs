use reverie_common::Category;
use thiserror::Error;

use crate::{
    db_types::{
        JobRequest,
        JobRequestUpdate,
        NewJobRequest,
        NewOffer,
        Offer,
        OfferState,
        PostId,
        PostStatus,
        PostSummary,
        VendorKey,
        VendorOfferView,
    },
    traits::data_objects::OpenPostQuery,
};

#[derive(Debug, Clone, Error)]
pub enum JobRequestStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Post {0} does not exist")]
    PostNotFound(PostId),
    #[error("Post {0} belongs to someone else")]
    NotPostOwner(PostId),
    #[error("Post {id} is {actual}, but this operation requires it to be {expected}")]
    StatusConflict { id: PostId, expected: PostStatus, actual: PostStatus },
    #[error("Post {id} has no {state} offer under key {key}")]
    OfferNotFound { id: PostId, key: VendorKey, state: OfferState },
    #[error("Accepting this offer would over-satisfy post {id} in {categories:?}")]
    RequirementConflict { id: PostId, categories: Vec<Category> },
}

impl From<sqlx::Error> for JobRequestStoreError {
    fn from(e: sqlx::Error) -> Self {
        JobRequestStoreError::DatabaseError(e.to_string())
    }
}

/// Storage for job requests ("posts") and the offers filed against them.
///
/// Every mutating method is a single atomic unit. Preconditions on status and ownership are checked inside the same
/// unit as the write, so two conflicting calls can never both succeed. When a precondition fails, the returned error
/// says which one: a missing post, a foreign owner, or the wrong status.
#[allow(async_fn_in_trait)]
pub trait JobRequestManagement {
    /// Stores a new `OPEN` post for `owner`.
    async fn insert_post(&self, owner: &str, post: NewJobRequest) -> Result<JobRequest, JobRequestStoreError>;

    async fn fetch_post(&self, id: PostId) -> Result<Option<JobRequest>, JobRequestStoreError>;

    /// Patches the description, location and requirements of an `OPEN` post owned by `owner`.
    ///
    /// New requirements replace the current ones wholesale. Offers already on the post are left as they are.
    async fn update_post_details(
        &self,
        id: PostId,
        owner: &str,
        update: JobRequestUpdate,
    ) -> Result<JobRequest, JobRequestStoreError>;

    /// Moves a post owned by `owner` from `from` to `to` and returns the post as it is after the move, including the
    /// accepted offers at that instant.
    async fn transition_status(
        &self,
        id: PostId,
        owner: &str,
        from: PostStatus,
        to: PostStatus,
    ) -> Result<JobRequest, JobRequestStoreError>;

    /// Files (or replaces) the pending offer stored under `key`. The post must be `OPEN`.
    async fn upsert_pending_offer(
        &self,
        id: PostId,
        key: &VendorKey,
        offer: NewOffer,
    ) -> Result<Offer, JobRequestStoreError>;

    /// Removes the pending offer stored under `key` from an `OPEN` post. When `owner` is given, the post must belong
    /// to them. Returns `None` if there was no pending offer under that key.
    async fn remove_pending_offer(
        &self,
        id: PostId,
        key: &VendorKey,
        owner: Option<&str>,
    ) -> Result<Option<Offer>, JobRequestStoreError>;

    /// Moves the pending offer under `key` into the accepted set of an `OPEN` post owned by `owner`.
    ///
    /// In one atomic unit, the offer content is debited from the requirements, merged (summed) into any offer
    /// already accepted under the same key, and the pending entry is removed. If any requirement would go negative,
    /// nothing changes and [`JobRequestStoreError::RequirementConflict`] names the categories.
    ///
    /// Returns the offer that was accepted, i.e. the pending content rather than the merged total.
    async fn accept_pending_offer(
        &self,
        id: PostId,
        owner: &str,
        key: &VendorKey,
    ) -> Result<Offer, JobRequestStoreError>;

    /// Removes the accepted offer under `key` from an `OPEN` post owned by `owner` and credits its content back to the
    /// requirements. Returns the removed offer.
    async fn remove_accepted_offer(
        &self,
        id: PostId,
        owner: &str,
        key: &VendorKey,
    ) -> Result<Offer, JobRequestStoreError>;

    /// The `OPEN` posts a vendor may still bid on, oldest activity first.
    async fn fetch_open_posts(&self, query: OpenPostQuery) -> Result<Vec<PostSummary>, JobRequestStoreError>;

    /// All posts owned by `owner` whose status is one of `statuses`, newest first.
    async fn fetch_posts_for_owner(
        &self,
        owner: &str,
        statuses: &[PostStatus],
    ) -> Result<Vec<JobRequest>, JobRequestStoreError>;

    /// Posts with an offer in `state` filed under `key`, restricted to `statuses`.
    async fn fetch_posts_with_offer_from(
        &self,
        key: &VendorKey,
        state: OfferState,
        statuses: &[PostStatus],
    ) -> Result<Vec<VendorOfferView>, JobRequestStoreError>;
}
