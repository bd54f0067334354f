use reverie_common::ResourceVector;
use serde::{Deserialize, Serialize};

use crate::db_types::{JobRequest, PostId, PostStatus};

/// The part of a post that event consumers need in order to address and describe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub id: PostId,
    pub owner: String,
    pub description: String,
}

impl From<&JobRequest> for PostRef {
    fn from(post: &JobRequest) -> Self {
        Self { id: post.id, owner: post.owner.clone(), description: post.description.clone() }
    }
}

/// Something happened to an offer. Published after the change has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OfferEvent {
    /// A vendor made (or replaced) a pending offer. The owner is told.
    Made { post: PostRef, vendor_name: String },
    /// A vendor withdrew their pending offer. The owner is told.
    Retracted { post: PostRef, vendor_name: String },
    /// The owner accepted a vendor's offer. The vendor is told.
    Accepted { post: PostRef, vendor: String },
    /// The owner rejected a pending or an accepted offer. The vendor is told.
    Rejected { post: PostRef, vendor: String, was_accepted: bool },
    /// The owner asked a vendor to change their pending offer to `desired`.
    ChangeRequested { post: PostRef, vendor: String, desired: ResourceVector },
}

impl OfferEvent {
    pub fn post(&self) -> &PostRef {
        match self {
            OfferEvent::Made { post, .. } |
            OfferEvent::Retracted { post, .. } |
            OfferEvent::Accepted { post, .. } |
            OfferEvent::Rejected { post, .. } |
            OfferEvent::ChangeRequested { post, .. } => post,
        }
    }
}

/// A post changed status. `vendors` holds the e-mails of every vendor with an accepted offer at the time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStatusChangedEvent {
    pub post: PostRef,
    pub old_status: PostStatus,
    pub new_status: PostStatus,
    pub vendors: Vec<String>,
}

impl PostStatusChangedEvent {
    pub fn new(post: &JobRequest, old_status: PostStatus, vendors: Vec<String>) -> Self {
        Self { post: PostRef::from(post), old_status, new_status: post.status, vendors }
    }
}
