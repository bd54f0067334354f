use std::{fmt::Display, time::Duration};

use reverie_common::{Category, ResourceVectorError};
use thiserror::Error;

use crate::{
    db_types::PostStatus,
    pseudonym::{KeyDecodeError, PseudonymError},
    traits::{InventoryStoreError, JobRequestStoreError, NotificationStoreError, UserStoreError},
};

/// Which bound an offer would break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBound {
    /// The remaining requirements of the post.
    Requirement,
    /// The vendor's current inventory balance.
    VendorStock,
}

impl Display for ResourceBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceBound::Requirement => write!(f, "post requirements"),
            ResourceBound::VendorStock => write!(f, "vendor stock"),
        }
    }
}

/// The error taxonomy of the engine APIs. Every storage error is mapped onto one of these.
#[derive(Debug, Clone, Error)]
pub enum MarketError {
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid transition. The post is {actual}, but this operation requires it to be {expected}")]
    InvalidTransition { expected: PostStatus, actual: PostStatus },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Insufficient resources. The {bound} would be exceeded for {}", list(.categories))]
    InsufficientResource { bound: ResourceBound, categories: Vec<Category> },
    #[error("Already initialized: {0}")]
    AlreadyInitialized(String),
    #[error("A user with email {0} already exists")]
    UserAlreadyExists(String),
    #[error("Not permitted: {0}")]
    NotPermitted(String),
    #[error("Storage error: {0}")]
    StoreError(String),
    #[error("The storage call did not complete within {0:?}. Its outcome is unknown")]
    StoreTimeout(Duration),
    #[error("Partial commit. {completed} succeeded, but {failed_step} failed: {reason}")]
    PartialCommit { completed: String, failed_step: String, reason: String },
}

fn list(categories: &[Category]) -> String {
    categories.iter().map(Category::as_str).collect::<Vec<_>>().join(", ")
}

impl MarketError {
    pub fn insufficient(bound: ResourceBound, categories: Vec<Category>) -> Self {
        MarketError::InsufficientResource { bound, categories }
    }
}

impl From<JobRequestStoreError> for MarketError {
    fn from(e: JobRequestStoreError) -> Self {
        match e {
            JobRequestStoreError::DatabaseError(s) => MarketError::StoreError(s),
            JobRequestStoreError::PostNotFound(id) => MarketError::NotFound(format!("Post {id} does not exist")),
            JobRequestStoreError::NotPostOwner(id) => {
                MarketError::NotPermitted(format!("Post {id} belongs to someone else"))
            },
            JobRequestStoreError::StatusConflict { expected, actual, .. } => {
                MarketError::InvalidTransition { expected, actual }
            },
            e @ JobRequestStoreError::OfferNotFound { .. } => MarketError::NotFound(e.to_string()),
            JobRequestStoreError::RequirementConflict { categories, .. } => {
                MarketError::insufficient(ResourceBound::Requirement, categories)
            },
        }
    }
}

impl From<InventoryStoreError> for MarketError {
    fn from(e: InventoryStoreError) -> Self {
        match e {
            InventoryStoreError::DatabaseError(s) => MarketError::StoreError(s),
            e @ InventoryStoreError::VendorNotFound(_) => MarketError::NotFound(e.to_string()),
            InventoryStoreError::AlreadyInitialized(vendor) => {
                MarketError::AlreadyInitialized(format!("The inventory of {vendor} has already been initialized"))
            },
        }
    }
}

impl From<UserStoreError> for MarketError {
    fn from(e: UserStoreError) -> Self {
        match e {
            UserStoreError::DatabaseError(s) => MarketError::StoreError(s),
            UserStoreError::UserAlreadyExists(email) => MarketError::UserAlreadyExists(email),
        }
    }
}

impl From<NotificationStoreError> for MarketError {
    fn from(e: NotificationStoreError) -> Self {
        match e {
            NotificationStoreError::DatabaseError(s) => MarketError::StoreError(s),
            e @ NotificationStoreError::NotificationNotFound(_) => MarketError::NotFound(e.to_string()),
        }
    }
}

impl From<ResourceVectorError> for MarketError {
    fn from(e: ResourceVectorError) -> Self {
        MarketError::ValidationError(e.to_string())
    }
}

impl From<KeyDecodeError> for MarketError {
    fn from(e: KeyDecodeError) -> Self {
        MarketError::NotFound(format!("No vendor is known under this key. {e}"))
    }
}

impl From<PseudonymError> for MarketError {
    fn from(e: PseudonymError) -> Self {
        MarketError::StoreError(e.to_string())
    }
}
