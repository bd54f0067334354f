//! Precondition checks shared by the engine APIs. None of them touch storage.
use reverie_common::ResourceVector;

use crate::{
    db_types::{Caller, JobRequest, JobRequestUpdate, NewJobRequest, PostStatus, Role},
    market_api::{MarketError, ResourceBound},
};

pub(crate) fn require_role(caller: &Caller, role: Role, action: &str) -> Result<(), MarketError> {
    if caller.role == role {
        Ok(())
    } else {
        Err(MarketError::NotPermitted(format!("Only a {role} may {action}")))
    }
}

pub(crate) fn ensure_owner(post: &JobRequest, caller: &Caller) -> Result<(), MarketError> {
    if post.owner == caller.email {
        Ok(())
    } else {
        Err(MarketError::NotPermitted(format!("Post {} belongs to someone else", post.id)))
    }
}

pub(crate) fn ensure_status(post: &JobRequest, expected: PostStatus) -> Result<(), MarketError> {
    if post.status == expected {
        Ok(())
    } else {
        Err(MarketError::InvalidTransition { expected, actual: post.status })
    }
}

/// Offer content must lie within the per-category quantity range and must offer something.
pub(crate) fn validate_offer_content(content: &ResourceVector) -> Result<(), MarketError> {
    content.validate_quantities()?;
    if content.is_zero() {
        return Err(MarketError::ValidationError("An offer must contain at least one item".into()));
    }
    Ok(())
}

/// Row offset of a zero-based `page`. Negative pages and pages too far out to address are rejected.
pub(crate) fn page_offset(page: i64, page_size: i64) -> Result<i64, MarketError> {
    if page < 0 {
        return Err(MarketError::ValidationError(format!("{page} is not a valid page number")));
    }
    page.checked_mul(page_size).ok_or_else(|| MarketError::ValidationError(format!("Page {page} is out of range")))
}

pub(crate) fn validate_rate(rate: f64) -> Result<(), MarketError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(MarketError::ValidationError(format!("{rate} is not a valid rate")))
    }
}

pub(crate) fn check_bound(
    content: &ResourceVector,
    limit: &ResourceVector,
    bound: ResourceBound,
) -> Result<(), MarketError> {
    let exceeded = content.exceeding(limit);
    if exceeded.is_empty() {
        Ok(())
    } else {
        Err(MarketError::insufficient(bound, exceeded))
    }
}

fn validate_description(description: &str) -> Result<(), MarketError> {
    if description.trim().is_empty() {
        return Err(MarketError::ValidationError("A post needs a description".into()));
    }
    Ok(())
}

fn validate_requirements(requirements: &ResourceVector) -> Result<(), MarketError> {
    requirements.validate_quantities()?;
    if requirements.is_zero() {
        return Err(MarketError::ValidationError("A post must require at least one item".into()));
    }
    Ok(())
}

pub(crate) fn validate_new_post(post: &NewJobRequest) -> Result<(), MarketError> {
    validate_description(&post.description)?;
    post.location.validate().map_err(MarketError::ValidationError)?;
    validate_requirements(&post.requirements)
}

pub(crate) fn validate_update(update: &JobRequestUpdate) -> Result<(), MarketError> {
    if update.is_empty() {
        return Err(MarketError::ValidationError("The update does not change anything".into()));
    }
    if let Some(description) = &update.description {
        validate_description(description)?;
    }
    if let Some(location) = &update.location {
        location.validate().map_err(MarketError::ValidationError)?;
    }
    if let Some(requirements) = &update.requirements {
        requirements.validate_quantities()?;
    }
    Ok(())
}
