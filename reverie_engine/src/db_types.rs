use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use reverie_common::ResourceVector;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

//--------------------------------------        PostId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PostId(pub i64);

impl PostId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for PostId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for PostId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self).map_err(|e| ConversionError(format!("{s} is not a valid post id. {e}")))
    }
}

//--------------------------------------      VendorKey      ---------------------------------------------------------
/// The pseudonymous key under which a vendor's offers are filed on a post.
///
/// Keys are produced by [`crate::PseudonymScheme`] and are opaque everywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct VendorKey(pub String);

impl VendorKey {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for VendorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for VendorKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for VendorKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Type conversion error: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------         Role        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Client,
    Vendor,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Vendor => write!(f, "vendor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            _ => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------        Caller       ---------------------------------------------------------
/// An already-authenticated caller, as resolved by the identity layer. The engine trusts it fully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl Caller {
    pub fn new<S1: Into<String>, S2: Into<String>>(email: S1, name: S2, role: Role) -> Self {
        Self { email: email.into(), name: name.into(), role }
    }
}

//--------------------------------------         User        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub email: String,
    pub username: String,
    pub role: Role,
    pub inventory_initialized: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub role: Role,
}

impl NewUser {
    pub fn new<S1: Into<String>, S2: Into<String>>(email: S1, username: S2, role: Role) -> Self {
        Self { email: email.into(), username: username.into(), role }
    }
}

//--------------------------------------      PostStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum PostStatus {
    /// Accepting offers. Offers and requirements may change.
    Open,
    /// Work is in progress. No offer may change.
    Ongoing,
    /// Terminal. Accepted inventory has been returned to the vendors.
    Completed,
    /// Terminal. The client withdrew the post.
    Deleted,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Open => "OPEN",
            PostStatus::Ongoing => "ONGOING",
            PostStatus::Completed => "COMPLETED",
            PostStatus::Deleted => "DELETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PostStatus::Completed | PostStatus::Deleted)
    }
}

impl Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(PostStatus::Open),
            "ONGOING" => Ok(PostStatus::Ongoing),
            "COMPLETED" => Ok(PostStatus::Completed),
            "DELETED" => Ok(PostStatus::Deleted),
            _ => Err(ConversionError(format!("Invalid post status: {s}"))),
        }
    }
}

//--------------------------------------       Location      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new<S: Into<String>>(place: S, latitude: f64, longitude: f64) -> Self {
        Self { place: place.into(), latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.place.trim().is_empty() {
            return Err("The location must name a place".into());
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("{} is not a valid latitude", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("{} is not a valid longitude", self.longitude));
        }
        Ok(())
    }
}

//--------------------------------------     Job requests    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJobRequest {
    pub description: String,
    pub location: Location,
    pub requirements: ResourceVector,
}

impl NewJobRequest {
    pub fn new<S: Into<String>>(description: S, location: Location, requirements: ResourceVector) -> Self {
        Self { description: description.into(), location, requirements }
    }
}

/// A patch for an `OPEN` post. Fields that are `None` are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequestUpdate {
    pub description: Option<String>,
    pub location: Option<Location>,
    pub requirements: Option<ResourceVector>,
}

impl JobRequestUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.location.is_none() && self.requirements.is_none()
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_requirements(mut self, requirements: ResourceVector) -> Self {
        self.requirements = Some(requirements);
        self
    }
}

/// A job request ("post") with its full offer ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub id: PostId,
    pub owner: String,
    pub description: String,
    pub location: Location,
    /// What the client still needs. Debited by acceptance, credited by rejection of an accepted offer.
    pub requirements: ResourceVector,
    pub status: PostStatus,
    pub pending: BTreeMap<VendorKey, Offer>,
    pub accepted: BTreeMap<VendorKey, Offer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRequest {
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.id,
            description: self.description.clone(),
            location: self.location.clone(),
            requirements: self.requirements,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Sum of every accepted offer on this post.
    pub fn total_accepted(&self) -> ResourceVector {
        self.accepted.values().fold(ResourceVector::zero(), |acc, offer| acc + offer.content)
    }
}

/// The vendor-facing projection of a post. It never exposes the owner or other vendors' offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: PostId,
    pub description: String,
    pub location: Location,
    pub requirements: ResourceVector,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Offers       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum OfferState {
    Pending,
    Accepted,
}

impl OfferState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferState::Pending => "PENDING",
            OfferState::Accepted => "ACCEPTED",
        }
    }
}

impl Display for OfferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOffer {
    pub vendor_name: String,
    /// The vendor's asking rate for the offered resources.
    pub rate: f64,
    pub content: ResourceVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub vendor_name: String,
    pub rate: f64,
    pub content: ResourceVector,
    pub created_at: DateTime<Utc>,
    /// Only set on accepted offers. Tracks the most recent acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

/// A post as seen by one vendor, together with that vendor's own offer on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorOfferView {
    pub post: PostSummary,
    pub offer: Offer,
}

//--------------------------------------    Notifications    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// Informational message about an offer or a post status change.
    Info,
    /// The owner of a post asked the vendor to change their offer. Carries the desired content.
    RequestOfferChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient: String,
    pub post_id: PostId,
    pub kind: NotificationType,
    pub message: String,
    pub desired_content: Option<ResourceVector>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient: String,
    pub post_id: PostId,
    pub kind: NotificationType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_content: Option<ResourceVector>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Notification {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let desired: Option<String> = row.try_get("desired_content")?;
        let desired_content = desired
            .map(|s| serde_json::from_str::<ResourceVector>(&s))
            .transpose()
            .map_err(|e| sqlx::Error::ColumnDecode { index: "desired_content".into(), source: Box::new(e) })?;
        Ok(Self {
            id: row.try_get("id")?,
            recipient: row.try_get("recipient")?,
            post_id: row.try_get("post_id")?,
            kind: row.try_get("kind")?,
            message: row.try_get("message")?,
            desired_content,
            read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
