use thiserror::Error;

use crate::db_types::{NewNotification, Notification};

#[derive(Debug, Clone, Error)]
pub enum NotificationStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Notification {0} does not exist")]
    NotificationNotFound(i64),
}

impl From<sqlx::Error> for NotificationStoreError {
    fn from(e: sqlx::Error) -> Self {
        NotificationStoreError::DatabaseError(e.to_string())
    }
}

/// Per-recipient notification feeds.
#[allow(async_fn_in_trait)]
pub trait NotificationManagement {
    /// Stores the notifications atomically and returns them with their ids.
    async fn insert_notifications(
        &self,
        notifications: Vec<NewNotification>,
    ) -> Result<Vec<Notification>, NotificationStoreError>;

    /// Notifications for `recipient`, newest first. `page` is zero-based.
    async fn fetch_notifications(
        &self,
        recipient: &str,
        unread_only: bool,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Notification>, NotificationStoreError>;

    /// Marks a notification as read. Notifications addressed to someone else are reported as not found.
    async fn mark_notification_read(&self, recipient: &str, id: i64) -> Result<Notification, NotificationStoreError>;
}
