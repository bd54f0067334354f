use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewNotification, Notification},
    traits::NotificationStoreError,
};

pub async fn insert_notification(
    notification: NewNotification,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Notification, NotificationStoreError> {
    let desired = notification
        .desired_content
        .map(|v| serde_json::to_string(&v))
        .transpose()
        .map_err(|e| NotificationStoreError::DatabaseError(format!("Could not serialize the desired content. {e}")))?;
    let result: Notification = sqlx::query_as(
        r#"
            INSERT INTO notifications (recipient, post_id, kind, message, desired_content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(notification.recipient)
    .bind(notification.post_id)
    .bind(notification.kind)
    .bind(notification.message)
    .bind(desired)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(result)
}

/// Newest first. `page` is zero-based.
pub async fn fetch_notifications(
    recipient: &str,
    unread_only: bool,
    page: i64,
    page_size: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Notification>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM notifications WHERE recipient = ");
    builder.push_bind(recipient.to_string());
    if unread_only {
        builder.push(" AND is_read = 0");
    }
    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(page_size);
    builder.push(" OFFSET ");
    builder.push_bind(page.saturating_mul(page_size));
    let notifications = builder.build_query_as().fetch_all(conn).await?;
    Ok(notifications)
}

pub async fn mark_read(
    recipient: &str,
    id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Notification>, sqlx::Error> {
    let result = sqlx::query_as("UPDATE notifications SET is_read = 1 WHERE id = $1 AND recipient = $2 RETURNING *")
        .bind(id)
        .bind(recipient)
        .fetch_optional(conn)
        .await?;
    Ok(result)
}
