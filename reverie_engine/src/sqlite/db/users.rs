use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{NewUser, Role, User};

/// Inserts the user, returning `None` if the email is already registered.
pub async fn insert_user(
    user: NewUser,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as(
        r#"
            INSERT INTO users (email, username, role, created_at, updated_at) VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(user.email)
    .bind(user.username)
    .bind(user.role)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn fetch_user(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(conn).await?;
    Ok(user)
}

/// Bumps `updated_at` on a vendor record. Returns `false` if `email` is not a vendor. As a write, it also takes the
/// database write lock for the rest of the transaction.
pub async fn touch_vendor(email: &str, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET updated_at = $1 WHERE email = $2 AND role = $3")
        .bind(now)
        .bind(email)
        .bind(Role::Vendor)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Sets the `inventory_initialized` flag of a vendor. Returns `false` if the vendor does not exist or the flag was
/// already set.
pub async fn claim_inventory_initialization(
    email: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users SET inventory_initialized = 1, updated_at = $1
        WHERE email = $2 AND role = $3 AND inventory_initialized = 0
        "#,
    )
    .bind(now)
    .bind(email)
    .bind(Role::Vendor)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}
