use log::*;
use reverie_common::ResourceVector;
use sqlx::SqliteConnection;

use super::vector_from_rows;

pub async fn fetch_balance(email: &str, conn: &mut SqliteConnection) -> Result<ResourceVector, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT category, amount FROM vendor_inventory WHERE email = $1")
        .bind(email)
        .fetch_all(conn)
        .await?;
    Ok(vector_from_rows(rows, &format!("inventory of {email}")))
}

/// Adds `delta` (which may be negative) to the balance of `email`, field by field, and returns the new balance.
/// There is no lower bound.
pub async fn adjust_balance(
    email: &str,
    delta: &ResourceVector,
    conn: &mut SqliteConnection,
) -> Result<ResourceVector, sqlx::Error> {
    for (category, amount) in delta.non_zero() {
        sqlx::query(
            r#"
            INSERT INTO vendor_inventory (email, category, amount) VALUES ($1, $2, $3)
            ON CONFLICT (email, category) DO UPDATE SET amount = amount + excluded.amount
            "#,
        )
        .bind(email)
        .bind(category.as_str())
        .bind(amount)
        .execute(&mut *conn)
        .await?;
    }
    sqlx::query("DELETE FROM vendor_inventory WHERE email = $1 AND amount = 0").bind(email).execute(&mut *conn).await?;
    let balance = fetch_balance(email, conn).await?;
    trace!("📝️ Inventory of {email} adjusted by {delta}. Balance: {balance}");
    Ok(balance)
}
