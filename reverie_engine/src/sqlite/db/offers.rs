use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::*;
use reverie_common::ResourceVector;
use sqlx::{FromRow, SqliteConnection};

use super::vector_from_rows;
use crate::db_types::{Offer, OfferState, PostId, VendorKey};

#[derive(Debug, Clone, FromRow)]
struct OfferRow {
    offer_key: String,
    state: OfferState,
    vendor_name: String,
    rate: f64,
    created_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
}

impl OfferRow {
    fn into_offer(self, content: ResourceVector) -> Offer {
        Offer {
            vendor_name: self.vendor_name,
            rate: self.rate,
            content,
            created_at: self.created_at,
            accepted_at: self.accepted_at,
        }
    }
}

type OfferMap = BTreeMap<VendorKey, Offer>;

/// Loads every offer on a post, split into `(pending, accepted)`.
pub async fn fetch_offers(id: PostId, conn: &mut SqliteConnection) -> Result<(OfferMap, OfferMap), sqlx::Error> {
    let headers: Vec<OfferRow> = sqlx::query_as(
        "SELECT offer_key, state, vendor_name, rate, created_at, accepted_at FROM offers WHERE post_id = $1",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let items: Vec<(String, OfferState, String, i64)> =
        sqlx::query_as("SELECT offer_key, state, category, amount FROM offer_items WHERE post_id = $1")
            .bind(id)
            .fetch_all(conn)
            .await?;
    let mut contents: BTreeMap<(String, OfferState), Vec<(String, i64)>> = BTreeMap::new();
    for (key, state, category, amount) in items {
        contents.entry((key, state)).or_default().push((category, amount));
    }
    let mut pending = BTreeMap::new();
    let mut accepted = BTreeMap::new();
    for header in headers {
        let rows = contents.remove(&(header.offer_key.clone(), header.state)).unwrap_or_default();
        let content = vector_from_rows(rows, &format!("offer {} on post {id}", header.offer_key));
        let key = VendorKey(header.offer_key.clone());
        match header.state {
            OfferState::Pending => pending.insert(key, header.into_offer(content)),
            OfferState::Accepted => accepted.insert(key, header.into_offer(content)),
        };
    }
    Ok((pending, accepted))
}

pub async fn fetch_offer(
    id: PostId,
    key: &VendorKey,
    state: OfferState,
    conn: &mut SqliteConnection,
) -> Result<Option<Offer>, sqlx::Error> {
    let header: Option<OfferRow> = sqlx::query_as(
        r#"
        SELECT offer_key, state, vendor_name, rate, created_at, accepted_at FROM offers
        WHERE post_id = $1 AND offer_key = $2 AND state = $3
        "#,
    )
    .bind(id)
    .bind(key.as_str())
    .bind(state.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    let Some(header) = header else {
        return Ok(None);
    };
    let content = fetch_offer_content(id, key, state, conn).await?;
    Ok(Some(header.into_offer(content)))
}

async fn fetch_offer_content(
    id: PostId,
    key: &VendorKey,
    state: OfferState,
    conn: &mut SqliteConnection,
) -> Result<ResourceVector, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT category, amount FROM offer_items WHERE post_id = $1 AND offer_key = $2 AND state = $3",
    )
    .bind(id)
    .bind(key.as_str())
    .bind(state.as_str())
    .fetch_all(conn)
    .await?;
    Ok(vector_from_rows(rows, &format!("offer {key} on post {id}")))
}

async fn insert_items(
    id: PostId,
    key: &VendorKey,
    state: OfferState,
    content: &ResourceVector,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for (category, amount) in content.non_zero() {
        sqlx::query(
            r#"
            INSERT INTO offer_items (post_id, offer_key, state, category, amount) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (post_id, offer_key, state, category) DO UPDATE SET amount = amount + excluded.amount
            "#,
        )
        .bind(id)
        .bind(key.as_str())
        .bind(state.as_str())
        .bind(category.as_str())
        .bind(amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn insert_pending(
    id: PostId,
    key: &VendorKey,
    offer: &Offer,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO offers (post_id, offer_key, state, vendor_name, rate, created_at)
        VALUES ($1, $2, 'PENDING', $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(key.as_str())
    .bind(&offer.vendor_name)
    .bind(offer.rate)
    .bind(offer.created_at)
    .execute(&mut *conn)
    .await?;
    insert_items(id, key, OfferState::Pending, &offer.content, conn).await?;
    trace!("📝️ Pending offer {key} stored on post {id}");
    Ok(())
}

/// Merges `offer` into the accepted offer under `key`, creating it if needed. Quantities are summed per category. The
/// vendor name, rate and acceptance time are taken from `offer`.
pub async fn merge_accepted(
    id: PostId,
    key: &VendorKey,
    offer: &Offer,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO offers (post_id, offer_key, state, vendor_name, rate, created_at, accepted_at)
        VALUES ($1, $2, 'ACCEPTED', $3, $4, $5, $6)
        ON CONFLICT (post_id, offer_key, state) DO UPDATE SET
            vendor_name = excluded.vendor_name,
            rate = excluded.rate,
            accepted_at = excluded.accepted_at
        "#,
    )
    .bind(id)
    .bind(key.as_str())
    .bind(&offer.vendor_name)
    .bind(offer.rate)
    .bind(offer.created_at)
    .bind(offer.accepted_at)
    .execute(&mut *conn)
    .await?;
    insert_items(id, key, OfferState::Accepted, &offer.content, conn).await?;
    trace!("📝️ Accepted offer {key} on post {id} merged with {}", offer.content);
    Ok(())
}

/// Deletes an offer and its items. Returns `false` if there was nothing to delete.
pub async fn delete_offer(
    id: PostId,
    key: &VendorKey,
    state: OfferState,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    sqlx::query("DELETE FROM offer_items WHERE post_id = $1 AND offer_key = $2 AND state = $3")
        .bind(id)
        .bind(key.as_str())
        .bind(state.as_str())
        .execute(&mut *conn)
        .await?;
    let result = sqlx::query("DELETE FROM offers WHERE post_id = $1 AND offer_key = $2 AND state = $3")
        .bind(id)
        .bind(key.as_str())
        .bind(state.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
