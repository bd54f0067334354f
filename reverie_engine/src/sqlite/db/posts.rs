use chrono::{DateTime, Utc};
use log::*;
use reverie_common::{Category, ResourceVector};
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use super::{offers, vector_from_rows};
use crate::{
    db_types::{
        JobRequest,
        JobRequestUpdate,
        Location,
        NewJobRequest,
        OfferState,
        PostId,
        PostStatus,
        PostSummary,
        VendorKey,
        VendorOfferView,
    },
    traits::{JobRequestStoreError, OpenPostQuery},
};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct PostRow {
    id: i64,
    owner: String,
    description: String,
    place: String,
    latitude: f64,
    longitude: f64,
    status: PostStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostRow {
    fn location(&self) -> Location {
        Location::new(self.place.clone(), self.latitude, self.longitude)
    }

    fn into_summary(self, requirements: ResourceVector) -> PostSummary {
        PostSummary {
            id: PostId(self.id),
            location: self.location(),
            description: self.description,
            requirements,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    async fn assemble(self, conn: &mut SqliteConnection) -> Result<JobRequest, sqlx::Error> {
        let id = PostId(self.id);
        let requirements = fetch_requirements(id, conn).await?;
        let (pending, accepted) = offers::fetch_offers(id, conn).await?;
        Ok(JobRequest {
            id,
            location: self.location(),
            owner: self.owner,
            description: self.description,
            requirements,
            status: self.status,
            pending,
            accepted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Inserts the post header and its requirements. Not atomic on its own; run it inside a transaction.
pub async fn insert_post(
    owner: &str,
    post: &NewJobRequest,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<PostId, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
            INSERT INTO posts (owner, description, place, latitude, longitude, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, 'OPEN', $6, $6)
            RETURNING id;
        "#,
    )
    .bind(owner)
    .bind(&post.description)
    .bind(&post.location.place)
    .bind(post.location.latitude)
    .bind(post.location.longitude)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    let id = PostId(id);
    insert_requirements(id, &post.requirements, conn).await?;
    debug!("📝️ Post {id} inserted for {owner}");
    Ok(id)
}

async fn insert_requirements(
    id: PostId,
    requirements: &ResourceVector,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for (category, amount) in requirements.non_zero() {
        sqlx::query("INSERT INTO post_requirements (post_id, category, amount) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(category.as_str())
            .bind(amount)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub async fn fetch_requirements(id: PostId, conn: &mut SqliteConnection) -> Result<ResourceVector, sqlx::Error> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT category, amount FROM post_requirements WHERE post_id = $1")
            .bind(id)
            .fetch_all(conn)
            .await?;
    Ok(vector_from_rows(rows, &format!("requirements of post {id}")))
}

pub async fn fetch_post(id: PostId, conn: &mut SqliteConnection) -> Result<Option<JobRequest>, sqlx::Error> {
    let row: Option<PostRow> =
        sqlx::query_as("SELECT * FROM posts WHERE id = $1").bind(id).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(Some(row.assemble(conn).await?)),
        None => Ok(None),
    }
}

/// Works out why a conditional update on a post matched no rows.
async fn diagnose_miss(
    id: PostId,
    owner: Option<&str>,
    expected: PostStatus,
    conn: &mut SqliteConnection,
) -> JobRequestStoreError {
    let row: Result<Option<(String, PostStatus)>, sqlx::Error> =
        sqlx::query_as("SELECT owner, status FROM posts WHERE id = $1").bind(id).fetch_optional(conn).await;
    match row {
        Err(e) => e.into(),
        Ok(None) => JobRequestStoreError::PostNotFound(id),
        Ok(Some((actual_owner, _))) if owner.is_some_and(|o| o != actual_owner) => {
            JobRequestStoreError::NotPostOwner(id)
        },
        Ok(Some((_, actual))) => JobRequestStoreError::StatusConflict { id, expected, actual },
    }
}

/// Checks that the post exists, is in `expected` status and (optionally) belongs to `owner`, in a single write
/// statement. This must be the first statement of the transaction: it takes the database write lock, so the
/// precondition holds until the transaction ends.
pub async fn lock_post(
    id: PostId,
    owner: Option<&str>,
    expected: PostStatus,
    conn: &mut SqliteConnection,
) -> Result<(), JobRequestStoreError> {
    let result = sqlx::query(
        "UPDATE posts SET status = status WHERE id = $1 AND status = $2 AND ($3 IS NULL OR owner = $3)",
    )
    .bind(id)
    .bind(expected.as_str())
    .bind(owner)
    .execute(&mut *conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(diagnose_miss(id, owner, expected, conn).await);
    }
    Ok(())
}

pub async fn touch_post(id: PostId, now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE posts SET updated_at = $1 WHERE id = $2").bind(now).bind(id).execute(conn).await?;
    Ok(())
}

/// Applies a patch to an `OPEN` post owned by `owner`. New requirements replace the old ones.
pub async fn update_details(
    id: PostId,
    owner: &str,
    update: &JobRequestUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), JobRequestStoreError> {
    let mut builder = QueryBuilder::new("UPDATE posts SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(now);
    if let Some(description) = &update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description.clone());
    }
    if let Some(location) = &update.location {
        set_clause.push("place = ");
        set_clause.push_bind_unseparated(location.place.clone());
        set_clause.push("latitude = ");
        set_clause.push_bind_unseparated(location.latitude);
        set_clause.push("longitude = ");
        set_clause.push_bind_unseparated(location.longitude);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" AND owner = ");
    builder.push_bind(owner.to_string());
    builder.push(" AND status = 'OPEN'");
    trace!("📝️ Executing query: {}", builder.sql());
    let result = builder.build().execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(diagnose_miss(id, Some(owner), PostStatus::Open, conn).await);
    }
    if let Some(requirements) = &update.requirements {
        sqlx::query("DELETE FROM post_requirements WHERE post_id = $1").bind(id).execute(&mut *conn).await?;
        insert_requirements(id, requirements, conn).await?;
    }
    debug!("📝️ Post {id} updated");
    Ok(())
}

pub async fn set_status(
    id: PostId,
    owner: &str,
    from: PostStatus,
    to: PostStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), JobRequestStoreError> {
    let result =
        sqlx::query("UPDATE posts SET status = $1, updated_at = $2 WHERE id = $3 AND owner = $4 AND status = $5")
            .bind(to.as_str())
            .bind(now)
            .bind(id)
            .bind(owner)
            .bind(from.as_str())
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Err(diagnose_miss(id, Some(owner), from, conn).await);
    }
    debug!("📝️ Post {id} moved from {from} to {to}");
    Ok(())
}

/// Subtracts `content` from the requirements of the post, category by category. A category is only decremented if
/// enough of it remains. Returns the categories that did not have enough, in which case the caller must roll back.
pub async fn debit_requirements(
    id: PostId,
    content: &ResourceVector,
    conn: &mut SqliteConnection,
) -> Result<Vec<Category>, sqlx::Error> {
    let mut short = vec![];
    for (category, amount) in content.non_zero() {
        let result = sqlx::query(
            "UPDATE post_requirements SET amount = amount - $1 WHERE post_id = $2 AND category = $3 AND amount >= $1",
        )
        .bind(amount)
        .bind(id)
        .bind(category.as_str())
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            short.push(category);
        }
    }
    sqlx::query("DELETE FROM post_requirements WHERE post_id = $1 AND amount = 0").bind(id).execute(conn).await?;
    Ok(short)
}

pub async fn credit_requirements(
    id: PostId,
    content: &ResourceVector,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    for (category, amount) in content.non_zero() {
        sqlx::query(
            r#"
            INSERT INTO post_requirements (post_id, category, amount) VALUES ($1, $2, $3)
            ON CONFLICT (post_id, category) DO UPDATE SET amount = amount + excluded.amount
            "#,
        )
        .bind(id)
        .bind(category.as_str())
        .bind(amount)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// The vendor feed. Open posts that still need one of the requested categories, leaving out any post the vendor
/// already has an offer on (pending or accepted). Oldest activity first, paginated.
pub async fn search_open_posts(
    query: OpenPostQuery,
    conn: &mut SqliteConnection,
) -> Result<Vec<PostSummary>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM posts WHERE status = 'OPEN'
    AND NOT EXISTS (SELECT 1 FROM offers o WHERE o.post_id = posts.id AND o.offer_key = "#,
    );
    builder.push_bind(query.vendor_key.to_string());
    builder.push(")");
    builder.push(
        " AND EXISTS (SELECT 1 FROM post_requirements r WHERE r.post_id = posts.id AND r.amount > 0 AND r.category IN (",
    );
    let mut categories = builder.separated(", ");
    for category in &query.categories {
        categories.push_bind(category.as_str());
    }
    builder.push(")) ORDER BY updated_at ASC, id ASC LIMIT ");
    builder.push_bind(query.page_size);
    builder.push(" OFFSET ");
    builder.push_bind(query.offset());
    trace!("📝️ Executing query: {}", builder.sql());
    let rows: Vec<PostRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        let requirements = fetch_requirements(PostId(row.id), conn).await?;
        result.push(row.into_summary(requirements));
    }
    trace!("📝️ Result of search_open_posts: {}", result.len());
    Ok(result)
}

fn push_status_list(builder: &mut QueryBuilder<'_, sqlx::Sqlite>, statuses: &[PostStatus]) {
    builder.push("(");
    let mut list = builder.separated(", ");
    for status in statuses {
        list.push_bind(status.as_str());
    }
    builder.push(")");
}

pub async fn fetch_posts_for_owner(
    owner: &str,
    statuses: &[PostStatus],
    conn: &mut SqliteConnection,
) -> Result<Vec<JobRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM posts WHERE owner = ");
    builder.push_bind(owner.to_string());
    builder.push(" AND status IN ");
    push_status_list(&mut builder, statuses);
    builder.push(" ORDER BY created_at DESC, id DESC");
    let rows: Vec<PostRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        result.push(row.assemble(conn).await?);
    }
    Ok(result)
}

pub async fn fetch_posts_with_offer_from(
    key: &VendorKey,
    state: OfferState,
    statuses: &[PostStatus],
    conn: &mut SqliteConnection,
) -> Result<Vec<VendorOfferView>, sqlx::Error> {
    let mut builder =
        QueryBuilder::new("SELECT posts.* FROM posts JOIN offers o ON o.post_id = posts.id WHERE o.offer_key = ");
    builder.push_bind(key.to_string());
    builder.push(" AND o.state = ");
    builder.push_bind(state.as_str());
    builder.push(" AND posts.status IN ");
    push_status_list(&mut builder, statuses);
    builder.push(" ORDER BY posts.updated_at DESC, posts.id DESC");
    let rows: Vec<PostRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        let id = PostId(row.id);
        let requirements = fetch_requirements(id, conn).await?;
        if let Some(offer) = offers::fetch_offer(id, key, state, conn).await? {
            result.push(VendorOfferView { post: row.into_summary(requirements), offer });
        }
    }
    Ok(result)
}
