use deadpool_postgres::Pool;
use tokio_postgres::Row;
use crate::{
    db::column,
    error::{StoreError, StoreResult},
    models::post::{NewPost, Post, PostUpdate},
};

const POST_COLUMNS: &str = "id, title, content, author_id, published, created_at, updated_at";

fn row_to_post(row: &Row) -> StoreResult<Post> {
    Ok(Post {
        id: column(row, "id")?,
        title: column(row, "title")?,
        content: column(row, "content")?,
        author_id: column(row, "author_id")?,
        published: column(row, "published")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn insert_sql() -> String {
    format!(
        r#"
        INSERT INTO posts (title, content, author_id, published)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        POST_COLUMNS
    )
}

/// Inserts a post without checking its author first.
///
/// A dangling `author_id` surfaces as `StoreError::ForeignKeyViolation`.
pub async fn create(pool: &Pool, draft: &NewPost) -> StoreResult<Post> {
    let client = pool.get().await?;
    let stmt = client.prepare_cached(&insert_sql()).await?;
    let row = client
        .query_one(
            &stmt,
            &[&draft.title, &draft.content, &draft.author_id, &draft.published],
        )
        .await?;
    row_to_post(&row)
}

/// Inserts a post after verifying its author, as one transaction.
///
/// The author row is locked `FOR KEY SHARE`, so a concurrent delete of the
/// author blocks until this transaction ends. When the author is missing the
/// transaction is rolled back and nothing is written.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `draft` - The post to insert.
///
/// # Returns
///
/// A `StoreResult` containing the committed `Post`, or `AuthorNotFound`.
pub async fn create_with_author_check(pool: &Pool, draft: &NewPost) -> StoreResult<Post> {
    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let author_stmt = tx
        .prepare_cached("SELECT id FROM users WHERE id = $1 FOR KEY SHARE")
        .await?;
    let author = tx.query_opt(&author_stmt, &[&draft.author_id]).await?;

    if author.is_none() {
        tx.rollback().await?;
        tracing::warn!("❌ Post rejected, author {} not found", draft.author_id);
        return Err(StoreError::AuthorNotFound);
    }

    let insert_stmt = tx.prepare_cached(&insert_sql()).await?;
    let row = tx
        .query_one(
            &insert_stmt,
            &[&draft.title, &draft.content, &draft.author_id, &draft.published],
        )
        .await?;
    let post = row_to_post(&row)?;

    tx.commit().await?;
    tracing::info!("✅ Post {} created for author {}", post.id, post.author_id);
    Ok(post)
}

/// Finds a post by its ID.
pub async fn get_by_id(pool: &Pool, id: i32) -> StoreResult<Option<Post>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
        .await?;
    let row = client.query_opt(&stmt, &[&id]).await?;
    row.map(|r| row_to_post(&r)).transpose()
}

/// Posts by one author, newest first, optionally filtered on `published`.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `author_id` - The author's user ID.
/// * `published` - `Some` to keep only posts with this flag, `None` for all.
///
/// # Returns
///
/// A `StoreResult` containing the matching posts.
pub async fn get_by_author(
    pool: &Pool,
    author_id: i32,
    published: Option<bool>,
) -> StoreResult<Vec<Post>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!(
            r#"
            SELECT {}
            FROM posts
            WHERE author_id = $1 AND ($2::BOOLEAN IS NULL OR published = $2)
            ORDER BY created_at DESC, id DESC
            "#,
            POST_COLUMNS
        ))
        .await?;
    let rows = client.query(&stmt, &[&author_id, &published]).await?;
    rows.iter().map(row_to_post).collect()
}

/// Applies a partial update and bumps `updated_at`.
pub async fn update(pool: &Pool, id: i32, changes: &PostUpdate) -> StoreResult<Option<Post>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!(
            r#"
            UPDATE posts
            SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                published = COALESCE($4, published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .await?;
    let row = client
        .query_opt(&stmt, &[&id, &changes.title, &changes.content, &changes.published])
        .await?;
    row.map(|r| row_to_post(&r)).transpose()
}

/// Deletes a post. Returns whether a row was removed.
pub async fn delete(pool: &Pool, id: i32) -> StoreResult<bool> {
    let client = pool.get().await?;
    let stmt = client.prepare_cached("DELETE FROM posts WHERE id = $1").await?;
    let affected = client.execute(&stmt, &[&id]).await?;
    Ok(affected > 0)
}
