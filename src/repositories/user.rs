use deadpool_postgres::Pool;
use tokio_postgres::Row;
use crate::{
    db::column,
    error::StoreResult,
    models::{
        page::{Page, PageRequest, Pagination},
        user::{NewUser, Role, User, UserUpdate},
    },
};

const USER_COLUMNS: &str = "id, email, name, role, created_at, updated_at";

/// A helper function to map a `tokio_postgres::Row` to a `User`.
pub(crate) fn row_to_user(row: &Row) -> StoreResult<User> {
    Ok(User {
        id: column(row, "id")?,
        email: column(row, "email")?,
        name: column(row, "name")?,
        role: column(row, "role")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// Creates a new user in the database.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `user` - The fields of the new user.
///
/// # Returns
///
/// A `StoreResult` containing the stored `User`, or
/// `UniqueConstraintViolation` when the email is taken.
pub async fn create(pool: &Pool, user: &NewUser) -> StoreResult<User> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!(
            "INSERT INTO users (email, name, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .await?;
    let row = client
        .query_one(&stmt, &[&user.email, &user.name, &user.role])
        .await?;
    let user = row_to_user(&row)?;
    tracing::info!("✅ User created with ID: {}", user.id);
    Ok(user)
}

/// Finds a user by their ID.
pub async fn get_by_id(pool: &Pool, id: i32) -> StoreResult<Option<User>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
        .await?;
    let row = client.query_opt(&stmt, &[&id]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Finds a user by their email address.
pub async fn get_by_email(pool: &Pool, email: &str) -> StoreResult<Option<User>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
        .await?;
    let row = client.query_opt(&stmt, &[&email]).await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Applies a partial update and bumps `updated_at`.
///
/// Returns `None` when no user has this ID.
pub async fn update(pool: &Pool, id: i32, changes: &UserUpdate) -> StoreResult<Option<User>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                role = COALESCE($4, role),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .await?;
    let row = client
        .query_opt(&stmt, &[&id, &changes.email, &changes.name, &changes.role])
        .await?;
    row.map(|r| row_to_user(&r)).transpose()
}

/// Deletes a user. Returns whether a row was removed.
pub async fn delete(pool: &Pool, id: i32) -> StoreResult<bool> {
    let client = pool.get().await?;
    let stmt = client.prepare_cached("DELETE FROM users WHERE id = $1").await?;
    let affected = client.execute(&stmt, &[&id]).await?;
    Ok(affected > 0)
}

/// Lists users, newest first.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `request` - The page to fetch; clamped before use.
///
/// # Returns
///
/// A `StoreResult` containing the page of users and its pagination.
pub async fn list(pool: &Pool, request: PageRequest) -> StoreResult<Page<User>> {
    let request = request.normalized();
    let client = pool.get().await?;

    let stmt = client
        .prepare_cached(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .await?;
    let rows = client
        .query(&stmt, &[&request.limit, &request.offset()])
        .await?;

    let count = client.prepare_cached("SELECT COUNT(*) AS total FROM users").await?;
    let total: i64 = column(&client.query_one(&count, &[]).await?, "total")?;

    Ok(Page {
        data: rows.iter().map(row_to_user).collect::<StoreResult<_>>()?,
        pagination: Pagination::new(request, total),
    })
}

/// Lists users holding `role`, newest first.
///
/// # Arguments
///
/// * `pool` - The database connection pool.
/// * `role` - The role to filter on.
/// * `request` - The page to fetch; clamped before use.
///
/// # Returns
///
/// A `StoreResult` containing the page of users and its pagination.
pub async fn get_by_role(pool: &Pool, role: Role, request: PageRequest) -> StoreResult<Page<User>> {
    let request = request.normalized();
    let client = pool.get().await?;

    let stmt = client
        .prepare_cached(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE role = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            USER_COLUMNS
        ))
        .await?;
    let rows = client
        .query(&stmt, &[&role, &request.limit, &request.offset()])
        .await?;

    let count = client
        .prepare_cached("SELECT COUNT(*) AS total FROM users WHERE role = $1")
        .await?;
    let total: i64 = column(&client.query_one(&count, &[&role]).await?, "total")?;

    Ok(Page {
        data: rows.iter().map(row_to_user).collect::<StoreResult<_>>()?,
        pagination: Pagination::new(request, total),
    })
}

/// Whether the user exists and holds `role`.
pub async fn has_role(pool: &Pool, id: i32, role: Role) -> StoreResult<bool> {
    Ok(get_by_id(pool, id).await?.is_some_and(|u| u.role == role))
}

pub async fn is_admin(pool: &Pool, id: i32) -> StoreResult<bool> {
    has_role(pool, id, Role::Admin).await
}

/// Changes a user's role. Returns `None` when no user has this ID.
pub async fn update_role(pool: &Pool, id: i32, role: Role) -> StoreResult<Option<User>> {
    update(
        pool,
        id,
        &UserUpdate {
            role: Some(role),
            ..Default::default()
        },
    )
    .await
}

/// Every admin, newest first.
pub async fn get_admins(pool: &Pool) -> StoreResult<Vec<User>> {
    let client = pool.get().await?;
    let stmt = client
        .prepare_cached(&format!(
            "SELECT {} FROM users WHERE role = $1 ORDER BY created_at DESC, id DESC",
            USER_COLUMNS
        ))
        .await?;
    let rows = client.query(&stmt, &[&Role::Admin]).await?;
    rows.iter().map(row_to_user).collect()
}
