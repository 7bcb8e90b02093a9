//! Runs against live services. Set `TEST_DATABASE_URL` (and `TEST_REDIS_URL`
//! for the identity provider tests); without them each test returns early.

use std::{
    sync::{Mutex, MutexGuard},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use deadpool_postgres::Pool;
use redis::aio::ConnectionManager;
use tokio_postgres::error::SqlState;

use sweat_station::{
    db,
    error::{IdentityError, StoreError},
    models::{
        page::PageRequest,
        post::{NewPost, PostUpdate},
        user::{NewUser, Role, UserUpdate},
    },
    repositories::{post as post_repo, user as user_repo},
    services::{
        auth::LocalIdentityProvider,
        identity::{Credentials, IdentityProvider, SignUpProfile},
        session,
    },
};

const MISSING_AUTHOR_ID: i32 = i32::MAX;

async fn test_pool() -> Option<Pool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = db::create_pool(&url, 4).unwrap();
    db::run_migrations(&pool).await.unwrap();
    Some(pool)
}

async fn test_redis() -> Option<ConnectionManager> {
    let Ok(url) = std::env::var("TEST_REDIS_URL") else {
        eprintln!("TEST_REDIS_URL not set, skipping");
        return None;
    };
    let client = redis::Client::open(url).unwrap();
    Some(ConnectionManager::new(client).await.unwrap())
}

fn unique_email(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}@sweat.station", tag, nanos)
}

async fn new_user(pool: &Pool, tag: &str, role: Role) -> sweat_station::models::user::User {
    user_repo::create(
        pool,
        &NewUser {
            email: unique_email(tag),
            name: format!("Test {}", tag),
            role,
        },
    )
    .await
    .unwrap()
}

/// Serializes the tests that insert posts, so whole-table counts stay exact.
static POSTS_TABLE: Mutex<()> = Mutex::new(());

fn lock_posts() -> MutexGuard<'static, ()> {
    POSTS_TABLE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn total_posts(pool: &Pool) -> i64 {
    let client = pool.get().await.unwrap();
    client
        .query_one("SELECT COUNT(*) FROM posts", &[])
        .await
        .unwrap()
        .get(0)
}

fn draft_for(author_id: i32, title: &str) -> NewPost {
    NewPost {
        title: title.into(),
        content: None,
        author_id,
        published: false,
    }
}

#[tokio::test]
async fn post_for_missing_author_is_rejected_without_writes() {
    let Some(pool) = test_pool().await else { return };
    let _posts = lock_posts();

    let before = total_posts(&pool).await;
    let result =
        post_repo::create_with_author_check(&pool, &draft_for(MISSING_AUTHOR_ID, "Orphan")).await;

    assert!(matches!(result, Err(StoreError::AuthorNotFound)));
    assert_eq!(total_posts(&pool).await, before);
}

#[tokio::test]
async fn author_lock_blocks_a_concurrent_delete() {
    let Some(pool) = test_pool().await else { return };
    let _posts = lock_posts();
    let author = new_user(&pool, "locked", Role::General).await;

    let mut holder = pool.get().await.unwrap();
    let tx = holder.transaction().await.unwrap();
    let locked = tx
        .query_opt("SELECT id FROM users WHERE id = $1 FOR KEY SHARE", &[&author.id])
        .await
        .unwrap();
    assert!(locked.is_some());

    let deleter = pool.get().await.unwrap();
    deleter.batch_execute("SET lock_timeout = '200ms'").await.unwrap();
    let err = deleter
        .execute("DELETE FROM users WHERE id = $1", &[&author.id])
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(&SqlState::LOCK_NOT_AVAILABLE));
    deleter.batch_execute("RESET lock_timeout").await.unwrap();

    let post = tx
        .query_one(
            "INSERT INTO posts (title, author_id) VALUES ($1, $2) RETURNING id",
            &[&"Held", &author.id],
        )
        .await
        .unwrap();
    let post_id: i32 = post.get(0);
    tx.commit().await.unwrap();

    // The author survived, so the post is not dangling.
    assert!(user_repo::get_by_id(&pool, author.id).await.unwrap().is_some());
    assert!(post_repo::delete(&pool, post_id).await.unwrap());
    assert!(user_repo::delete(&pool, author.id).await.unwrap());
}

#[tokio::test]
async fn post_creation_waits_for_a_pending_author_delete() {
    let Some(pool) = test_pool().await else { return };
    let _posts = lock_posts();
    let author = new_user(&pool, "vanishing", Role::General).await;
    let before = total_posts(&pool).await;

    let mut deleter = pool.get().await.unwrap();
    let tx = deleter.transaction().await.unwrap();
    let removed = tx
        .execute("DELETE FROM users WHERE id = $1", &[&author.id])
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let creating = tokio::spawn({
        let pool = pool.clone();
        let draft = draft_for(author.id, "Too late");
        async move { post_repo::create_with_author_check(&pool, &draft).await }
    });

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!creating.is_finished(), "author check must wait for the delete");

    tx.commit().await.unwrap();
    let result = creating.await.unwrap();

    assert!(matches!(result, Err(StoreError::AuthorNotFound)));
    assert_eq!(total_posts(&pool).await, before);
}

#[tokio::test]
async fn post_for_existing_author_is_durable() {
    let Some(pool) = test_pool().await else { return };
    let _posts = lock_posts();
    let author = new_user(&pool, "author", Role::General).await;

    let post = post_repo::create_with_author_check(
        &pool,
        &NewPost {
            title: "Leg day".into(),
            content: Some("Squats, lunges, regret.".into()),
            author_id: author.id,
            published: true,
        },
    )
    .await
    .unwrap();
    assert_eq!(post.author_id, author.id);

    let stored = post_repo::get_by_id(&pool, post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Leg day");

    let published = post_repo::get_by_author(&pool, author.id, Some(true)).await.unwrap();
    assert_eq!(published.len(), 1);
    let drafts = post_repo::get_by_author(&pool, author.id, Some(false)).await.unwrap();
    assert!(drafts.is_empty());

    let updated = post_repo::update(
        &pool,
        post.id,
        &PostUpdate {
            published: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!updated.published);
    assert_eq!(updated.title, "Leg day");
    assert!(updated.updated_at >= post.updated_at);

    // The author still has a post, so the foreign key blocks the delete.
    assert!(matches!(
        user_repo::delete(&pool, author.id).await,
        Err(StoreError::ForeignKeyViolation)
    ));

    assert!(post_repo::delete(&pool, post.id).await.unwrap());
    assert!(!post_repo::delete(&pool, post.id).await.unwrap());
    assert!(user_repo::delete(&pool, author.id).await.unwrap());
}

#[tokio::test]
async fn unchecked_insert_reports_foreign_key_violation() {
    let Some(pool) = test_pool().await else { return };
    let result = post_repo::create(
        &pool,
        &NewPost {
            title: "Dangling".into(),
            content: None,
            author_id: MISSING_AUTHOR_ID,
            published: false,
        },
    )
    .await;
    assert!(matches!(result, Err(StoreError::ForeignKeyViolation)));
}

#[tokio::test]
async fn duplicate_email_is_a_unique_violation() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, "dupe", Role::General).await;

    let again = user_repo::create(
        &pool,
        &NewUser {
            email: user.email.clone(),
            name: "Someone else".into(),
            role: Role::General,
        },
    )
    .await;
    assert!(matches!(again, Err(StoreError::UniqueConstraintViolation)));

    let found = user_repo::get_by_email(&pool, &user.email).await.unwrap().unwrap();
    assert_eq!(found.id, user.id);
    user_repo::delete(&pool, user.id).await.unwrap();
}

#[tokio::test]
async fn user_updates_and_roles() {
    let Some(pool) = test_pool().await else { return };
    let user = new_user(&pool, "roles", Role::General).await;

    assert!(!user_repo::is_admin(&pool, user.id).await.unwrap());
    assert!(user_repo::has_role(&pool, user.id, Role::General).await.unwrap());

    let promoted = user_repo::update_role(&pool, user.id, Role::Admin).await.unwrap().unwrap();
    assert_eq!(promoted.role, Role::Admin);
    assert!(user_repo::is_admin(&pool, user.id).await.unwrap());
    assert!(
        user_repo::get_admins(&pool)
            .await
            .unwrap()
            .iter()
            .any(|u| u.id == user.id)
    );

    let renamed = user_repo::update(
        &pool,
        user.id,
        &UserUpdate {
            name: Some("Renamed".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(renamed.name, "Renamed");
    assert_eq!(renamed.role, Role::Admin);

    let admins = user_repo::get_by_role(&pool, Role::Admin, PageRequest::new(1, 100))
        .await
        .unwrap();
    assert!(admins.data.iter().all(|u| u.role == Role::Admin));
    assert!(admins.pagination.total >= 1);

    assert!(user_repo::update(&pool, MISSING_AUTHOR_ID, &UserUpdate::default()).await.unwrap().is_none());
    assert!(user_repo::delete(&pool, user.id).await.unwrap());
    assert!(!user_repo::delete(&pool, user.id).await.unwrap());
}

#[tokio::test]
async fn listing_is_paginated() {
    let Some(pool) = test_pool().await else { return };
    let a = new_user(&pool, "page-a", Role::General).await;
    let b = new_user(&pool, "page-b", Role::General).await;

    let page = user_repo::list(&pool, PageRequest::new(1, 1)).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.pagination.limit, 1);
    assert!(page.pagination.total >= 2);
    assert_eq!(page.pagination.total_pages, page.pagination.total);

    user_repo::delete(&pool, a.id).await.unwrap();
    user_repo::delete(&pool, b.id).await.unwrap();
}

#[tokio::test]
async fn local_provider_session_lifecycle() {
    let Some(pool) = test_pool().await else { return };
    let Some(redis) = test_redis().await else { return };
    let provider = LocalIdentityProvider::new(pool.clone(), redis, 60);

    let email = unique_email("provider");
    let profile = SignUpProfile {
        name: "Runner".into(),
        email: email.clone(),
        password: "Sweat1234".into(),
        role: Role::General,
    };

    let signed_up = provider.sign_up(&profile).await.unwrap();
    assert_eq!(signed_up.session.email, email);
    assert_eq!(signed_up.session.display_name.as_deref(), Some("Runner"));

    assert!(matches!(
        provider.sign_up(&profile).await,
        Err(IdentityError::EmailTaken)
    ));

    let credentials = Credentials::with_session_token(signed_up.token.clone());
    let first = session::resolve(&provider, &credentials).await.unwrap();
    let second = session::resolve(&provider, &credentials).await.unwrap();
    assert_eq!(first.subject_id, second.subject_id);
    assert_eq!(first.subject_id, signed_up.session.subject_id);

    assert!(matches!(
        provider.sign_in(&email, "Wrong1234").await,
        Err(IdentityError::InvalidCredentials)
    ));
    let signed_in = provider.sign_in(&email, "Sweat1234").await.unwrap();
    assert_eq!(signed_in.session.subject_id, signed_up.session.subject_id);
    assert_ne!(signed_in.token, signed_up.token);

    let stale_cookie = Credentials {
        session_token: Some("long-gone".into()),
        bearer_token: Some(signed_in.token.clone()),
    };
    let via_bearer = session::resolve(&provider, &stale_cookie).await.unwrap();
    assert_eq!(via_bearer.subject_id, signed_up.session.subject_id);

    provider.sign_out(&credentials).await.unwrap();
    assert!(session::resolve(&provider, &credentials).await.is_none());
    provider.sign_out(&credentials).await.unwrap();

    let user_id: i32 = signed_up.session.subject_id.parse().unwrap();
    assert!(user_repo::delete(&pool, user_id).await.unwrap());
}
