//! JSON endpoints under `/admin/api`. All of them sit behind the route gate.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::{
        page::{Page, PageRequest},
        post::{NewPost, Post, PostUpdate},
        user::{Role, User, UserUpdate},
    },
    repositories::{post as post_repo, user as user_repo},
    state::AppState,
};

const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    pub author_id: i32,
    pub published: Option<bool>,
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title: must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title: must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Lists users, optionally only those holding one role.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Page<User>>> {
    let request = PageRequest::from_query(query.page, query.limit);
    let page = match query.role {
        Some(role) => user_repo::get_by_role(&state.db, role, request).await?,
        None => user_repo::list(&state.db, request).await?,
    };
    Ok(Json(page))
}

pub async fn list_admins(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(user_repo::get_admins(&state.db).await?))
}

pub async fn get_user(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<User>> {
    user_repo::get_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(changes): Json<UserUpdate>,
) -> Result<Json<User>> {
    if let Some(name) = changes.name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name: must not be empty".to_string()));
        }
    }
    user_repo::update(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

/// Deletes a user. A user who still has posts cannot be deleted.
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if user_repo::delete(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

/// Posts by one author, newest first.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Vec<Post>>> {
    let posts = post_repo::get_by_author(&state.db, query.author_id, query.published).await?;
    Ok(Json(posts))
}

/// Creates a post after checking, in the same transaction, that its author exists.
pub async fn create_post(
    State(state): State<AppState>,
    Json(draft): Json<NewPost>,
) -> Result<impl IntoResponse> {
    validate_title(&draft.title)?;
    let post = post_repo::create_with_author_check(&state.db, &draft).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Post>> {
    post_repo::get_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(changes): Json<PostUpdate>,
) -> Result<Json<Post>> {
    if let Some(title) = changes.title.as_deref() {
        validate_title(title)?;
    }
    post_repo::update(&state.db, id, &changes)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

pub async fn delete_post(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if post_repo::delete(&state.db, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_must_be_present_and_bounded() {
        assert!(validate_title("Leg day").is_ok());
        assert!(matches!(validate_title("   "), Err(AppError::Validation(_))));
        assert!(matches!(
            validate_title(&"x".repeat(MAX_TITLE_LEN + 1)),
            Err(AppError::Validation(_))
        ));
    }
}
