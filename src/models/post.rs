use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a post written by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// The unique identifier for the post.
    pub id: i32,
    /// The title of the post.
    pub title: String,
    /// The body of the post, if any.
    pub content: Option<String>,
    /// The ID of the user who wrote the post.
    pub author_id: i32,
    /// Whether the post is visible to readers.
    pub published: bool,
    /// The timestamp when the post was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the post was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A post that has not been stored yet.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub author_id: i32,
    #[serde(default)]
    pub published: bool,
}

/// A partial update; `None` leaves the column as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}
