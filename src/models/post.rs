use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A community feed post joined with its author's username.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub title: String,
    pub content: String,

    pub likes_count: i32,

    /// UI helper: whether the current user has liked this post.
    /// False for anonymous viewers.
    #[serde(default)]
    pub is_liked: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title length must be between 1 and 100 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 10000,
        message = "Content length must be between 1 and 10000 chars"
    ))]
    pub content: String,
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Cursor for pagination: the created_at timestamp of the last post in the previous page.
    pub cursor: Option<chrono::DateTime<chrono::Utc>>,

    /// Number of items to return (default: 20, max: 100).
    pub limit: Option<i64>,
}
