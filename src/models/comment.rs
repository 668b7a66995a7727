use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'comments' table joined with the author's username and
/// the viewer's reaction flags.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub anime_id: i64,
    pub episode_number: Option<i32>,
    pub content: String,
    pub parent_comment_id: Option<i64>,
    pub likes: i32,
    pub dislikes: i32,
    pub is_pinned: bool,
    pub is_spoiler: bool,
    /// Whether the current viewer has liked this comment. False for anonymous viewers.
    pub is_liked: bool,
    pub is_disliked: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl CommentRow {
    /// Net popularity: likes minus dislikes.
    pub fn score(&self) -> i64 {
        i64::from(self.likes) - i64::from(self.dislikes)
    }
}

/// A comment together with its ordered reply subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: CommentRow,
    pub replies: Vec<CommentNode>,
}

impl CommentNode {
    pub fn leaf(comment: CommentRow) -> Self {
        Self {
            comment,
            replies: Vec::new(),
        }
    }

    /// Number of comments in the subtree below this node.
    pub fn descendant_count(&self) -> usize {
        self.replies
            .iter()
            .map(|r| 1 + r.descendant_count())
            .sum()
    }
}

/// Ordering of a comment listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    #[default]
    Newest,
    Popular,
}

/// Query parameters shared by the JSON listing and the HTML render.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListParams {
    pub anime_id: i64,
    pub episode_number: Option<i32>,
    #[serde(default)]
    pub sort: CommentSort,
    /// Comma-separated node ids whose replies are folded (render only).
    pub collapsed: Option<String>,
}

impl CommentListParams {
    pub fn collapsed_ids(&self) -> Vec<i64> {
        self.collapsed
            .as_deref()
            .unwrap_or("")
            .split(',')
            .filter_map(|id| id.trim().parse().ok())
            .collect()
    }
}

/// DTO for creating a new comment or reply.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub anime_id: i64,

    #[validate(range(min = 1))]
    pub episode_number: Option<i32>,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_comment_id: Option<i64>,

    #[serde(default)]
    pub is_spoiler: bool,
}

/// DTO for editing a comment. Only the pin flag is editable.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommentRequest {
    /// Explicit value sets the flag; omitted toggles it.
    pub is_pinned: Option<bool>,
}

/// Counters and viewer flags after a like/dislike toggle.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReactionState {
    pub is_liked: bool,
    pub is_disliked: bool,
    pub likes: i32,
    pub dislikes: i32,
}
