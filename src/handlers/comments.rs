// src/handlers/comments.rs

use std::collections::HashSet;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse},
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::{
    error::AppError,
    models::comment::{
        CommentListParams, CommentNode, CommentRow, CreateCommentRequest, ReactionState,
        UpdateCommentRequest,
    },
    utils::{
        comment_tree,
        render::{RenderOptions, render_thread},
        session::{AuthUser, Viewer},
        spoiler,
    },
};

/// Columns of `CommentRow`. `$VIEWER` is replaced with the placeholder of
/// the bind holding the caller's user id (NULL for anonymous callers).
const COMMENT_COLUMNS: &str = r#"
    c.id, c.user_id, u.username, c.anime_id, c.episode_number, c.content,
    c.parent_comment_id, c.likes, c.dislikes, c.is_pinned, c.is_spoiler,
    EXISTS (SELECT 1 FROM comment_likes l WHERE l.comment_id = c.id AND l.user_id = $VIEWER) AS is_liked,
    EXISTS (SELECT 1 FROM comment_dislikes d WHERE d.comment_id = c.id AND d.user_id = $VIEWER) AS is_disliked,
    c.created_at, c.updated_at
"#;

fn comment_select(viewer_param: &str) -> String {
    format!(
        "SELECT {} FROM comments c JOIN users u ON u.id = c.user_id",
        COMMENT_COLUMNS.replace("$VIEWER", viewer_param)
    )
}

/// Loads every comment on a target as flat rows.
/// Without an episode number only anime-level comments are returned.
async fn load_target(
    pool: &PgPool,
    params: &CommentListParams,
    viewer_id: Option<i64>,
) -> Result<Vec<CommentRow>, AppError> {
    let sql = format!(
        "{} WHERE c.anime_id = $1 AND c.episode_number IS NOT DISTINCT FROM $2",
        comment_select("$3")
    );

    let rows = sqlx::query_as::<_, CommentRow>(&sql)
        .bind(params.anime_id)
        .bind(params.episode_number)
        .bind(viewer_id)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list comments: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(rows)
}

async fn load_one(
    conn: &mut PgConnection,
    id: i64,
    viewer_id: Option<i64>,
) -> Result<CommentRow, AppError> {
    let sql = format!("{} WHERE c.id = $1", comment_select("$2"));

    sqlx::query_as::<_, CommentRow>(&sql)
        .bind(id)
        .bind(viewer_id)
        .fetch_optional(conn)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// Owner of a comment, or 404.
async fn comment_owner(pool: &PgPool, id: i64) -> Result<(i64, bool), AppError> {
    sqlx::query_as::<_, (i64, bool)>("SELECT user_id, is_pinned FROM comments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))
}

/// List comments for an anime (or one of its episodes) as reply trees.
/// `isLiked` / `isDisliked` are resolved for the caller when logged in.
pub async fn list_comments(
    State(pool): State<PgPool>,
    viewer: Viewer,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = load_target(&pool, &params, viewer.user_id()).await?;
    Ok(Json(comment_tree::assemble(rows, params.sort)))
}

/// Render the same listing as an HTML fragment with spoilers masked.
pub async fn render_comments(
    State(pool): State<PgPool>,
    viewer: Viewer,
    Query(params): Query<CommentListParams>,
) -> Result<impl IntoResponse, AppError> {
    let rows = load_target(&pool, &params, viewer.user_id()).await?;
    let tree = comment_tree::assemble(rows, params.sort);

    let opts = RenderOptions {
        viewer: viewer.claims(),
        collapsed: params.collapsed_ids().into_iter().collect::<HashSet<_>>(),
    };

    Ok(Html(render_thread(&tree, &opts)))
}

/// Reveal one masked segment of a comment.
pub async fn reveal_spoiler(
    State(pool): State<PgPool>,
    Path((id, segment)): Path<(i64, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let (content, is_spoiler) =
        sqlx::query_as::<_, (String, bool)>("SELECT content, is_spoiler FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let text = spoiler::reveal(&content, is_spoiler, segment)
        .ok_or(AppError::NotFound("Spoiler not found".to_string()))?;

    Ok(Json(serde_json::json!({ "text": text })))
}

/// Create a comment or a reply.
///
/// A reply must point at an existing comment on the same anime and episode.
pub async fn create_comment(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(mut payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.content = payload.content.trim().to_string();
    payload.validate()?;

    let mut tx = pool.begin().await?;

    // 1. Target must exist
    sqlx::query_scalar::<_, i64>("SELECT id FROM anime WHERE id = $1")
        .bind(payload.anime_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Anime not found".to_string()))?;

    if let Some(number) = payload.episode_number {
        sqlx::query_scalar::<_, i64>("SELECT id FROM episodes WHERE anime_id = $1 AND number = $2")
            .bind(payload.anime_id)
            .bind(number)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Episode not found".to_string()))?;
    }

    // 2. Parent must live on the same target
    if let Some(parent_id) = payload.parent_comment_id {
        let (anime_id, episode_number) = sqlx::query_as::<_, (i64, Option<i32>)>(
            "SELECT anime_id, episode_number FROM comments WHERE id = $1",
        )
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Parent comment not found".to_string()))?;

        if anime_id != payload.anime_id || episode_number != payload.episode_number {
            return Err(AppError::BadRequest(
                "Parent comment belongs to a different anime or episode".to_string(),
            ));
        }
    }

    // 3. Insert
    let new_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO comments (user_id, anime_id, episode_number, content, parent_comment_id, is_spoiler)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user.id)
    .bind(payload.anime_id)
    .bind(payload.episode_number)
    .bind(&payload.content)
    .bind(payload.parent_comment_id)
    .bind(payload.is_spoiler)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create comment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let created = load_one(&mut *tx, new_id, Some(user.id)).await?;
    tx.commit().await?;

    tracing::info!(comment_id = new_id, user_id = user.id, "Comment created");

    Ok((StatusCode::CREATED, Json(CommentNode::leaf(created))))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    fn table(self) -> &'static str {
        match self {
            Reaction::Like => "comment_likes",
            Reaction::Dislike => "comment_dislikes",
        }
    }

    fn opposite(self) -> Self {
        match self {
            Reaction::Like => Reaction::Dislike,
            Reaction::Dislike => Reaction::Like,
        }
    }
}

/// Toggle a reaction. Setting one reaction clears the other in the same
/// transaction; the counters follow the rows through table triggers.
async fn toggle_reaction(
    pool: &PgPool,
    user_id: i64,
    comment_id: i64,
    reaction: Reaction,
) -> Result<ReactionState, AppError> {
    let mut tx = pool.begin().await?;

    // Row lock serializes concurrent toggles on the same comment.
    sqlx::query_scalar::<_, i64>("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let removed = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND comment_id = $2",
        reaction.table()
    ))
    .bind(user_id)
    .bind(comment_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if removed == 0 {
        sqlx::query(&format!(
            "INSERT INTO {} (user_id, comment_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            reaction.table()
        ))
        .bind(user_id)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND comment_id = $2",
            reaction.opposite().table()
        ))
        .bind(user_id)
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;
    }

    let state = sqlx::query_as::<_, ReactionState>(
        r#"
        SELECT
            EXISTS (SELECT 1 FROM comment_likes WHERE comment_id = c.id AND user_id = $2) AS is_liked,
            EXISTS (SELECT 1 FROM comment_dislikes WHERE comment_id = c.id AND user_id = $2) AS is_disliked,
            c.likes, c.dislikes
        FROM comments c
        WHERE c.id = $1
        "#,
    )
    .bind(comment_id)
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(state)
}

/// Toggle like. Revokes an existing dislike.
pub async fn like_comment(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = toggle_reaction(&pool, user.id, id, Reaction::Like).await?;
    Ok(Json(state))
}

/// Toggle dislike. Revokes an existing like.
pub async fn dislike_comment(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let state = toggle_reaction(&pool, user.id, id, Reaction::Dislike).await?;
    Ok(Json(state))
}

/// Pin or unpin a comment.
/// Requires: Author OR Admin.
pub async fn update_comment(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (owner_id, is_pinned) = comment_owner(&pool, id).await?;

    if !user.claims.can_moderate(owner_id) {
        return Err(AppError::Forbidden(
            "Only the author or an admin can pin this comment".to_string(),
        ));
    }

    let pinned = payload.is_pinned.unwrap_or(!is_pinned);

    sqlx::query("UPDATE comments SET is_pinned = $1, updated_at = NOW() WHERE id = $2")
        .bind(pinned)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to pin comment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(serde_json::json!({ "id": id, "isPinned": pinned })))
}

/// Delete a comment and, through the foreign key cascade, all of its replies.
/// Requires: Author OR Admin.
pub async fn delete_comment(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (owner_id, _) = comment_owner(&pool, id).await?;

    if !user.claims.can_moderate(owner_id) {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this comment".to_string(),
        ));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete comment: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    tracing::info!(comment_id = id, user_id = user.id, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewer_placeholder_is_substituted() {
        let sql = comment_select("$3");
        assert!(!sql.contains("$VIEWER"));
        assert_eq!(sql.matches("l.user_id = $3").count(), 1);
        assert_eq!(sql.matches("d.user_id = $3").count(), 1);
    }

    #[test]
    fn reactions_are_mutually_exclusive_tables() {
        assert_eq!(Reaction::Like.opposite(), Reaction::Dislike);
        assert_ne!(Reaction::Like.table(), Reaction::Dislike.table());
    }
}
