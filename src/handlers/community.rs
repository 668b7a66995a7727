use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::post::{CreatePostRequest, Post, PostListParams},
    utils::session::{AuthUser, Viewer},
};

const POST_SELECT: &str = r#"
    SELECT
        p.id, p.user_id, u.username, p.title, p.content, p.likes_count,
        EXISTS (SELECT 1 FROM post_likes pl WHERE pl.post_id = p.id AND pl.user_id = $1) AS is_liked,
        p.created_at
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

/// Create a new feed post.
pub async fn create_post(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, title, content)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(user.id)
    .bind(payload.title.trim())
    .bind(&payload.content)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": post_id})),
    ))
}

/// List posts (Recent first), skipping soft-deleted ones.
/// Supports cursor-based pagination.
pub async fn list_posts(
    State(pool): State<PgPool>,
    viewer: Viewer,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(20).clamp(1, 100);

    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"{}
        WHERE p.deleted_at IS NULL
          AND ($2::TIMESTAMPTZ IS NULL OR p.created_at < $2)
        ORDER BY p.created_at DESC
        LIMIT $3
        "#,
        POST_SELECT
    ))
    .bind(viewer.user_id())
    .bind(params.cursor)
    .bind(limit)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(posts))
}

/// Get a single post by ID.
pub async fn get_post(
    State(pool): State<PgPool>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = sqlx::query_as::<_, Post>(&format!(
        "{} WHERE p.id = $2 AND p.deleted_at IS NULL",
        POST_SELECT
    ))
    .bind(viewer.user_id())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete a post (Soft Delete).
/// Requires: Author OR Admin.
pub async fn delete_post(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let owner_id = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM posts WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if !user.claims.can_moderate(owner_id) {
        return Err(AppError::Forbidden(
            "You are not authorized to delete this post".to_string(),
        ));
    }

    sqlx::query("UPDATE posts SET deleted_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle Like on a post.
pub async fn toggle_post_like(
    State(pool): State<PgPool>,
    user: AuthUser,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query_scalar::<_, i64>(
        "SELECT id FROM posts WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
    )
    .bind(post_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let removed = sqlx::query("DELETE FROM post_likes WHERE user_id = $1 AND post_id = $2")
        .bind(user.id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let likes_count = if removed > 0 {
        sqlx::query_scalar::<_, i32>(
            "UPDATE posts SET likes_count = GREATEST(0, likes_count - 1) WHERE id = $1 RETURNING likes_count",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?
    } else {
        sqlx::query("INSERT INTO post_likes (user_id, post_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query_scalar::<_, i32>(
            "UPDATE posts SET likes_count = likes_count + 1 WHERE id = $1 RETURNING likes_count",
        )
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?
    };

    tx.commit().await?;

    Ok(Json(serde_json::json!({
        "liked": removed == 0,
        "likesCount": likes_count,
    })))
}
