use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        comment::CommentRow,
        user::{MeResponse, PublicProfile, UpdateProfileRequest},
    },
    utils::session::AuthUser,
};

/// Get current user's profile and statistics.
pub async fn get_me(
    State(pool): State<PgPool>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    // Subqueries are cheap thanks to the indexes on comments.user_id.
    let me = sqlx::query_as::<_, MeResponse>(
        r#"
        SELECT
            u.id, u.username, u.role, u.avatar_url, u.bio, u.created_at,
            (SELECT COUNT(*) FROM comments WHERE user_id = u.id) AS comments_count,
            (SELECT COUNT(*) FROM comment_likes cl JOIN comments c ON cl.comment_id = c.id
              WHERE c.user_id = u.id) AS likes_received
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(user.id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(me))
}

/// Edit avatar and bio. Absent fields are left alone; an empty string clears.
pub async fn update_me(
    State(pool): State<PgPool>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let avatar_url = payload.avatar_url.as_deref().map(str::trim);
    let bio = payload.bio.as_deref().map(str::trim);

    // Empty strings mean "clear" and are not URLs, so validate only what will be stored.
    let check = UpdateProfileRequest {
        avatar_url: avatar_url.filter(|a| !a.is_empty()).map(str::to_string),
        bio: bio.map(str::to_string),
    };
    check.validate()?;

    sqlx::query(
        r#"
        UPDATE users SET
            avatar_url = CASE WHEN $2 THEN NULLIF($3, '') ELSE avatar_url END,
            bio = CASE WHEN $4 THEN NULLIF($5, '') ELSE bio END
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(avatar_url.is_some())
    .bind(avatar_url.unwrap_or_default())
    .bind(bio.is_some())
    .bind(bio.unwrap_or_default())
    .execute(&pool)
    .await?;

    Ok(StatusCode::OK)
}

/// List the caller's own comments, newest first.
pub async fn list_my_comments(
    State(pool): State<PgPool>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let comments = sqlx::query_as::<_, CommentRow>(
        r#"
        SELECT
            c.id, c.user_id, u.username, c.anime_id, c.episode_number, c.content,
            c.parent_comment_id, c.likes, c.dislikes, c.is_pinned, c.is_spoiler,
            EXISTS (SELECT 1 FROM comment_likes l WHERE l.comment_id = c.id AND l.user_id = $1) AS is_liked,
            EXISTS (SELECT 1 FROM comment_dislikes d WHERE d.comment_id = c.id AND d.user_id = $1) AS is_disliked,
            c.created_at, c.updated_at
        FROM comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.user_id = $1
        ORDER BY c.created_at DESC, c.id DESC
        "#,
    )
    .bind(user.id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(comments))
}

/// Public profile of any user.
pub async fn get_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let profile = sqlx::query_as::<_, PublicProfile>(
        r#"
        SELECT
            u.id, u.username, u.avatar_url, u.bio, u.created_at,
            (SELECT COUNT(*) FROM comments WHERE user_id = u.id) AS comments_count
        FROM users u
        WHERE u.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(profile))
}
