// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::{
        anime::{CreateAnimeRequest, UpdateAnimeRequest, normalize_genres},
        episode::{
            BulkCreateEpisodesRequest, BulkEpisodeRequest, Episode, EpisodeDraft,
            UpdateEpisodeRequest,
        },
        user::{ROLE_ADMIN, ROLE_USER, User},
    },
    utils::{
        bulk::BulkReport, episode_template, hash::hash_password, html::clean_html,
        session::AuthUser,
    },
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, avatar_url, bio, created_at
        FROM users
        ORDER BY id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(users))
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    if role == ROLE_USER || role == ROLE_ADMIN {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_role"))
    }
}

/// DTO for Admin creating a user (can specify role).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username length must be between 3 and 50 characters."))]
    pub username: String,
    #[validate(length(min = 4, max = 128, message = "Password length must be between 4 and 128 characters."))]
    pub password: String,
    #[validate(custom(function = validate_role))]
    pub role: String,
}

/// Creates a new user with specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<PgPool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash_password(&payload.password)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (username, password, role)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&payload.username)
    .bind(hashed_password)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Username '{}' already exists", payload.username))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.username.is_none() && payload.role.is_none() && payload.password.is_none() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(username) = payload.username.clone() {
        separated.push("username = ");
        separated.push_bind_unseparated(username);
    }

    if let Some(role) = payload.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role);
    }

    if let Some(password) = payload.password {
        separated.push("password = ");
        separated.push_bind_unseparated(hash_password(&password)?);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!(
                "Username '{}' already exists",
                payload.username.unwrap_or_default()
            ))
        } else {
            tracing::error!("Failed to update user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::OK)
}

async fn delete_user_by_id(pool: &PgPool, admin_id: i64, id: i64) -> Result<(), AppError> {
    if id == admin_id {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    // Comments, reactions and posts go with the user via ON DELETE CASCADE.
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(())
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(pool): State<PgPool>,
    admin: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    delete_user_by_id(&pool, admin.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteUsersRequest {
    pub ids: Vec<i64>,
}

/// Deletes several users, one at a time. A failure on one id does not
/// stop the others; the response tallies both.
pub async fn bulk_delete_users(
    State(pool): State<PgPool>,
    admin: AuthUser,
    Json(payload): Json<BulkDeleteUsersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut report = BulkReport::default();
    for id in payload.ids {
        let outcome = delete_user_by_id(&pool, admin.id, id).await;
        report.record(id, &outcome);
    }

    tracing::info!(
        deleted = report.succeeded,
        failed = report.failed,
        "Bulk user deletion finished"
    );

    Ok(Json(report))
}

/// Creates a new anime entry.
/// Admin only.
pub async fn create_anime(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateAnimeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO anime
        (title, alt_title, description, cover_image, genres, status, release_year, rating)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(payload.title.trim())
    .bind(payload.alt_title)
    .bind(clean_html(&payload.description))
    .bind(payload.cover_image)
    .bind(normalize_genres(payload.genres))
    .bind(payload.status)
    .bind(payload.release_year)
    .bind(payload.rating)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create anime: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// Updates an anime entry by ID.
/// Admin only.
pub async fn update_anime(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAnimeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE anime SET updated_at = NOW()");

    if let Some(title) = payload.title {
        builder.push(", title = ");
        builder.push_bind(title.trim().to_string());
    }

    if let Some(alt_title) = payload.alt_title {
        builder.push(", alt_title = ");
        builder.push_bind(alt_title);
    }

    if let Some(description) = payload.description {
        builder.push(", description = ");
        builder.push_bind(clean_html(&description));
    }

    if let Some(cover_image) = payload.cover_image {
        builder.push(", cover_image = ");
        builder.push_bind(cover_image);
    }

    if let Some(genres) = payload.genres {
        builder.push(", genres = ");
        builder.push_bind(normalize_genres(genres));
    }

    if let Some(status) = payload.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }

    if let Some(release_year) = payload.release_year {
        builder.push(", release_year = ");
        builder.push_bind(release_year);
    }

    if let Some(rating) = payload.rating {
        builder.push(", rating = ");
        builder.push_bind(rating);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update anime: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Anime not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an anime entry with its episodes and comments.
/// Admin only.
pub async fn delete_anime(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM anime WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete anime: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Anime not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_anime(pool: &PgPool, anime_id: i64) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM anime WHERE id = $1")
        .bind(anime_id)
        .fetch_optional(pool)
        .await?
        .map(|_| ())
        .ok_or(AppError::NotFound("Anime not found".to_string()))
}

async fn insert_episode(pool: &PgPool, anime_id: i64, draft: &EpisodeDraft) -> Result<Episode, AppError> {
    draft.validate()?;

    sqlx::query_as::<_, Episode>(
        r#"
        INSERT INTO episodes (anime_id, number, title, thumbnail, source_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, anime_id, number, title, thumbnail, source_url, created_at
        "#,
    )
    .bind(anime_id)
    .bind(draft.number)
    .bind(draft.title.trim())
    .bind(&draft.thumbnail)
    .bind(&draft.source_url)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Episode {} already exists", draft.number))
        } else {
            tracing::error!("Failed to create episode: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })
}

/// Adds one episode to an anime.
/// Admin only.
pub async fn create_episode(
    State(pool): State<PgPool>,
    Path(anime_id): Path<i64>,
    Json(payload): Json<EpisodeDraft>,
) -> Result<impl IntoResponse, AppError> {
    ensure_anime(&pool, anime_id).await?;
    let episode = insert_episode(&pool, anime_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(episode)))
}

/// Expands a range and templates into editable drafts. Nothing is stored.
/// Admin only.
pub async fn preview_episodes(
    State(pool): State<PgPool>,
    Path(anime_id): Path<i64>,
    Json(payload): Json<BulkEpisodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_anime(&pool, anime_id).await?;
    let drafts = episode_template::generate(&payload)?;
    Ok(Json(drafts))
}

/// Creates each submitted draft independently and reports the tally.
/// Admin only.
pub async fn bulk_create_episodes(
    State(pool): State<PgPool>,
    Path(anime_id): Path<i64>,
    Json(payload): Json<BulkCreateEpisodesRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_anime(&pool, anime_id).await?;

    if payload.episodes.len() > episode_template::MAX_BULK_EPISODES as usize {
        return Err(AppError::BadRequest(format!(
            "At most {} episodes can be created at once",
            episode_template::MAX_BULK_EPISODES
        )));
    }

    let mut report = BulkReport::default();
    for draft in &payload.episodes {
        let outcome = insert_episode(&pool, anime_id, draft).await;
        report.record(i64::from(draft.number), &outcome);
    }

    tracing::info!(
        anime_id,
        created = report.succeeded,
        failed = report.failed,
        "Bulk episode creation finished"
    );

    Ok(Json(report))
}

/// Updates an episode by ID.
/// Admin only.
pub async fn update_episode(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateEpisodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.number.is_none()
        && payload.title.is_none()
        && payload.thumbnail.is_none()
        && payload.source_url.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE episodes SET ");
    let mut separated = builder.separated(", ");

    if let Some(number) = payload.number {
        separated.push("number = ");
        separated.push_bind_unseparated(number);
    }

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(thumbnail) = payload.thumbnail {
        separated.push("thumbnail = ");
        separated.push_bind_unseparated(thumbnail);
    }

    if let Some(source_url) = payload.source_url {
        separated.push("source_url = ");
        separated.push_bind_unseparated(source_url);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Another episode already has that number".to_string())
        } else {
            tracing::error!("Failed to update episode: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Episode not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes an episode by ID.
/// Admin only.
pub async fn delete_episode(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM episodes WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete episode: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Episode not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
