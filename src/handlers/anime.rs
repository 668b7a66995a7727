// src/handlers/anime.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppError,
    models::{
        anime::{Anime, AnimeDetail, AnimeListParams, AnimeSort, STATUSES},
        episode::Episode,
    },
};

const ANIME_COLUMNS: &str = "id, title, alt_title, description, cover_image, genres, status, \
     release_year, rating, created_at, updated_at";

/// Builds the catalogue query for the given filters.
fn list_query(params: &AnimeListParams, sort: AnimeSort) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM anime WHERE TRUE", ANIME_COLUMNS));

    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR alt_title ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(genre) = params.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
        builder.push(" AND ");
        builder.push_bind(genre.to_lowercase());
        builder.push(" = ANY(genres)");
    }

    if let Some(status) = params.status.clone() {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    if let Some(year) = params.year {
        builder.push(" AND release_year = ");
        builder.push_bind(year);
    }

    builder.push(sort.order_by());

    let limit = params.limit.unwrap_or(24).clamp(1, 100);
    let offset = params.offset.unwrap_or(0).max(0);
    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    builder
}

/// Browse and search the catalogue.
pub async fn list_anime(
    State(pool): State<PgPool>,
    Query(params): Query<AnimeListParams>,
) -> Result<impl IntoResponse, AppError> {
    let sort = AnimeSort::parse(params.sort.as_deref()).map_err(AppError::BadRequest)?;

    if let Some(status) = params.status.as_deref() {
        if !STATUSES.contains(&status) {
            return Err(AppError::BadRequest(format!("Unknown status '{}'", status)));
        }
    }

    let anime = list_query(&params, sort)
        .build_query_as::<Anime>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list anime: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(anime))
}

/// Retrieves a single anime with its episode count.
pub async fn get_anime(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let detail = sqlx::query_as::<_, AnimeDetail>(&format!(
        "SELECT {}, (SELECT COUNT(*) FROM episodes e WHERE e.anime_id = anime.id) AS episode_count \
         FROM anime WHERE id = $1",
        ANIME_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Anime not found".to_string()))?;

    Ok(Json(detail))
}

/// Lists episodes of an anime in airing order.
pub async fn list_episodes(
    State(pool): State<PgPool>,
    Path(anime_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM anime WHERE id = $1")
        .bind(anime_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Anime not found".to_string()))?;

    let episodes = sqlx::query_as::<_, Episode>(
        r#"
        SELECT id, anime_id, number, title, thumbnail, source_url, created_at
        FROM episodes
        WHERE anime_id = $1
        ORDER BY number ASC
        "#,
    )
    .bind(anime_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(episodes))
}

/// Retrieves one episode by its number within the anime.
pub async fn get_episode(
    State(pool): State<PgPool>,
    Path((anime_id, number)): Path<(i64, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let episode = sqlx::query_as::<_, Episode>(
        r#"
        SELECT id, anime_id, number, title, thumbnail, source_url, created_at
        FROM episodes
        WHERE anime_id = $1 AND number = $2
        "#,
    )
    .bind(anime_id)
    .bind(number)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Episode not found".to_string()))?;

    Ok(Json(episode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_binds_every_filter() {
        let params = AnimeListParams {
            q: Some("50%_off".into()),
            genre: Some("Action".into()),
            status: Some("ongoing".into()),
            year: Some(2023),
            ..Default::default()
        };
        let builder = list_query(&params, AnimeSort::Rating);
        let sql = builder.sql();

        assert!(sql.contains("title ILIKE $1 OR alt_title ILIKE $2"));
        assert!(sql.contains("$3 = ANY(genres)"));
        assert!(sql.contains("status = $4"));
        assert!(sql.contains("release_year = $5"));
        assert!(sql.contains("ORDER BY rating DESC"));
        assert!(sql.ends_with("LIMIT $6 OFFSET $7"));
        assert!(!sql.contains("50%"));
    }

    #[test]
    fn list_query_without_filters() {
        let builder = list_query(&AnimeListParams::default(), AnimeSort::Newest);
        assert!(builder.sql().contains("WHERE TRUE ORDER BY created_at DESC"));
    }
}
