// src/models/anime.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validate_http_url;

pub const STATUSES: [&str; 3] = ["ongoing", "completed", "upcoming"];

/// Represents the 'anime' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Anime {
    pub id: i64,
    pub title: String,
    pub alt_title: Option<String>,

    /// Sanitized HTML.
    pub description: String,

    pub cover_image: Option<String>,

    /// Stored as a Postgres TEXT[].
    pub genres: Vec<String>,

    /// One of `STATUSES`.
    pub status: String,

    pub release_year: Option<i32>,
    pub rating: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Detail view: the anime row plus how many episodes are available.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub anime: Anime,
    pub episode_count: i64,
}

/// Query parameters for browsing the catalogue.
#[derive(Debug, Default, Deserialize)]
pub struct AnimeListParams {
    /// Search keyword matched against title and alternative title.
    pub q: Option<String>,
    pub genre: Option<String>,
    pub status: Option<String>,
    pub year: Option<i32>,
    /// 'newest' (default), 'title', 'rating' or 'year'.
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Catalogue ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimeSort {
    Newest,
    Title,
    Rating,
    Year,
}

impl AnimeSort {
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        match raw.unwrap_or("newest") {
            "newest" => Ok(Self::Newest),
            "title" => Ok(Self::Title),
            "rating" => Ok(Self::Rating),
            "year" => Ok(Self::Year),
            other => Err(format!("Unknown sort '{}'", other)),
        }
    }

    /// ORDER BY clause; constant strings only, never user input.
    pub fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY created_at DESC, id DESC",
            Self::Title => " ORDER BY LOWER(title) ASC, id ASC",
            Self::Rating => " ORDER BY rating DESC, id DESC",
            Self::Year => " ORDER BY release_year DESC NULLS LAST, id DESC",
        }
    }
}

/// DTO for creating a new anime entry.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnimeRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 200))]
    pub alt_title: Option<String>,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 500), custom(function = validate_http_url))]
    pub cover_image: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub genres: Vec<String>,
    #[validate(custom(function = validate_status))]
    #[serde(default = "default_status")]
    pub status: String,
    #[validate(range(min = 1900, max = 2100))]
    pub release_year: Option<i32>,
    #[validate(range(min = 0.0, max = 10.0))]
    #[serde(default)]
    pub rating: f64,
}

/// DTO for updating an anime entry. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAnimeRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub alt_title: Option<String>,
    #[validate(length(max = 20000))]
    pub description: Option<String>,
    #[validate(length(max = 500), custom(function = validate_http_url))]
    pub cover_image: Option<String>,
    #[validate(length(max = 20))]
    pub genres: Option<Vec<String>>,
    #[validate(custom(function = validate_status))]
    pub status: Option<String>,
    #[validate(range(min = 1900, max = 2100))]
    pub release_year: Option<i32>,
    #[validate(range(min = 0.0, max = 10.0))]
    pub rating: Option<f64>,
}

impl UpdateAnimeRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.alt_title.is_none()
            && self.description.is_none()
            && self.cover_image.is_none()
            && self.genres.is_none()
            && self.status.is_none()
            && self.release_year.is_none()
            && self.rating.is_none()
    }
}

fn default_status() -> String {
    "ongoing".to_string()
}

fn validate_status(status: &str) -> Result<(), validator::ValidationError> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_status"))
    }
}

/// Lowercases, trims and de-duplicates genre tags so filtering is case-insensitive.
pub fn normalize_genres(genres: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(genres.len());
    for genre in genres {
        let g = genre.trim().to_lowercase();
        if !g.is_empty() && !out.contains(&g) {
            out.push(g);
        }
    }
    out
}
