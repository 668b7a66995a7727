// src/models/episode.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::validate_http_url;

/// Represents the 'episodes' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: i64,
    pub anime_id: i64,
    pub number: i32,
    pub title: String,
    pub thumbnail: Option<String>,

    /// Third-party embed URL; playback happens in the embedding page.
    pub source_url: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A single episode ready to be inserted.
/// Used both for one-off creation and as an item of a bulk batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeDraft {
    #[validate(range(min = 1, message = "Episode number must be positive"))]
    pub number: i32,
    #[validate(length(min = 1, max = 300, message = "Title must be between 1 and 300 characters"))]
    pub title: String,
    #[validate(length(max = 500), custom(function = validate_http_url))]
    pub thumbnail: Option<String>,
    #[validate(length(max = 1000), custom(function = validate_http_url))]
    pub source_url: String,
}

/// DTO for editing an existing episode. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEpisodeRequest {
    #[validate(range(min = 1))]
    pub number: Option<i32>,
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[validate(length(max = 500), custom(function = validate_http_url))]
    pub thumbnail: Option<String>,
    #[validate(length(max = 1000), custom(function = validate_http_url))]
    pub source_url: Option<String>,
}

/// Admin input for generating a contiguous range of episodes.
///
/// Templates may contain `{number}`, replaced by each episode's number.
/// Override fields hold one value per line; line `i` applies to episode
/// `start + i` and a blank line falls back to the template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkEpisodeRequest {
    pub start: i32,
    pub end: i32,
    #[serde(default)]
    pub title_template: Option<String>,
    #[serde(default)]
    pub thumbnail_template: Option<String>,
    #[serde(default)]
    pub source_template: Option<String>,
    #[serde(default)]
    pub title_overrides: Option<String>,
    #[serde(default)]
    pub thumbnail_overrides: Option<String>,
    #[serde(default)]
    pub source_overrides: Option<String>,
}

/// Edited drafts submitted for creation.
#[derive(Debug, Deserialize)]
pub struct BulkCreateEpisodesRequest {
    pub episodes: Vec<EpisodeDraft>,
}
