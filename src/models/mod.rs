// src/models/mod.rs

pub mod anime;
pub mod comment;
pub mod episode;
pub mod post;
pub mod user;

use url::Url;

/// Validates that a string is an absolute http(s) URL.
/// Shared by cover images, avatars, thumbnails and episode embed sources.
pub fn validate_http_url(raw: &str) -> Result<(), validator::ValidationError> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_url")),
    }
}

#[cfg(test)]
mod tests {
    use super::validate_http_url;

    #[test]
    fn accepts_embed_urls() {
        assert!(validate_http_url("https://player.example.com/embed/abc?ep=3").is_ok());
    }

    #[test]
    fn rejects_relative_and_non_http() {
        assert!(validate_http_url("/embed/abc").is_err());
        assert!(validate_http_url("javascript:alert(1)").is_err());
        assert!(validate_http_url("ftp://files.example.com/a.mp4").is_err());
    }
}
