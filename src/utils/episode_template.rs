//! Bulk episode generation: expands a numbered range plus templates and
//! per-line overrides into a list of editable drafts.

use std::fmt;

use validator::Validate;

use crate::{
    error::AppError,
    models::episode::{BulkEpisodeRequest, EpisodeDraft},
};

/// Largest range a single bulk request may cover.
pub const MAX_BULK_EPISODES: i32 = 500;

/// Substituted with the episode number in every template.
pub const NUMBER_TOKEN: &str = "{number}";

const DEFAULT_TITLE_TEMPLATE: &str = "Episode {number}";

/// Everything wrong with a generation request, reported at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    pub problems: Vec<String>,
}

impl GenerationError {
    fn single(message: impl Into<String>) -> Self {
        Self {
            problems: vec![message.into()],
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.problems.join("; "))
    }
}

impl std::error::Error for GenerationError {}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Replaces every `{number}` token in `template`.
pub fn substitute(template: &str, number: i32) -> String {
    template.replace(NUMBER_TOKEN, &number.to_string())
}

/// Splits a multi-line override field. Blank lines mean "use the template".
fn override_lines(raw: Option<&str>) -> Vec<Option<String>> {
    raw.map(|text| {
        let lines: Vec<Option<String>> = text
            .lines()
            .map(|line| Some(line.trim().to_string()).filter(|l| !l.is_empty()))
            .collect();
        // A trailing newline from a textarea should not count as an extra row.
        let keep = lines.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
        lines.into_iter().take(keep).collect()
    })
    .unwrap_or_default()
}

fn template(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|t| !t.is_empty())
}

/// Expands a bulk request into drafts for `start..=end`.
pub fn generate(req: &BulkEpisodeRequest) -> Result<Vec<EpisodeDraft>, GenerationError> {
    if req.start < 1 {
        return Err(GenerationError::single("Start episode must be at least 1"));
    }
    if req.end < req.start {
        return Err(GenerationError::single(format!(
            "End episode ({}) is before start episode ({})",
            req.end, req.start
        )));
    }
    let count = req.end - req.start + 1;
    if count > MAX_BULK_EPISODES {
        return Err(GenerationError::single(format!(
            "At most {} episodes can be generated at once, got {}",
            MAX_BULK_EPISODES, count
        )));
    }

    let titles = override_lines(req.title_overrides.as_deref());
    let thumbnails = override_lines(req.thumbnail_overrides.as_deref());
    let sources = override_lines(req.source_overrides.as_deref());

    let mut problems = Vec::new();
    for (field, lines) in [("titleOverrides", &titles), ("thumbnailOverrides", &thumbnails), ("sourceOverrides", &sources)] {
        if lines.len() > count as usize {
            problems.push(format!(
                "{} has {} lines but the range covers {} episodes",
                field,
                lines.len(),
                count
            ));
        }
    }
    if !problems.is_empty() {
        return Err(GenerationError { problems });
    }

    let title_template = template(req.title_template.as_deref()).unwrap_or(DEFAULT_TITLE_TEMPLATE);
    let thumbnail_template = template(req.thumbnail_template.as_deref());
    let source_template = template(req.source_template.as_deref());

    let pick = |lines: &[Option<String>], i: usize, fallback: Option<&str>, number: i32| {
        lines
            .get(i)
            .cloned()
            .flatten()
            .or_else(|| fallback.map(|t| substitute(t, number)))
    };

    let mut drafts = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let number = req.start + i as i32;

        let Some(source_url) = pick(&sources, i, source_template, number) else {
            problems.push(format!("Episode {}: no source URL (template or override)", number));
            continue;
        };

        let draft = EpisodeDraft {
            number,
            title: pick(&titles, i, Some(title_template), number).unwrap_or_default(),
            thumbnail: pick(&thumbnails, i, thumbnail_template, number),
            source_url,
        };

        if let Err(errors) = draft.validate() {
            problems.push(format!("Episode {}: {}", number, errors));
            continue;
        }
        drafts.push(draft);
    }

    if problems.is_empty() {
        Ok(drafts)
    } else {
        Err(GenerationError { problems })
    }
}
