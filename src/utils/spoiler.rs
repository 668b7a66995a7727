//! Spoiler masking for comment bodies.
//!
//! A body flagged as a spoiler is one hidden segment. Otherwise every
//! `||text||` span is a hidden segment and the rest is plain text. Hidden
//! segments are numbered from 0 in reading order; that index is what the
//! reveal endpoint takes.

use std::sync::LazyLock;

use regex::Regex;

static SPOILER_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\|\|(.+?)\|\|").expect("spoiler pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Hidden { index: usize, text: &'a str },
}

/// Splits a body into plain and hidden segments.
pub fn segments(body: &str, is_spoiler: bool) -> Vec<Segment<'_>> {
    if is_spoiler {
        return vec![Segment::Hidden { index: 0, text: body }];
    }

    let mut out = Vec::new();
    let mut cursor = 0;
    for (index, caps) in SPOILER_SPAN.captures_iter(body).enumerate() {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > cursor {
            out.push(Segment::Plain(&body[cursor..whole.start()]));
        }
        out.push(Segment::Hidden {
            index,
            text: inner.as_str(),
        });
        cursor = whole.end();
    }
    if cursor < body.len() {
        out.push(Segment::Plain(&body[cursor..]));
    }
    out
}

/// True when rendering the body would hide anything.
pub fn has_hidden(body: &str, is_spoiler: bool) -> bool {
    is_spoiler || SPOILER_SPAN.is_match(body)
}

/// Text of hidden segment `index`, if it exists.
pub fn reveal(body: &str, is_spoiler: bool, index: usize) -> Option<&str> {
    segments(body, is_spoiler)
        .into_iter()
        .find_map(|segment| match segment {
            Segment::Hidden { index: i, text } if i == index => Some(text),
            _ => None,
        })
}
