//! Rebuilds reply trees from flat comment rows.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

use crate::models::comment::{CommentNode, CommentRow, CommentSort};

/// Orders two sibling comments. Earlier in the result means "first".
///
/// Newest: creation time descending. Popular: net score descending, ties
/// go to the more recent comment. Both fall back to id so the order is
/// total even for identical timestamps.
pub fn compare(a: &CommentRow, b: &CommentRow, sort: CommentSort) -> Ordering {
    let newest = b
        .created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id));

    match sort {
        CommentSort::Newest => newest,
        CommentSort::Popular => b.score().cmp(&a.score()).then(newest),
    }
}

/// Groups rows by parent reference and returns the ordered top-level list.
///
/// Pinned comments are hoisted above the rest of the top-level list only;
/// a pinned reply keeps its normal position among its siblings. Rows whose
/// parent is not part of `rows` are dropped.
pub fn assemble(rows: Vec<CommentRow>, sort: CommentSort) -> Vec<CommentNode> {
    let present: HashSet<i64> = rows.iter().map(|r| r.id).collect();

    let mut by_parent: HashMap<Option<i64>, Vec<CommentRow>> = HashMap::new();
    for row in rows {
        match row.parent_comment_id {
            Some(parent) if !present.contains(&parent) => {
                tracing::debug!(comment_id = row.id, parent, "Dropping reply with missing parent");
            }
            parent => by_parent.entry(parent).or_default().push(row),
        }
    }

    let mut roots = build_level(None, &mut by_parent, sort);
    // Stable: keeps the mode's order inside the pinned and unpinned groups.
    roots.sort_by_key(|node| !node.comment.is_pinned);
    roots
}

fn build_level(
    parent: Option<i64>,
    by_parent: &mut HashMap<Option<i64>, Vec<CommentRow>>,
    sort: CommentSort,
) -> Vec<CommentNode> {
    let mut siblings = by_parent.remove(&parent).unwrap_or_default();
    siblings.sort_by(|a, b| compare(a, b, sort));

    siblings
        .into_iter()
        .map(|comment| {
            let replies = build_level(Some(comment.id), by_parent, sort);
            CommentNode { comment, replies }
        })
        .collect()
}
