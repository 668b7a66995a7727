//! Server-side rendering of a comment thread into an HTML fragment.
//!
//! Nesting is visual only: nodes deeper than `MAX_DEPTH` are still emitted
//! in tree order but stay at the cap's indentation. Spoiler content is
//! replaced by mask buttons; the hidden text never appears in the fragment
//! and must be fetched through the reveal endpoint.

use std::{collections::HashSet, fmt::Write};

use crate::{
    models::comment::CommentNode,
    utils::{
        html::escape_text,
        jwt::Claims,
        spoiler::{self, Segment},
    },
};

/// Deepest indentation level. Top-level comments are level 1.
pub const MAX_DEPTH: usize = 3;

/// Per-request view state.
#[derive(Debug, Default)]
pub struct RenderOptions<'a> {
    pub viewer: Option<&'a Claims>,
    /// Nodes whose reply subtree is folded.
    pub collapsed: HashSet<i64>,
}

/// Renders top-level comments and their replies.
pub fn render_thread(nodes: &[CommentNode], opts: &RenderOptions<'_>) -> String {
    let mut out = String::new();
    out.push_str("<ul class=\"comment-thread\">");
    for node in nodes {
        render_node(&mut out, node, 1, opts);
    }
    out.push_str("</ul>");
    out
}

fn render_node(out: &mut String, node: &CommentNode, depth: usize, opts: &RenderOptions<'_>) {
    let c = &node.comment;
    let level = depth.min(MAX_DEPTH);

    let _ = write!(
        out,
        "<li class=\"comment\" id=\"comment-{id}\" data-comment-id=\"{id}\" data-depth=\"{level}\"",
        id = c.id,
    );
    if let Some(parent) = c.parent_comment_id {
        let _ = write!(out, " data-reply-to=\"{}\"", parent);
    }
    out.push('>');

    render_meta(out, node);
    render_body(out, node);
    render_actions(out, node, opts);

    let collapsed = opts.collapsed.contains(&c.id);
    if !node.replies.is_empty() {
        let total = node.descendant_count();
        let _ = write!(
            out,
            "<button type=\"button\" class=\"toggle-replies\" data-action=\"toggle-replies\" \
             data-comment-id=\"{}\" aria-expanded=\"{}\">{} {} {}</button>",
            c.id,
            !collapsed,
            if collapsed { "Show" } else { "Hide" },
            total,
            if total == 1 { "reply" } else { "replies" },
        );
    }

    if collapsed || node.replies.is_empty() {
        out.push_str("</li>");
        return;
    }

    if depth < MAX_DEPTH {
        out.push_str("<ul class=\"comment-replies\">");
        for reply in &node.replies {
            render_node(out, reply, depth + 1, opts);
        }
        out.push_str("</ul></li>");
    } else {
        // At the cap: descendants become following siblings so they do not indent further.
        out.push_str("</li>");
        for reply in &node.replies {
            render_node(out, reply, depth + 1, opts);
        }
    }
}

fn render_meta(out: &mut String, node: &CommentNode) {
    let c = &node.comment;
    let _ = write!(
        out,
        "<div class=\"comment-meta\"><span class=\"comment-author\" data-user-id=\"{}\">{}</span> \
         <time datetime=\"{}\">{}</time>",
        c.user_id,
        escape_text(&c.username),
        c.created_at.to_rfc3339(),
        c.created_at.format("%Y-%m-%d %H:%M"),
    );
    if c.is_pinned {
        out.push_str(" <span class=\"comment-pinned\">Pinned</span>");
    }
    out.push_str("</div>");
}

fn render_body(out: &mut String, node: &CommentNode) {
    let c = &node.comment;
    if spoiler::has_hidden(&c.content, c.is_spoiler) {
        out.push_str("<div class=\"comment-body has-spoiler\">");
    } else {
        out.push_str("<div class=\"comment-body\">");
    }
    for segment in spoiler::segments(&c.content, c.is_spoiler) {
        match segment {
            Segment::Plain(text) => out.push_str(&escape_text(text)),
            Segment::Hidden { index, .. } => {
                let _ = write!(
                    out,
                    "<button type=\"button\" class=\"spoiler-mask\" data-action=\"reveal\" \
                     data-comment-id=\"{}\" data-segment=\"{}\">{}</button>",
                    c.id,
                    index,
                    if c.is_spoiler {
                        "This comment contains spoilers. Click to reveal."
                    } else {
                        "Spoiler"
                    },
                );
            }
        }
    }
    out.push_str("</div>");
}

fn render_actions(out: &mut String, node: &CommentNode, opts: &RenderOptions<'_>) {
    let c = &node.comment;
    out.push_str("<div class=\"comment-actions\">");

    let Some(viewer) = opts.viewer else {
        let _ = write!(
            out,
            "<a class=\"login-prompt\" href=\"/login\">Log in to reply or react</a>\
             <span class=\"comment-likes\">{}</span><span class=\"comment-dislikes\">{}</span></div>",
            c.likes, c.dislikes,
        );
        return;
    };

    let _ = write!(
        out,
        "<button type=\"button\" data-action=\"reply\" data-comment-id=\"{id}\">Reply</button>\
         <button type=\"button\" data-action=\"like\" data-comment-id=\"{id}\" aria-pressed=\"{liked}\">\
         Like <span class=\"comment-likes\">{likes}</span></button>\
         <button type=\"button\" data-action=\"dislike\" data-comment-id=\"{id}\" aria-pressed=\"{disliked}\">\
         Dislike <span class=\"comment-dislikes\">{dislikes}</span></button>",
        id = c.id,
        liked = c.is_liked,
        disliked = c.is_disliked,
        likes = c.likes,
        dislikes = c.dislikes,
    );

    if viewer.can_moderate(c.user_id) {
        let _ = write!(
            out,
            "<button type=\"button\" data-action=\"pin\" data-comment-id=\"{id}\">{label}</button>\
             <button type=\"button\" data-action=\"delete\" data-comment-id=\"{id}\">Delete</button>",
            id = c.id,
            label = if c.is_pinned { "Unpin" } else { "Pin" },
        );
    }

    out.push_str("</div>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::comment::CommentSort,
        utils::comment_tree::{assemble, tests::row},
    };

    fn claims(id: i64, role: &str) -> Claims {
        Claims {
            sub: id.to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    fn single(content: &str, is_spoiler: bool) -> Vec<CommentNode> {
        let mut r = row(1, None, 0, 0, 0);
        r.content = content.to_string();
        r.is_spoiler = is_spoiler;
        assemble(vec![r], CommentSort::Newest)
    }

    #[test]
    fn inline_spoiler_is_masked_until_revealed() {
        let body = "Great episode! ||the MC dies||";
        let html = render_thread(&single(body, false), &RenderOptions::default());

        assert!(html.contains("Great"));
        assert!(html.contains("class=\"spoiler-mask\""));
        assert!(html.contains("data-segment=\"0\""));
        assert!(!html.contains("MC"));
        assert!(!html.contains("dies"));

        assert_eq!(spoiler::reveal(body, false, 0), Some("the MC dies"));
        assert!(html.contains("class=\"comment-body has-spoiler\""));
    }

    #[test]
    fn empty_markers_leave_the_body_unmasked() {
        let html = render_thread(&single("loud |||| quiet", false), &RenderOptions::default());
        assert!(html.contains("<div class=\"comment-body\">"));
        assert!(!html.contains("has-spoiler"));
        assert!(!html.contains("spoiler-mask"));
    }

    #[test]
    fn flagged_comment_masks_whole_body() {
        let body = "Great episode! ||the MC dies||";
        let html = render_thread(&single(body, true), &RenderOptions::default());

        assert!(!html.contains("Great"));
        assert!(!html.contains("MC"));
        assert!(html.contains("Click to reveal"));
        assert_eq!(spoiler::reveal(body, true, 0), Some(body));
    }

    #[test]
    fn depth_is_capped_but_replies_still_render() {
        let rows = (1..=5)
            .map(|id| row(id, if id == 1 { None } else { Some(id - 1) }, id, 0, 0))
            .collect();
        let html = render_thread(&assemble(rows, CommentSort::Newest), &RenderOptions::default());

        for id in 1..=5 {
            assert!(html.contains(&format!("id=\"comment-{}\"", id)));
        }
        assert_eq!(html.matches("data-depth=\"1\"").count(), 1);
        assert_eq!(html.matches("data-depth=\"2\"").count(), 1);
        assert_eq!(html.matches("data-depth=\"3\"").count(), 3);
        assert!(!html.contains("data-depth=\"4\""));
        // Only two levels of nested reply lists are opened.
        assert_eq!(html.matches("<ul class=\"comment-replies\">").count(), 2);
    }

    #[test]
    fn collapsed_subtree_is_not_rendered() {
        let rows = vec![row(1, None, 0, 0, 0), row(2, Some(1), 1, 0, 0), row(3, Some(2), 2, 0, 0)];
        let opts = RenderOptions {
            viewer: None,
            collapsed: HashSet::from([1]),
        };
        let html = render_thread(&assemble(rows, CommentSort::Newest), &opts);

        assert!(html.contains("id=\"comment-1\""));
        assert!(!html.contains("id=\"comment-2\""));
        assert!(html.contains("Show 2 replies"));
        assert!(html.contains("aria-expanded=\"false\""));
    }

    #[test]
    fn anonymous_viewers_get_login_prompts() {
        let html = render_thread(&single("hello", false), &RenderOptions::default());
        assert!(html.contains("login-prompt"));
        assert!(!html.contains("data-action=\"like\""));
        assert!(!html.contains("data-action=\"pin\""));
    }

    #[test]
    fn moderation_actions_follow_ownership() {
        let nodes = single("hello", false);
        let author_id = nodes[0].comment.user_id;

        let author = claims(author_id, "user");
        let html = render_thread(&nodes, &RenderOptions { viewer: Some(&author), ..Default::default() });
        assert!(html.contains("data-action=\"pin\""));
        assert!(html.contains("data-action=\"delete\""));

        let stranger = claims(author_id + 1, "user");
        let html = render_thread(&nodes, &RenderOptions { viewer: Some(&stranger), ..Default::default() });
        assert!(html.contains("data-action=\"reply\""));
        assert!(!html.contains("data-action=\"pin\""));
        assert!(!html.contains("data-action=\"delete\""));

        let admin = claims(author_id + 2, "admin");
        let html = render_thread(&nodes, &RenderOptions { viewer: Some(&admin), ..Default::default() });
        assert!(html.contains("data-action=\"delete\""));
    }

    #[test]
    fn reaction_state_is_reflected() {
        let mut r = row(1, None, 0, 4, 1);
        r.is_liked = true;
        let nodes = assemble(vec![r], CommentSort::Newest);
        let viewer = claims(999, "user");
        let html = render_thread(&nodes, &RenderOptions { viewer: Some(&viewer), ..Default::default() });
        assert!(html.contains("data-action=\"like\" data-comment-id=\"1\" aria-pressed=\"true\""));
        assert!(html.contains("data-action=\"dislike\" data-comment-id=\"1\" aria-pressed=\"false\""));
    }

    #[test]
    fn user_text_is_escaped() {
        let html = render_thread(&single("<script>alert(1)</script>", false), &RenderOptions::default());
        assert!(!html.contains("<script>"));
    }
}
