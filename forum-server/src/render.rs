//! HTML rendering of a post and its comment tree.
//!
//! Each node is rendered by its own template; the nesting of reply lists is
//! written here while walking the tree with an explicit stack, so threads of
//! any depth render without recursion.

use std::fmt::{self, Write};

use askama::Template;
use chrono::SecondsFormat;
use forum_api::{Authored, Comment, CommentNode, Post, Thread, Time, UserId};

use crate::{rewrite, routes::Urls};

/// Depth past which replies are not indented any further
pub const MAX_INDENT_DEPTH: usize = 8;

/// Plain text shown as HTML paragraphs.
///
/// Blank lines separate paragraphs, single newlines become line breaks, and
/// everything else is escaped.
pub struct Body<'a>(pub &'a str);

impl fmt::Display for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // A line holding only whitespace separates paragraphs.
        let mut in_para = false;
        for line in self.0.lines().map(str::trim_end) {
            if line.trim_start().is_empty() {
                if in_para {
                    f.write_str("</p>")?;
                    in_para = false;
                }
                continue;
            }
            let line = if in_para {
                f.write_str("<br>")?;
                line
            } else {
                f.write_str("<p>")?;
                in_para = true;
                line.trim_start()
            };
            write!(f, "{}", askama_escape::escape(line, askama_escape::Html))?;
        }
        if in_para {
            f.write_str("</p>")?;
        }
        Ok(())
    }
}

/// A point in time, both machine- and human-readable
pub struct Timestamp {
    pub machine: String,
    pub human: String,
}

impl Timestamp {
    pub fn new(t: &Time) -> Timestamp {
        Timestamp {
            machine: t.to_rfc3339_opts(SecondsFormat::Secs, true),
            human: t.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "thread/post.html")]
struct PostNode<'a> {
    post: &'a Post,
    body: Body<'a>,
    author_url: String,
    created: Timestamp,
    modified: Option<Timestamp>,
    edit_url: Option<String>,
    delete_action: Option<String>,
}

#[derive(Template)]
#[template(path = "thread/comment.html")]
struct CommentNodeView<'a> {
    comment: &'a Comment,
    body: Body<'a>,
    author_url: String,
    created: Timestamp,
    depth: usize,
    indent: usize,
    delete_action: Option<String>,
    reply_action: Option<String>,
}

enum Step<'t> {
    Open(&'t CommentNode, usize),
    Close,
}

fn indent(depth: usize) -> usize {
    std::cmp::min(depth, MAX_INDENT_DEPTH)
}

fn open_replies(out: &mut String, depth: usize) -> fmt::Result {
    writeln!(
        out,
        r#"<ol class="replies depth-{}" data-depth="{depth}">"#,
        indent(depth)
    )
}

/// Renders threads as seen by one viewer
pub struct ThreadRenderer<'u, U> {
    urls: &'u U,
    viewer: Option<UserId>,
}

impl<'u, U: Urls> ThreadRenderer<'u, U> {
    pub fn new(urls: &'u U, viewer: Option<UserId>) -> ThreadRenderer<'u, U> {
        ThreadRenderer { urls, viewer }
    }

    fn post_node<'p>(&self, post: &'p Post) -> PostNode<'p> {
        let can_modify = post.can_be_modified_by(self.viewer);
        PostNode {
            post,
            body: Body(&post.body),
            author_url: self.urls.user_profile(&post.author.login),
            created: Timestamp::new(&post.created_at),
            modified: (post.modified_at != post.created_at)
                .then(|| Timestamp::new(&post.modified_at)),
            edit_url: can_modify.then(|| self.urls.post_edit(post.id)),
            delete_action: can_modify.then(|| {
                rewrite::override_method(
                    &self.urls.post_delete(post.id),
                    &axum::http::Method::DELETE,
                )
            }),
        }
    }

    fn comment_node<'c>(&self, comment: &'c Comment, depth: usize) -> CommentNodeView<'c> {
        CommentNodeView {
            comment,
            body: Body(&comment.body),
            author_url: self.urls.user_profile(&comment.author.login),
            created: Timestamp::new(&comment.created_at),
            depth,
            indent: indent(depth),
            delete_action: comment.can_be_modified_by(self.viewer).then(|| {
                rewrite::override_method(
                    &self.urls.comment_delete(comment.post_id, comment.id),
                    &axum::http::Method::DELETE,
                )
            }),
            reply_action: self
                .viewer
                .map(|_| self.urls.comment_form(comment.post_id)),
        }
    }

    pub fn render(&self, thread: &Thread) -> askama::Result<String> {
        let mut out = String::new();
        self.post_node(&thread.post).render_into(&mut out)?;
        if thread.replies.is_empty() {
            return Ok(out);
        }

        out.push_str("\n<section class=\"comments\">\n");
        open_replies(&mut out, 1)?;
        let mut stack = thread
            .replies
            .iter()
            .rev()
            .map(|n| Step::Open(n, 1))
            .collect::<Vec<_>>();
        while let Some(step) = stack.pop() {
            match step {
                Step::Close => out.push_str("</ol>\n</li>\n"),
                Step::Open(node, depth) => {
                    self.comment_node(&node.comment, depth)
                        .render_into(&mut out)?;
                    out.push('\n');
                    if node.replies.is_empty() {
                        out.push_str("</li>\n");
                    } else {
                        open_replies(&mut out, depth + 1)?;
                        stack.push(Step::Close);
                        stack.extend(node.replies.iter().rev().map(|n| Step::Open(n, depth + 1)));
                    }
                }
            }
        }
        out.push_str("</ol>\n</section>\n");
        Ok(out)
    }
}

/// Renders `thread` for `viewer`, `None` meaning an anonymous visitor
pub fn render_thread<U: Urls>(
    thread: &Thread,
    viewer: Option<UserId>,
    urls: &U,
) -> askama::Result<String> {
    ThreadRenderer::new(urls, viewer).render(thread)
}
