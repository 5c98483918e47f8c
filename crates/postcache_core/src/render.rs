//! Deterministic post-to-markup rendering.
//!
//! # Responsibility
//! - Map a post's title/body into a self-contained HTML fragment.
//!
//! # Invariants
//! - Rendering is pure: same post, same bytes. No I/O, no clock, no randomness.
//! - User text only reaches the markup through maud splices, which escape it.

use crate::model::post::{Artifact, Post};
use maud::html;
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r]*(?:\n[ \t\r]*)+").expect("valid paragraph regex"));

/// Renders one post into its artifact markup.
///
/// Body rules:
/// - blank lines separate `<p>` paragraphs;
/// - single newlines inside a paragraph become `<br>`.
pub fn render_post(post: &Post) -> Artifact {
    let paragraphs = paragraphs(&post.body);
    let markup = html! {
        article class="post-item" data-post-id=(post.id.to_string()) {
            h2 class="post-item__title" { (post.title.trim()) }
            div class="post-item__body" {
                @for lines in &paragraphs {
                    p {
                        @for (idx, line) in lines.iter().enumerate() {
                            @if idx > 0 {
                                br;
                            }
                            (line)
                        }
                    }
                }
            }
        }
    };
    Artifact::new(markup.into_string())
}

/// Splits the body into paragraphs of trimmed, non-empty lines.
fn paragraphs(body: &str) -> Vec<Vec<&str>> {
    PARAGRAPH_BREAK_RE
        .split(body.trim())
        .map(|paragraph| {
            paragraph
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|lines| !lines.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{paragraphs, render_post};
    use crate::model::post::Post;

    #[test]
    fn render_is_deterministic_and_contains_fields() {
        let post = Post::new("Hello", "World").unwrap();
        let first = render_post(&post);
        let second = render_post(&post);
        assert_eq!(first, second);
        assert!(first
            .as_str()
            .contains("<h2 class=\"post-item__title\">Hello</h2>"));
        assert!(first.as_str().contains("<p>World</p>"));
        assert!(first
            .as_str()
            .contains(&format!("data-post-id=\"{}\"", post.id)));
    }

    #[test]
    fn render_splits_paragraphs_and_line_breaks() {
        let post = Post::new("t", "one\ntwo\r\n\r\n  \nthree").unwrap();
        let markup = render_post(&post).into_string();
        assert!(markup.contains("<p>one<br>two</p>"));
        assert!(markup.contains("<p>three</p>"));
        assert_eq!(markup.matches("<p>").count(), 2);
    }

    #[test]
    fn render_escapes_markup_in_user_text() {
        let post = Post::new("<script>", "a & \"b\"").unwrap();
        let markup = render_post(&post).into_string();
        assert!(!markup.contains("<script>"));
        assert!(markup.contains("&lt;script&gt;"));
        assert!(markup.contains("a &amp; &quot;b&quot;"));
    }

    #[test]
    fn paragraphs_drop_blank_lines_and_handle_crlf() {
        assert_eq!(
            paragraphs("  a\r\nb \r\n\r\n\r\nc\n"),
            vec![vec!["a", "b"], vec!["c"]]
        );
    }
}
