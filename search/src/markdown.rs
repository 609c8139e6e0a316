//! Normalizes loosely structured model output into HTML.
//!
//! Answers from the model tend to use `Label:` lines instead of headings and
//! typographic bullets instead of list markers. Before rendering, the text is
//! rewritten in a fixed order:
//!
//! 1. `\r\n` becomes `\n`.
//! 2. A line-start `Words:` becomes a `## Words` heading (colon dropped,
//!    trailing whitespace kept).
//! 3. Any remaining line-start `Words:` not followed by a digit becomes
//!    `### Words`. Lines already starting with `#` never match.
//! 4. Lines starting with `•`, `●` or `○` become `* ` bullets.
//! 5. Paragraphs are split on blank lines; plain paragraphs get a trailing
//!    newline, headings and lists are left alone.
//!
//! The result is rendered as GitHub-flavoured markdown where a single
//! newline inside a paragraph is a line break.

use std::future::Future;
use std::sync::OnceLock;

use pulldown_cmark::{html, Event, Options, Parser};
use regex::{Captures, Regex};

fn section_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([A-Za-z][A-Za-z\s]+):(\s*)").expect("valid regex"))
}

// The trailing `\d?` stands in for a negative lookahead: a captured digit
// means the colon is part of something like a time or ratio.
fn inline_label() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^([A-Za-z][A-Za-z\s]+):(\d?)").expect("valid regex"))
}

fn bullet_glyph() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[•●○]\s*").expect("valid regex"))
}

/// Converts raw answer text into renderable HTML. Never fails.
pub fn normalize(raw: &str) -> String {
    let text = raw.replace("\r\n", "\n");
    let text = promote_sections(&text);
    let text = promote_labels(&text);
    let text = normalize_bullets(&text);
    render_html(&segment_paragraphs(&text))
}

/// Resolves a pending answer and normalizes it.
pub async fn normalize_pending<F>(pending: F) -> String
where
    F: Future<Output = String>,
{
    let raw = pending.await;
    normalize(&raw)
}

fn promote_sections(text: &str) -> String {
    section_label().replace_all(text, "## ${1}${2}").into_owned()
}

fn promote_labels(text: &str) -> String {
    inline_label()
        .replace_all(text, |caps: &Captures| {
            if caps[2].is_empty() {
                format!("### {}", &caps[1])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

fn normalize_bullets(text: &str) -> String {
    bullet_glyph().replace_all(text, "* ").into_owned()
}

fn segment_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| {
            if paragraph.starts_with('#') || paragraph.starts_with('*') || paragraph.starts_with('-')
            {
                paragraph.to_string()
            } else {
                format!("{}\n", paragraph)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    // Soft breaks render as <br />, matching "breaks" mode renderers.
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_start_label_becomes_h2() {
        let html = normalize("Summary: details here");
        assert!(html.contains("<h2>Summary details here</h2>"), "{}", html);
        assert!(!html.contains("<h3>"));
    }

    #[test]
    fn test_second_pass_skips_promoted_lines() {
        let once = promote_sections("Overview: text\nDetails: more");
        assert_eq!(once, "## Overview text\n## Details more");
        assert_eq!(promote_labels(&once), once);
    }

    #[test]
    fn test_second_pass_digit_guard() {
        assert_eq!(promote_labels("Note: see below"), "### Note see below");
        assert_eq!(promote_labels("Time:10"), "Time:10");
    }

    #[test]
    fn test_label_with_digits_is_not_promoted() {
        let html = normalize("Step 1:2 is the ratio");
        assert!(!html.contains("<h2>"));
        assert!(!html.contains("<h3>"));
        assert!(html.contains("<p>Step 1:2 is the ratio</p>"), "{}", html);
    }

    #[test]
    fn test_bullet_glyphs() {
        let html = normalize("• first point\n● second point\n○   third point");
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>first point</li>"), "{}", html);
        assert!(html.contains("<li>second point</li>"));
        assert!(html.contains("<li>third point</li>"));
    }

    #[test]
    fn test_crlf_and_soft_breaks() {
        let html = normalize("first line\r\nsecond line");
        assert!(!html.contains('\r'));
        assert!(html.contains("first line<br />"), "{}", html);
        assert!(html.contains("second line"));
    }

    #[test]
    fn test_paragraph_segmentation() {
        assert_eq!(
            segment_paragraphs("one\n\n\n\n## two\n\n* three"),
            "one\n\n\n## two\n\n* three"
        );

        let html = normalize("alpha beta\n\n\n\ngamma delta");
        assert_eq!(html.matches("<p>").count(), 2, "{}", html);
    }

    #[test]
    fn test_existing_markdown_passes_through() {
        let html = normalize("## Already a heading\n\n- dash item\n\n**bold** text");
        assert!(html.contains("<h2>Already a heading</h2>"));
        assert!(html.contains("<li>dash item</li>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(!html.contains("<h3>"));
    }

    #[test]
    fn test_malformed_input_degrades() {
        assert_eq!(normalize(""), "");
        let html = normalize(":::\n\n\n**unclosed");
        assert!(html.contains("**unclosed"));
    }

    #[tokio::test]
    async fn test_normalize_pending() {
        let html = normalize_pending(async { "• resolved later".to_string() }).await;
        assert!(html.contains("<li>resolved later</li>"));
    }
}
