//! Rich-text token rendering.
//!
//! Upstream text arrives as a sequence of typed tokens. Literal text is
//! always escaped; typed tokens get a styled wrapper around their escaped
//! text. Both the long (`RICH_TEXT_NODE_TYPE_AT`) and short (`at`) type
//! names are understood.

use crate::format::{escape_html, escape_multiline};
use crate::payload::dynamic::RichTextNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Emoji,
    Mention,
    Topic,
    Vote,
    Link,
    Text,
}

impl TokenKind {
    fn of(raw: &str) -> Self {
        let name = raw.strip_prefix("RICH_TEXT_NODE_TYPE_").unwrap_or(raw);
        match name.to_ascii_lowercase().as_str() {
            "emoji" => TokenKind::Emoji,
            "at" => TokenKind::Mention,
            "topic" => TokenKind::Topic,
            "vote" => TokenKind::Vote,
            "url" | "bv" | "web" | "link" => TokenKind::Link,
            _ => TokenKind::Text,
        }
    }
}

fn render_node(node: &RichTextNode, text: &str) -> String {
    match TokenKind::of(&node.kind) {
        TokenKind::Emoji => match node.emoji.as_ref().and_then(|e| e.icon_url.as_deref()) {
            Some(icon) if !icon.is_empty() => format!(
                r#"<img class="emoji" src="{}" alt="{}" />"#,
                escape_html(icon),
                escape_html(text)
            ),
            _ => escape_html(text),
        },
        TokenKind::Mention => format!(r#"<span class="at-user">{}</span>"#, escape_html(text)),
        TokenKind::Topic => format!(r#"<span class="topic-tag">{}</span>"#, escape_html(text)),
        TokenKind::Vote => format!(r#"<span class="vote-inline">{}</span>"#, escape_html(text)),
        TokenKind::Link => format!(r#"<span class="link">{}</span>"#, escape_html(text)),
        TokenKind::Text => escape_multiline(text),
    }
}

/// Render tokens in order; with no tokens, the escaped `fallback` text.
pub fn render_rich_text(nodes: &[RichTextNode], fallback: &str) -> String {
    if nodes.is_empty() {
        return escape_multiline(fallback);
    }
    nodes.iter().map(|n| render_node(n, &n.text)).collect()
}

/// Like [`render_rich_text`] but stops after `max_chars` characters of token
/// text, appending `…` when anything was cut. Emoji count as one character.
pub fn render_rich_text_truncated(nodes: &[RichTextNode], fallback: &str, max_chars: usize) -> String {
    if nodes.is_empty() {
        return escape_multiline(&crate::format::truncate_chars(fallback, max_chars));
    }

    let mut out = String::new();
    let mut budget = max_chars;
    for node in nodes {
        let is_emoji = TokenKind::of(&node.kind) == TokenKind::Emoji;
        let len = if is_emoji { 1 } else { node.text.chars().count() };
        if len <= budget {
            out.push_str(&render_node(node, &node.text));
            budget -= len;
            continue;
        }
        if budget > 0 && !is_emoji {
            let cut: String = node.text.chars().take(budget).collect();
            out.push_str(&render_node(node, &cut));
        }
        out.push('…');
        break;
    }
    out
}
