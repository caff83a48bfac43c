//! Feed post (dynamic) cards, including reposts and their nested original.

use super::media::{render_media, Media};
use super::richtext::{render_rich_text, render_rich_text_truncated};
use super::vote::{render_vote, Vote};
use super::{face_or_default, icons, Stat};
use crate::payload::dynamic::{DynamicItem, DynamicPayload, RichTextNode};
use crate::payload::{self, ContentType, Count};
use crate::theme::HexColor;
use crate::Result;
use askama::Template;
use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;

/// Text budget of a reposted original
const NESTED_TEXT_CHARS: usize = 160;

/// Serial number color when the fan card has none, or an invalid one
const SERIAL_COLOR: HexColor = HexColor::rgb(0x55, 0x55, 0x55);

/// The resolved body of one post
struct PostBody {
    title: Option<String>,
    text_html: String,
    media: Media,
    vote: Option<Vote>,
}

#[derive(Template)]
#[template(path = "cards/post_body.html")]
struct PostBodyView<'a> {
    title_class: &'static str,
    text_class: &'static str,
    title: Option<&'a str>,
    text_html: &'a str,
    vote_html: Option<String>,
}

#[derive(Template)]
#[template(path = "cards/dynamic_orig.html")]
struct OriginalCard<'a> {
    face: &'a str,
    author: &'a str,
    body: String,
    media: String,
}

struct Decoration<'a> {
    url: &'a str,
    serial: Option<String>,
    color: HexColor,
}

#[derive(Template)]
#[template(path = "cards/dynamic.html")]
struct DynamicCard<'a> {
    avatar_class: &'static str,
    face: &'a str,
    pendant: Option<&'a str>,
    author: &'a str,
    level: u32,
    pub_time: String,
    decoration: Option<Decoration<'a>>,
    body: String,
    orig: String,
    media: String,
    actions: Vec<Stat>,
}

impl PostBody {
    fn resolve(item: &DynamicItem, text_limit: Option<usize>) -> Self {
        let dynamic = &item.modules.module_dynamic;
        let opus = dynamic.major.as_ref().and_then(|m| m.opus.as_ref());

        let (mut text, nodes, title): (String, &[RichTextNode], Option<String>) =
            if let Some(desc) = &dynamic.desc {
                (desc.text.clone().unwrap_or_default(), desc.rich_text_nodes.as_slice(), None)
            } else if let Some(opus) = opus {
                let title = opus.title.clone().filter(|t| !t.is_empty());
                match &opus.summary {
                    Some(s) => (s.text.clone().unwrap_or_default(), s.rich_text_nodes.as_slice(), title),
                    None => (String::new(), &[][..], title),
                }
            } else {
                (String::new(), &[][..], None)
            };

        let media = Media::resolve(dynamic.major.as_ref(), item.is_live_recommendation());
        if text.is_empty() && nodes.is_empty() {
            if let Some(desc) = dynamic
                .major
                .as_ref()
                .and_then(|m| m.archive.as_ref())
                .and_then(|a| a.desc.clone())
            {
                text = desc;
            }
        }

        let text_html = match text_limit {
            Some(limit) => render_rich_text_truncated(nodes, &text, limit),
            None => render_rich_text(nodes, &text),
        };

        Self {
            title,
            text_html,
            media,
            vote: Vote::from_modules(&item.modules),
        }
    }

    fn render(&self, nested: bool) -> Result<String> {
        let (title_class, text_class) = if nested {
            ("orig-title", "orig-text truncated")
        } else {
            ("title", "text-content truncated")
        };
        let view = PostBodyView {
            title_class,
            text_class,
            title: self.title.as_deref(),
            text_html: &self.text_html,
            vote_html: self.vote.as_ref().map(render_vote).transpose()?,
        };
        Ok(view.render()?)
    }
}

/// Nested original of a repost, one level deep
fn render_original(orig: &DynamicPayload) -> Result<String> {
    let item = orig.item();
    let author = &item.modules.module_author;
    let body = PostBody::resolve(item, Some(NESTED_TEXT_CHARS));
    let card = OriginalCard {
        face: face_or_default(&author.face),
        author: author.name.as_deref().unwrap_or("Unknown"),
        body: body.render(true)?,
        media: render_media(&body.media, true)?,
    };
    Ok(card.render()?)
}

fn stat(count: Option<&Count>) -> String {
    count.map(|c| c.display()).unwrap_or_else(|| "0".to_string())
}

/// Serial badge color: only well-formed `#RRGGBB` values reach the style
/// attribute.
fn serial_color(raw: Option<&str>) -> HexColor {
    raw.and_then(|c| HexColor::parse(c.trim())).unwrap_or(SERIAL_COLOR)
}

pub(super) fn render(payload: &Value, now: &DateTime<Tz>) -> Result<String> {
    let parsed: DynamicPayload = payload::parse(ContentType::Dynamic, payload)?;
    let item = parsed.item();
    let modules = &item.modules;
    let author = &modules.module_author;
    let extras = parsed.author_extras().cloned().unwrap_or_default();
    let decoration = author.decoration_card.clone().unwrap_or_default();
    let fan = decoration.fan.clone().unwrap_or_default();

    let pub_time = parsed
        .pub_ts
        .as_ref()
        .or(author.pub_ts.as_ref())
        .map(|t| t.display(now))
        .filter(|s| !s.is_empty())
        .or_else(|| author.pub_time.clone())
        .unwrap_or_default();

    let pendant = extras
        .pendant_url
        .as_deref()
        .or_else(|| author.pendant.as_ref().and_then(|p| p.image.as_deref()))
        .filter(|s| !s.is_empty());
    let card_url = extras
        .card_url
        .as_deref()
        .or(decoration.card_url.as_deref())
        .filter(|s| !s.is_empty());
    let serial = fan
        .num_desc
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| extras.card_number.as_ref().map(|n| n.raw()));
    let color = serial_color(extras.fan_color.as_deref().or(fan.color.as_deref()));

    let body = PostBody::resolve(item, None);
    let orig = match item.orig.as_deref() {
        Some(orig) => render_original(orig)?,
        None => String::new(),
    };
    let stats = &modules.module_stat;

    let card = DynamicCard {
        avatar_class: if pendant.is_some() { "no-border" } else { "no-frame" },
        face: face_or_default(&author.face),
        pendant,
        author: author.name.as_deref().unwrap_or("Unknown"),
        level: extras.level.unwrap_or(0),
        pub_time,
        decoration: card_url.map(|url| Decoration { url, serial, color }),
        body: body.render(false)?,
        orig,
        media: render_media(&body.media, false)?,
        actions: vec![
            Stat::new(icons::SHARE, stat(stats.forward.as_ref().and_then(|s| s.count.as_ref()))),
            Stat::new(icons::COMMENT, stat(stats.comment.as_ref().and_then(|s| s.count.as_ref()))),
            Stat::new(icons::LIKE, stat(stats.like.as_ref().and_then(|s| s.count.as_ref()))),
        ],
    };
    Ok(card.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Shanghai;
    use serde_json::json;

    fn now() -> DateTime<Tz> {
        Shanghai.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn plain_text_post() {
        let html = render(
            &json!({"item": {"modules": {
                "module_author": {"name": "A", "pub_time": "05-01"},
                "module_dynamic": {"desc": {"text": "hi", "rich_text_nodes": [
                    {"type": "RICH_TEXT_NODE_TYPE_TEXT", "text": "hi "},
                    {"type": "RICH_TEXT_NODE_TYPE_AT", "text": "@B"}
                ]}},
                "module_stat": {"like": {"count": 15000}}
            }}}),
            &now(),
        )
        .unwrap();
        assert!(html.contains(r#"hi <span class="at-user">@B</span>"#));
        assert!(html.contains("05-01"));
        assert!(html.contains("1.5万"));
        assert!(!html.contains("orig-card"));
    }

    #[test]
    fn repost_truncates_original_text() {
        let long = "字".repeat(200);
        let html = render(
            &json!({"item": {
                "modules": {"module_dynamic": {"desc": {"text": "转发"}}},
                "orig": {"modules": {
                    "module_author": {"name": "O"},
                    "module_dynamic": {"desc": {"text": long}}
                }}
            }}),
            &now(),
        )
        .unwrap();
        let expected = format!("{}…", "字".repeat(NESTED_TEXT_CHARS));
        assert!(html.contains("orig-card"));
        assert!(html.contains(&expected));
        assert!(!html.contains(&"字".repeat(NESTED_TEXT_CHARS + 1)));
    }

    #[test]
    fn opus_title_and_images_with_vote() {
        let html = render(
            &json!({"item": {"modules": {
                "module_dynamic": {"major": {
                    "opus": {"title": "Opus", "summary": {"text": "s"}, "pics": [{"url": "1"}, {"url": "2"}, {"url": "3"}, {"url": "4"}]},
                    "vote": {"desc": "Q", "items": [{"desc": "a", "cnt": 1}]}
                }}
            }}}),
            &now(),
        )
        .unwrap();
        assert!(html.contains(r#"<div class="title">Opus</div>"#));
        assert!(html.contains("repeat(2, 1fr)"));
        assert!(html.contains("vote-card"));
    }

    #[test]
    fn archive_description_fills_empty_text() {
        let html = render(
            &json!({"modules": {"module_dynamic": {"major": {"archive": {"title": "V", "desc": "about"}}}}}),
            &now(),
        )
        .unwrap();
        assert!(html.contains("about"));
        assert!(html.contains("video-card-inline"));
    }

    #[test]
    fn decoration_card_serial() {
        let html = render(
            &json!({"item": {"modules": {"module_author": {
                "decoration_card": {"card_url": "https://d/c.png", "fan": {"num_desc": "000123", "color": "#ff0000"}}
            }}}}),
            &now(),
        )
        .unwrap();
        assert!(html.contains("No.000123"));
        assert!(html.contains("color:#ff0000"));
    }

    #[test]
    fn malformed_fan_color_falls_back() {
        let html = render(
            &json!({"item": {"modules": {"module_author": {
                "decoration_card": {"card_url": "https://d/c.png", "fan": {
                    "num_desc": "000123",
                    "color": "red;background:url(http://x)"
                }}
            }}}}),
            &now(),
        )
        .unwrap();
        assert!(html.contains("color:#555555"));
        assert!(!html.contains("url(http://x)"));
        assert!(!html.contains("background:"));

        assert_eq!(serial_color(Some(" #FB7299 ")).to_string(), "#fb7299");
        assert_eq!(serial_color(Some("#fff")), SERIAL_COLOR);
        assert_eq!(serial_color(None), SERIAL_COLOR);
    }
}
