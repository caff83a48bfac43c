use super::{face_or_default, icons, non_empty, required, Stat};
use crate::format::escape_multiline;
use crate::payload::{self, first_count, ArticlePayload, ContentType};
use crate::Result;
use askama::Template;
use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;

#[derive(Template)]
#[template(path = "cards/article.html")]
struct ArticleCard<'a> {
    face: &'a str,
    author: &'a str,
    sub: String,
    title: &'a str,
    /// Pre-sanitized upstream body
    html_body: Option<&'a str>,
    summary: String,
    stats: Vec<Stat>,
}

pub(super) fn render(payload: &Value, now: &DateTime<Tz>) -> Result<String> {
    let info: ArticlePayload = payload::parse(ContentType::Article, payload)?;
    let title = required(ContentType::Article, "title", &info.title)?;

    let card = ArticleCard {
        face: face_or_default(&info.author_face),
        author: info.author_name.as_deref().unwrap_or("Unknown"),
        sub: info
            .publish_time
            .as_ref()
            .map(|t| t.display(now))
            .unwrap_or_default(),
        title,
        html_body: non_empty(&info.html_content),
        summary: escape_multiline(info.summary.as_deref().unwrap_or("")),
        stats: vec![
            Stat::new(icons::SHARE, first_count(&[info.stats.share.as_ref()])),
            Stat::new(icons::LIKE, first_count(&[info.stats.like.as_ref()])),
            Stat::new(icons::COMMENT, first_count(&[info.stats.reply.as_ref()])),
        ],
    };
    Ok(card.render()?)
}
