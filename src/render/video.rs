use super::{face_or_default, icons, non_empty, required, Stat};
use crate::format::{escape_multiline, format_duration};
use crate::payload::{self, first_count, ContentType, VideoPayload};
use crate::Result;
use askama::Template;
use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;

#[derive(Template)]
#[template(path = "cards/video.html")]
struct VideoCard<'a> {
    cover: Option<&'a str>,
    face: &'a str,
    author: &'a str,
    sub: String,
    title: &'a str,
    stats: Vec<Stat>,
    desc: String,
}

pub(super) fn render(payload: &Value, now: &DateTime<Tz>) -> Result<String> {
    let info: VideoPayload = payload::parse(ContentType::Video, payload)?;
    let title = required(ContentType::Video, "title", &info.title)?;

    let mut sub = info
        .pubdate
        .as_ref()
        .map(|t| t.display(now))
        .unwrap_or_default();
    let duration = info
        .duration
        .as_ref()
        .and_then(|d| d.value())
        .map(format_duration)
        .unwrap_or_default();
    if !duration.is_empty() {
        sub.push_str(&format!(" • 时长: {}", duration));
    }

    let views = first_count(&[
        info.view.as_ref().and_then(|v| v.count.as_ref()),
        info.stat.view.as_ref(),
    ]);
    let likes = first_count(&[info.like.as_ref(), info.stat.like.as_ref()]);
    let replies = first_count(&[info.reply.as_ref(), info.stat.reply.as_ref()]);

    let card = VideoCard {
        cover: non_empty(&info.pic),
        face: face_or_default(&info.owner.face),
        author: info.owner.name.as_deref().unwrap_or("Unknown"),
        sub,
        title,
        stats: vec![
            Stat::new(icons::VIEW, views),
            Stat::new(icons::LIKE, likes),
            Stat::new(icons::COMMENT, replies),
        ],
        desc: escape_multiline(info.desc.as_deref().unwrap_or("")),
    };
    Ok(card.render()?)
}
