use super::{face_or_default, icons, non_empty, required, Stat};
use crate::payload::{self, ContentType, LivePayload};
use crate::Result;
use askama::Template;
use serde_json::Value;

#[derive(Template)]
#[template(path = "cards/live.html")]
struct LiveCard<'a> {
    cover: Option<&'a str>,
    face: &'a str,
    author: &'a str,
    is_live: bool,
    room_id: String,
    title: &'a str,
    stats: Vec<Stat>,
}

pub(super) fn render(payload: &Value) -> Result<String> {
    let info: LivePayload = payload::parse(ContentType::Live, payload)?;
    let room = &info.room_info;
    let title = required(ContentType::Live, "title", &room.title)?;
    let anchor = &info.anchor_info.base_info;

    let watched = info
        .watched_show
        .text_large
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| info.watched_show.num.as_ref().map(|n| n.raw()))
        .unwrap_or_else(|| "0".to_string());
    let area = format!(
        "{} · {}",
        room.parent_area_name.as_deref().unwrap_or(""),
        room.area_name.as_deref().unwrap_or("")
    );

    let card = LiveCard {
        cover: non_empty(&room.cover),
        face: face_or_default(&anchor.face),
        author: anchor.uname.as_deref().unwrap_or("Unknown"),
        is_live: room.live_status == Some(1),
        room_id: room.room_id.as_ref().map(|r| r.raw()).unwrap_or_default(),
        title,
        stats: vec![Stat::new(icons::FIRE, watched), Stat::new(icons::STAR, area)],
    };
    Ok(card.render()?)
}
