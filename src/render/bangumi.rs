use super::{icons, non_empty, required, Stat};
use crate::format::escape_multiline;
use crate::payload::{self, first_count, BangumiPayload, ContentType};
use crate::Result;
use askama::Template;
use chrono::{Datelike, NaiveDateTime};
use serde_json::Value;

const WEEKDAYS: [&str; 7] = ["日", "一", "二", "三", "四", "五", "六"];

/// Movies and documentaries have no episode progress
fn is_movie_or_doc(info: &BangumiPayload) -> bool {
    matches!(info.season_type, Some(2) | Some(3))
        || info.styles.iter().any(|s| s == "电影" || s == "纪录片")
        || info
            .type_desc
            .as_deref()
            .is_some_and(|d| d.contains("电影") || d.contains("纪录"))
}

/// Leading integer of an episode label such as `12` or `12.5`
fn leading_number(label: &str) -> Option<u64> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// `每周五 22:00更新` from a `YYYY-MM-DD HH:MM:SS` airing time
fn weekly_schedule(pub_time: &str) -> Option<String> {
    let at = NaiveDateTime::parse_from_str(pub_time.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let weekday = WEEKDAYS[at.weekday().num_days_from_sunday() as usize];
    Some(format!("每周{} {}更新", weekday, at.format("%H:%M")))
}

#[derive(Template)]
#[template(path = "cards/bangumi.html")]
struct BangumiCard<'a> {
    cover: Option<&'a str>,
    title: &'a str,
    status: String,
    /// Areas and styles, e.g. `日本 热血/奇幻`
    meta: String,
    stats: Vec<Stat>,
    desc: String,
}

pub(crate) fn status_line(info: &BangumiPayload) -> String {
    let release = info
        .publish
        .release_date_show
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("未知");
    let movie_like = is_movie_or_doc(info);
    if movie_like {
        return format!("{}开播", release);
    }

    if info.publish.is_finish == Some(1) {
        let episodes = info
            .new_ep
            .desc
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        return format!("{}开播 {}", release, episodes).trim_end().to_string();
    }

    let mut parts = vec![format!("{}开播", release), "连载中".to_string()];
    let latest = info
        .new_ep
        .title
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(info.new_ep.index_show.as_deref());
    if let Some(n) = latest.and_then(leading_number) {
        parts.push(format!("更新至第{}集", n));
    }
    if let Some(schedule) = info.publish.pub_time.as_deref().and_then(weekly_schedule) {
        parts.push(schedule);
    }
    parts.join(" ")
}

pub(super) fn render(payload: &Value) -> Result<String> {
    let info: BangumiPayload = payload::parse(ContentType::Bangumi, payload)?;
    let title = required(ContentType::Bangumi, "title", &info.title)?;

    let areas: Vec<&str> = info.areas.iter().filter_map(|a| a.name.as_deref()).collect();
    let meta = [areas.join("/"), info.styles.join("/")]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let score = info
        .rating
        .as_ref()
        .and_then(|r| r.score)
        .filter(|s| *s > 0.0)
        .map(|s| s.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let card = BangumiCard {
        cover: non_empty(&info.cover),
        title,
        status: status_line(&info),
        meta,
        stats: vec![
            Stat::new(icons::VIEW, first_count(&[info.stat.views.as_ref()])),
            Stat::new(icons::HEART, first_count(&[info.stat.follow.as_ref()])),
            Stat::new(icons::COMMENT, first_count(&[info.stat.danmakus.as_ref()])),
            Stat::new(icons::STAR, format!("{}分", score)),
        ],
        desc: escape_multiline(info.desc.as_deref().unwrap_or("")),
    };
    Ok(card.render()?)
}
