use super::media::{Media, VideoEmbed};
use super::face_or_default;
use crate::config::DisplayOptions;
use crate::format::{escape_multiline, format_number};
use crate::payload::dynamic::DynamicItem;
use crate::payload::{self, ContentType, Count, UserPayload};
use crate::Result;
use askama::Template;
use serde_json::Value;

const RECENT_THUMBNAILS: usize = 3;

#[derive(Template)]
#[template(path = "cards/recent_dynamic.html")]
struct RecentDynamic {
    text: String,
    thumbs: Vec<String>,
    video: Option<VideoEmbed>,
}

struct MedalBadge<'a> {
    name: &'a str,
    level: u32,
}

struct ProfileStat {
    value: String,
    label: &'static str,
}

#[derive(Template)]
#[template(path = "cards/user.html")]
struct UserCard<'a> {
    face: &'a str,
    pendant: Option<&'a str>,
    name: &'a str,
    level: u32,
    vip_label: Option<String>,
    uid: Option<String>,
    medal: Option<MedalBadge<'a>>,
    sign: Option<&'a str>,
    stats: Vec<ProfileStat>,
    recent: Option<String>,
}

fn count_value(count: Option<&Count>) -> String {
    format_number(count.and_then(Count::value).unwrap_or(0))
}

/// Excerpt of the user's latest post: text plus up to three thumbnails or a
/// video row.
fn recent_dynamic(item: &DynamicItem) -> Result<String> {
    let dynamic = &item.modules.module_dynamic;
    let major = dynamic.major.as_ref();

    let mut text = dynamic
        .desc
        .as_ref()
        .and_then(|d| d.text.clone())
        .unwrap_or_default();
    if text.is_empty() {
        if let Some(summary) = major.and_then(|m| m.opus.as_ref()).and_then(|o| o.summary.as_ref()) {
            text = summary
                .text
                .clone()
                .unwrap_or_else(|| summary.rich_text_nodes.iter().map(|n| n.text.as_str()).collect());
        }
    }

    let mut recent = RecentDynamic {
        text: String::new(),
        thumbs: Vec::new(),
        video: None,
    };
    match Media::resolve(major, false) {
        Media::Images(images) => {
            recent.thumbs = images.into_iter().take(RECENT_THUMBNAILS).collect();
        }
        Media::Video(video) => {
            if text.is_empty() {
                if let Some(desc) = major.and_then(|m| m.archive.as_ref()).and_then(|a| a.desc.clone()) {
                    text = desc;
                }
            }
            recent.video = Some(video);
        }
        _ => {}
    }
    recent.text = escape_multiline(&text);
    Ok(recent.render()?)
}

pub(super) fn render(payload: &Value, display: &DisplayOptions) -> Result<String> {
    let info: UserPayload = payload::parse(ContentType::User, payload)?;

    let is_vip = info.vip.as_ref().is_some_and(|v| v.status == Some(1));
    let vip_label = info
        .vip
        .as_ref()
        .and_then(|v| v.label.text.clone())
        .filter(|s| !s.is_empty())
        .or_else(|| is_vip.then(|| "大会员".to_string()));
    let medal = info
        .fans_medal
        .as_ref()
        .and_then(|m| m.medal.as_ref())
        .and_then(|m| {
            let name = m.medal_name.as_deref().filter(|n| !n.is_empty())?;
            Some(MedalBadge {
                name,
                level: m.level.unwrap_or(0),
            })
        });
    let relation = info.relation.clone().unwrap_or_default();
    let recent = info.dynamic.as_deref().map(recent_dynamic).transpose()?;

    let card = UserCard {
        face: face_or_default(&info.face),
        pendant: info.pendant.image.as_deref().filter(|s| !s.is_empty()),
        name: info.name.as_deref().unwrap_or("Unknown"),
        level: info.level.unwrap_or(0),
        vip_label,
        uid: if display.show_id {
            info.user_id().map(|id| id.raw())
        } else {
            None
        },
        medal,
        sign: info.sign.as_deref().filter(|s| !s.is_empty()),
        stats: vec![
            ProfileStat {
                value: count_value(relation.follower.as_ref()),
                label: "粉丝",
            },
            ProfileStat {
                value: count_value(relation.following.as_ref()),
                label: "关注",
            },
            ProfileStat {
                value: count_value(info.likes.as_ref()),
                label: "获赞",
            },
            ProfileStat {
                value: count_value(info.archive_view.as_ref()),
                label: "播放",
            },
        ],
        recent,
    };
    Ok(card.render()?)
}
