//! Primary media of a post: an image grid, an embedded video, or an embedded
//! live room. At most one of them is shown.

use super::{icons, Stat};
use crate::payload::dynamic::{Archive, LivePlayInfo, Major};
use crate::payload::Count;
use crate::Result;
use askama::Template;
use log::warn;

/// Thumbnails beyond this count are dropped from a grid
pub const MAX_GRID_IMAGES: usize = 9;

/// Column count of an image grid: 1 → 1, 2 or 4 → 2, anything else → 3.
pub fn grid_columns(images: usize) -> usize {
    match images {
        0 | 1 => 1,
        2 | 4 => 2,
        _ => 3,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoEmbed {
    pub cover: String,
    pub title: String,
    pub duration: String,
    pub play: String,
    pub danmaku: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveEmbed {
    pub cover: String,
    pub title: String,
    pub is_live: bool,
    pub area: String,
    pub watched: String,
}

/// The resolved media union of one post
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Media {
    #[default]
    None,
    Images(Vec<String>),
    Video(VideoEmbed),
    Live(LiveEmbed),
}

fn count_text(candidates: &[Option<&Count>]) -> String {
    candidates
        .iter()
        .flatten()
        .next()
        .map(|c| c.display())
        .unwrap_or_default()
}

impl Media {
    /// Resolve the media of a post. Images win over an embedded video, which
    /// wins over a live recommendation. `live_rcmd_allowed` is set only for
    /// live-recommendation posts.
    pub fn resolve(major: Option<&Major>, live_rcmd_allowed: bool) -> Self {
        let major = match major {
            Some(m) => m,
            None => return Media::None,
        };
        if let Some(draw) = major.draw.as_ref().filter(|d| !d.items.is_empty()) {
            return Media::Images(draw.items.iter().map(|i| i.src.clone()).collect());
        }
        if let Some(opus) = major.opus.as_ref().filter(|o| !o.pics.is_empty()) {
            return Media::Images(opus.pics.iter().map(|p| p.url.clone()).collect());
        }
        if let Some(archive) = &major.archive {
            return Media::Video(Self::video(archive));
        }
        if live_rcmd_allowed {
            if let Some(info) = major
                .live_rcmd
                .as_ref()
                .and_then(|l| l.content.as_deref())
                .and_then(parse_live_rcmd)
            {
                return Media::Live(Self::live(&info));
            }
        }
        Media::None
    }

    fn video(archive: &Archive) -> VideoEmbed {
        VideoEmbed {
            cover: archive.cover.clone().unwrap_or_default(),
            title: archive.title.clone().unwrap_or_default(),
            duration: archive.duration_text.clone().unwrap_or_default(),
            play: count_text(&[archive.stat.play.as_ref(), archive.stat.view.as_ref()]),
            danmaku: count_text(&[archive.stat.danmaku.as_ref()]),
        }
    }

    fn live(info: &LivePlayInfo) -> LiveEmbed {
        let watched = info
            .watched_show
            .as_ref()
            .and_then(|w| w.text_large.clone())
            .unwrap_or_default();
        LiveEmbed {
            cover: info.cover.clone().unwrap_or_default(),
            title: info.title.clone().unwrap_or_default(),
            is_live: info.live_status == Some(1),
            area: format!(
                "{} · {}",
                info.parent_area_name.as_deref().unwrap_or(""),
                info.area_name.as_deref().unwrap_or("")
            ),
            watched,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Media::None)
    }
}

/// `live_rcmd.content` is a JSON document embedded as a string.
fn parse_live_rcmd(raw: &str) -> Option<LivePlayInfo> {
    match serde_json::from_str::<crate::payload::dynamic::LiveRcmdContent>(raw) {
        Ok(content) => content.live_play_info,
        Err(e) => {
            warn!("Failed to parse live recommendation content: {}", e);
            None
        }
    }
}

#[derive(Template)]
#[template(path = "media/single.html")]
struct SingleImage<'a> {
    class: &'static str,
    src: &'a str,
}

#[derive(Template)]
#[template(path = "media/grid.html")]
struct ImageGrid<'a> {
    columns: usize,
    images: &'a [String],
}

#[derive(Template)]
#[template(path = "media/video.html")]
struct VideoCardInline<'a> {
    video: &'a VideoEmbed,
    stats: Vec<Stat>,
}

#[derive(Template)]
#[template(path = "media/live.html")]
struct LiveCardInline<'a> {
    live: &'a LiveEmbed,
    is_live: bool,
}

/// Markup for resolved media. `nested` selects the compact variant used
/// inside a reposted original.
pub fn render_media(media: &Media, nested: bool) -> Result<String> {
    let html = match media {
        Media::None => String::new(),
        Media::Images(images) if images.len() == 1 => SingleImage {
            class: if nested { "single-image" } else { "dynamic-image" },
            src: &images[0],
        }
        .render()?,
        Media::Images(images) => {
            let shown = &images[..images.len().min(MAX_GRID_IMAGES)];
            ImageGrid {
                columns: grid_columns(shown.len()),
                images: shown,
            }
            .render()?
        }
        Media::Video(video) => {
            let mut stats = Vec::new();
            if !video.play.is_empty() {
                stats.push(Stat::new(icons::VIEW, video.play.as_str()));
            }
            if !video.danmaku.is_empty() {
                stats.push(Stat::new(icons::COMMENT, video.danmaku.as_str()));
            }
            VideoCardInline { video, stats }.render()?
        }
        Media::Live(live) => LiveCardInline {
            live,
            is_live: live.is_live,
        }
        .render()?,
    };
    Ok(html)
}
