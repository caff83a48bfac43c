//! Content renderers: one pure function per content type turning a payload
//! into an HTML fragment. Renderers never touch a surface or the clock; the
//! reference "now" is passed in for relative publish times.
//!
//! Markup lives in askama templates under `templates/`, which escape every
//! interpolated value. Only fragments produced here (rich text, nested cards,
//! icons) are passed through unescaped.

mod article;
mod bangumi;
mod dynamic;
mod help;
pub(crate) mod icons;
mod live;
mod media;
mod richtext;
mod subscription;
mod user;
mod video;
mod vote;

pub use help::{render_help_card, HelpKind};
pub use media::{grid_columns, render_media, LiveEmbed, Media, VideoEmbed, MAX_GRID_IMAGES};
pub use richtext::{render_rich_text, render_rich_text_truncated};
pub use subscription::render_subscription_list;
pub use vote::{render_vote, Vote, VoteOption};

use crate::config::DisplayOptions;
use crate::payload::ContentType;
use crate::{Error, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;

/// Avatar shown when a payload has none
pub(crate) const NO_FACE: &str = "https://i0.hdslb.com/bfs/face/member/noface.jpg";

/// Render the content fragment for `kind`.
pub fn render_content(
    kind: ContentType,
    payload: &Value,
    display: &DisplayOptions,
    now: &DateTime<Tz>,
) -> Result<String> {
    match kind {
        ContentType::Video => video::render(payload, now),
        ContentType::Article => article::render(payload, now),
        ContentType::Bangumi => bangumi::render(payload),
        ContentType::Live => live::render(payload),
        ContentType::Dynamic => dynamic::render(payload, now),
        ContentType::User => user::render(payload, display),
    }
}

/// A required text field; empty strings count as missing.
pub(crate) fn required<'a>(
    content: ContentType,
    field: &'static str,
    value: &'a Option<String>,
) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or(Error::MissingField { content, field })
}

pub(crate) fn face_or_default(face: &Option<String>) -> &str {
    non_empty(face).unwrap_or(NO_FACE)
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// One icon-and-text entry of a stats row
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Stat {
    pub icon: &'static str,
    pub text: String,
}

impl Stat {
    pub(crate) fn new(icon: &'static str, text: impl Into<String>) -> Self {
        Self {
            icon,
            text: text.into(),
        }
    }
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
    fn every_type_dispatches() {
        let payloads = [
            (ContentType::Video, json!({"title": "T"})),
            (ContentType::Article, json!({"title": "T"})),
            (ContentType::Bangumi, json!({"title": "T"})),
            (ContentType::Live, json!({"room_info": {"title": "T"}})),
            (ContentType::Dynamic, json!({})),
            (ContentType::User, json!({})),
        ];
        for (kind, payload) in payloads {
            let html = render_content(kind, &payload, &DisplayOptions::default(), &now());
            assert!(html.is_ok(), "{kind}: {:?}", html);
        }
    }

    #[test]
    fn missing_titles_are_content_errors() {
        for kind in [
            ContentType::Video,
            ContentType::Article,
            ContentType::Bangumi,
            ContentType::Live,
        ] {
            let err = render_content(kind, &json!({"title": "  "}), &DisplayOptions::default(), &now())
                .unwrap_err();
            assert!(err.is_content_error(), "{kind}: {err}");
            assert!(matches!(err, Error::MissingField { content, .. } if content == kind));
        }
    }

    #[test]
    fn malformed_shapes_are_content_errors() {
        let err = render_content(
            ContentType::Video,
            &json!("not an object"),
            &DisplayOptions::default(),
            &now(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::ContentRender(_)));
    }

    #[test]
    fn null_sub_objects_degrade_gracefully() {
        let payloads = [
            (ContentType::Video, json!({"title": "T", "owner": null, "stat": null, "view": null})),
            (ContentType::Article, json!({"title": "T", "stats": null, "focus": null})),
            (
                ContentType::Bangumi,
                json!({"title": "T", "publish": null, "new_ep": null, "stat": null, "areas": null, "styles": null}),
            ),
            (
                ContentType::Live,
                json!({"room_info": {"title": "T", "live_status": "1"}, "anchor_info": null, "watched_show": null}),
            ),
            (
                ContentType::Dynamic,
                json!({"item": {"modules": {
                    "module_author": null,
                    "module_dynamic": {"desc": {"text": "hi", "rich_text_nodes": null}},
                    "module_stat": null,
                    "module_interaction": null
                }, "author": {"level": "6"}}}),
            ),
            (
                ContentType::User,
                json!({"name": "U", "pendant": null, "level": "6", "vip": {"label": null}}),
            ),
        ];
        for (kind, payload) in payloads {
            let html = render_content(kind, &payload, &DisplayOptions::default(), &now());
            assert!(html.is_ok(), "{kind}: {:?}", html);
        }

        let user = render_content(
            ContentType::User,
            &json!({"name": "U", "level": "6"}),
            &DisplayOptions::default(),
            &now(),
        )
        .unwrap();
        assert!(user.contains("Lv6"));

        let dynamic = render_content(
            ContentType::Dynamic,
            &json!({"modules": {"module_dynamic": {"desc": {"text": "hi", "rich_text_nodes": null}}}}),
            &DisplayOptions::default(),
            &now(),
        )
        .unwrap();
        assert!(dynamic.contains("hi"));
    }
}
