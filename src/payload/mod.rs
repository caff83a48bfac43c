//! Render requests and the typed payload models each content renderer reads.
//!
//! Payloads arrive as loosely shaped JSON from upstream API clients. Every
//! model here is lenient: unknown fields are ignored and nearly everything is
//! optional, so a sparse payload still renders. Which fields are actually
//! required is decided by the renderers, not by deserialization.

pub mod dynamic;

use crate::config::DisplayOptions;
use crate::format::{format_number, format_pub_time, format_pub_time_text};
use crate::{Error, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use dynamic::{DynamicItem, DynamicPayload};

/// Kinds of content a preview card can be rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Article,
    Bangumi,
    Live,
    Dynamic,
    User,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Video,
        ContentType::Article,
        ContentType::Bangumi,
        ContentType::Live,
        ContentType::Dynamic,
        ContentType::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Article => "article",
            ContentType::Bangumi => "bangumi",
            ContentType::Live => "live",
            ContentType::Dynamic => "dynamic",
            ContentType::User => "user",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedContentType(s.to_string()))
    }
}

/// One card render call. Created per call and discarded afterwards.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub content_type: ContentType,
    /// The content object itself (the `data` member of an API response)
    pub payload: Value,
    /// Consumer (chat group) whose settings drive theme and badge visibility
    pub consumer: Option<String>,
    pub display: DisplayOptions,
}

impl RenderRequest {
    /// Build a request from a content type name. Unknown names are rejected.
    pub fn new(content_type: &str, payload: Value) -> Result<Self> {
        Ok(Self {
            content_type: content_type.parse()?,
            payload,
            consumer: None,
            display: DisplayOptions::default(),
        })
    }

    /// Build a request from a full API response, unwrapping a top-level
    /// `{"data": {...}}` envelope when present.
    pub fn from_api_response(content_type: &str, mut response: Value) -> Result<Self> {
        let payload = match response.get_mut("data") {
            Some(data) if data.is_object() => data.take(),
            _ => response,
        };
        Self::new(content_type, payload)
    }

    pub fn with_consumer(mut self, consumer: impl Into<String>) -> Self {
        self.consumer = Some(consumer.into());
        self
    }

    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }
}

/// Deserialize a payload into its typed model, mapping shape errors to
/// content-render errors.
pub(crate) fn parse<T: DeserializeOwned>(content: ContentType, payload: &Value) -> Result<T> {
    if !payload.is_object() {
        return Err(Error::ContentRender(format!(
            "{} payload must be a JSON object",
            content
        )));
    }
    T::deserialize(payload)
        .map_err(|e| Error::ContentRender(format!("malformed {} payload: {}", content, e)))
}

/// Field deserializer treating an explicit `null` like a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Field deserializer for optional scalars: a value of the wrong type becomes
/// `None`, and numbers sent as strings (`"6"`) are parsed.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match T::deserialize(&value) {
        Ok(parsed) => Some(parsed),
        Err(_) => value
            .as_str()
            .and_then(|s| serde_json::from_str(s.trim()).ok()),
    })
}

/// A publish time that upstream APIs send either as unix seconds or as text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Seconds(i64),
    Text(String),
}

impl Timestamp {
    pub fn display(&self, now: &DateTime<Tz>) -> String {
        match self {
            Timestamp::Seconds(secs) => format_pub_time(*secs, now),
            Timestamp::Text(text) => format_pub_time_text(text, now),
        }
    }
}

/// A count that may arrive as an integer, a float, or pre-formatted text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Count {
    pub fn value(&self) -> Option<u64> {
        match self {
            Count::Int(n) => Some(*n),
            Count::Float(f) if f.is_finite() && *f >= 0.0 => Some(*f as u64),
            Count::Float(_) => None,
            Count::Text(t) => t.trim().parse().ok(),
        }
    }

    /// Display form: numbers are compacted, text is passed through.
    pub fn display(&self) -> String {
        match self {
            Count::Text(t) => t.clone(),
            other => format_number(other.value().unwrap_or(0)),
        }
    }

    /// Raw display without compaction (ids, room numbers)
    pub fn raw(&self) -> String {
        match self {
            Count::Int(n) => n.to_string(),
            Count::Float(f) => f.to_string(),
            Count::Text(t) => t.clone(),
        }
    }
}

/// First present count among candidates, formatted; `0` when none.
pub(crate) fn first_count(candidates: &[Option<&Count>]) -> String {
    candidates
        .iter()
        .flatten()
        .next()
        .map(|c| c.display())
        .unwrap_or_else(|| "0".to_string())
}

/// Pre-extracted accent colors supplied by upstream clients
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FocusColors {
    pub cover: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Owner {
    pub mid: Option<Count>,
    pub name: Option<String>,
    pub face: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ViewCount {
    pub count: Option<Count>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoStat {
    pub view: Option<Count>,
    pub like: Option<Count>,
    pub reply: Option<Count>,
    pub danmaku: Option<Count>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoPayload {
    pub bvid: Option<String>,
    pub title: Option<String>,
    pub pic: Option<String>,
    pub desc: Option<String>,
    pub duration: Option<Count>,
    pub pubdate: Option<Timestamp>,
    #[serde(deserialize_with = "null_as_default")]
    pub owner: Owner,
    pub view: Option<ViewCount>,
    pub like: Option<Count>,
    pub reply: Option<Count>,
    #[serde(deserialize_with = "null_as_default")]
    pub stat: VideoStat,
    #[serde(deserialize_with = "null_as_default")]
    pub focus: FocusColors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticleStats {
    pub share: Option<Count>,
    pub like: Option<Count>,
    pub reply: Option<Count>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArticlePayload {
    pub title: Option<String>,
    pub author_name: Option<String>,
    pub author_face: Option<String>,
    pub publish_time: Option<Timestamp>,
    /// Trusted, pre-sanitized article body
    pub html_content: Option<String>,
    pub summary: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub stats: ArticleStats,
    #[serde(deserialize_with = "null_as_default")]
    pub focus: FocusColors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Area {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BangumiPublish {
    pub release_date_show: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub is_finish: Option<i64>,
    /// Next airing time, `YYYY-MM-DD HH:MM:SS`
    pub pub_time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BangumiEpisode {
    pub desc: Option<String>,
    pub title: Option<String>,
    pub index_show: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BangumiStat {
    pub views: Option<Count>,
    pub follow: Option<Count>,
    pub danmakus: Option<Count>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Rating {
    #[serde(deserialize_with = "lenient")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BangumiPayload {
    pub title: Option<String>,
    pub cover: Option<String>,
    pub desc: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub season_type: Option<i64>,
    pub type_desc: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub styles: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub areas: Vec<Area>,
    #[serde(deserialize_with = "null_as_default")]
    pub publish: BangumiPublish,
    #[serde(deserialize_with = "null_as_default")]
    pub new_ep: BangumiEpisode,
    #[serde(deserialize_with = "null_as_default")]
    pub stat: BangumiStat,
    pub rating: Option<Rating>,
    #[serde(deserialize_with = "null_as_default")]
    pub focus: FocusColors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RoomInfo {
    pub room_id: Option<Count>,
    pub title: Option<String>,
    pub cover: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub live_status: Option<i64>,
    pub area_name: Option<String>,
    pub parent_area_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnchorBaseInfo {
    pub uname: Option<String>,
    pub face: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AnchorInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub base_info: AnchorBaseInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WatchedShow {
    pub num: Option<Count>,
    pub text_large: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LivePayload {
    #[serde(deserialize_with = "null_as_default")]
    pub room_info: RoomInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub anchor_info: AnchorInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub watched_show: WatchedShow,
    #[serde(deserialize_with = "null_as_default")]
    pub focus: FocusColors,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Pendant {
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Relation {
    pub follower: Option<Count>,
    pub following: Option<Count>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VipLabel {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Vip {
    #[serde(deserialize_with = "lenient")]
    pub status: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub label: VipLabel,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Medal {
    pub medal_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub level: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FansMedal {
    pub medal: Option<Medal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserPayload {
    pub uid: Option<Count>,
    pub mid: Option<Count>,
    pub name: Option<String>,
    pub face: Option<String>,
    pub sign: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub level: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub pendant: Pendant,
    pub relation: Option<Relation>,
    pub vip: Option<Vip>,
    pub fans_medal: Option<FansMedal>,
    pub likes: Option<Count>,
    pub archive_view: Option<Count>,
    /// Most recent dynamic, shown as an excerpt
    pub dynamic: Option<Box<DynamicItem>>,
    #[serde(deserialize_with = "null_as_default")]
    pub focus: FocusColors,
}

impl UserPayload {
    pub fn user_id(&self) -> Option<&Count> {
        self.uid.as_ref().or(self.mid.as_ref())
    }
}

/// A subscribed or followed account shown in the subscription list card
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubscribedUser {
    pub uid: Option<Count>,
    pub name: Option<String>,
    pub face: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubscribedBangumi {
    pub title: Option<String>,
}

/// Input for the subscription list card
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubscriptionList {
    #[serde(deserialize_with = "null_as_default")]
    pub users: Vec<SubscribedUser>,
    #[serde(deserialize_with = "null_as_default")]
    pub bangumis: Vec<SubscribedBangumi>,
    #[serde(alias = "accountFollows")]
    #[serde(deserialize_with = "null_as_default")]
    pub account_follows: Vec<SubscribedUser>,
    #[serde(alias = "accountFollowsTitle")]
    pub account_follows_title: Option<String>,
}
