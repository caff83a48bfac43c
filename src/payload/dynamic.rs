//! Dynamic (feed post) payload models.
//!
//! A dynamic is either wrapped (`{"item": {...}}`) or bare. Reposts carry the
//! original post in `orig`, which uses the same shape.

use super::{lenient, null_as_default, Count, Timestamp};
use serde::Deserialize;

/// Top-level dynamic payload
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DynamicPayload {
    pub item: Option<DynamicItem>,
    #[serde(flatten)]
    pub bare: DynamicItem,
    pub pub_ts: Option<Timestamp>,
}

impl DynamicPayload {
    /// The dynamic item, whether wrapped or bare
    pub fn item(&self) -> &DynamicItem {
        self.item.as_ref().unwrap_or(&self.bare)
    }

    /// Author extras may sit on the item or next to it
    pub fn author_extras(&self) -> Option<&AuthorExtras> {
        self.item().author.as_ref().or(self.bare.author.as_ref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DynamicItem {
    pub id_str: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub modules: Modules,
    pub orig: Option<Box<DynamicPayload>>,
    pub author: Option<AuthorExtras>,
}

impl DynamicItem {
    pub fn is_live_recommendation(&self) -> bool {
        self.kind.as_deref() == Some("DYNAMIC_TYPE_LIVE_RCMD")
    }
}

/// Decoration details some upstream clients attach next to the item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthorExtras {
    #[serde(deserialize_with = "lenient")]
    pub level: Option<u32>,
    pub pendant_url: Option<String>,
    pub card_url: Option<String>,
    pub card_number: Option<Count>,
    pub fan_color: Option<String>,
    pub card_focus_color: Option<String>,
    pub avatar_focus_color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Modules {
    #[serde(deserialize_with = "null_as_default")]
    pub module_author: ModuleAuthor,
    #[serde(deserialize_with = "null_as_default")]
    pub module_dynamic: ModuleDynamic,
    #[serde(deserialize_with = "null_as_default")]
    pub module_stat: ModuleStat,
    #[serde(deserialize_with = "null_as_default")]
    pub module_interaction: ModuleInteraction,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleAuthor {
    pub mid: Option<Count>,
    pub name: Option<String>,
    pub face: Option<String>,
    pub pub_ts: Option<Timestamp>,
    pub pub_time: Option<String>,
    pub pendant: Option<super::Pendant>,
    pub decoration_card: Option<DecorationCard>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DecorationCard {
    pub card_url: Option<String>,
    pub fan: Option<FanInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FanInfo {
    pub num_desc: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleDynamic {
    pub desc: Option<RichTextBlock>,
    pub major: Option<Major>,
    pub additional: Option<Additional>,
}

/// Text plus its rich-text token sequence
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RichTextBlock {
    pub text: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub rich_text_nodes: Vec<RichTextNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RichTextNode {
    #[serde(rename = "type")]
    #[serde(deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    pub emoji: Option<Emoji>,
    pub jump_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Emoji {
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Major {
    pub draw: Option<Draw>,
    pub opus: Option<Opus>,
    pub archive: Option<Archive>,
    pub live_rcmd: Option<LiveRcmd>,
    pub vote: Option<RawVote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Draw {
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<DrawItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DrawItem {
    #[serde(deserialize_with = "null_as_default")]
    pub src: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Opus {
    pub title: Option<String>,
    pub summary: Option<RichTextBlock>,
    #[serde(deserialize_with = "null_as_default")]
    pub pics: Vec<OpusPic>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpusPic {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

/// Embedded video
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Archive {
    pub bvid: Option<String>,
    pub cover: Option<String>,
    pub title: Option<String>,
    pub desc: Option<String>,
    pub duration_text: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub stat: ArchiveStat,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArchiveStat {
    pub play: Option<Count>,
    pub view: Option<Count>,
    pub danmaku: Option<Count>,
}

/// Live recommendation; `content` is itself a JSON document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiveRcmd {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiveRcmdContent {
    pub live_play_info: Option<LivePlayInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LivePlayInfo {
    pub cover: Option<String>,
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub live_status: Option<i64>,
    pub parent_area_name: Option<String>,
    pub area_name: Option<String>,
    pub watched_show: Option<super::WatchedShow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Additional {
    pub vote: Option<RawVote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleInteraction {
    pub vote: Option<RawVote>,
    pub vote_info: Option<RawVote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleStat {
    pub forward: Option<StatCount>,
    pub comment: Option<StatCount>,
    pub like: Option<StatCount>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatCount {
    pub count: Option<Count>,
}

/// Poll data as sent by the various upstream endpoints. Field names differ
/// between endpoints, so every spelling is captured and normalized later.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVote {
    /// Some endpoints nest the poll one level deeper
    pub vote: Option<Box<RawVote>>,
    pub desc: Option<String>,
    pub title: Option<String>,
    pub items: Option<Vec<RawVoteItem>>,
    pub options: Option<Vec<RawVoteItem>>,
    #[serde(deserialize_with = "lenient")]
    pub join_num: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub participant: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub total: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub total_num: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub choice_cnt: Option<u32>,
    #[serde(rename = "choiceCount")]
    #[serde(deserialize_with = "lenient")]
    pub choice_count: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub multi_select: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawVoteItem {
    #[serde(deserialize_with = "lenient")]
    pub cnt: Option<u64>,
    pub desc: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub image: Option<String>,
}
