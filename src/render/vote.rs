//! Poll widget. Upstream endpoints spell poll fields in several ways; they
//! are normalized into [`Vote`] before rendering.

use super::icons;
use crate::format::format_number;
use crate::payload::dynamic::{Modules, RawVote, RawVoteItem};
use crate::Result;
use askama::Template;

#[derive(Debug, Clone, PartialEq)]
pub struct VoteOption {
    pub text: String,
    pub count: u64,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub title: String,
    pub options: Vec<VoteOption>,
    /// Participants; never less than the sum of option counts
    pub total: u64,
    pub choice_count: u32,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

impl VoteOption {
    fn from_raw(item: &RawVoteItem) -> Self {
        let text = non_empty(&item.desc)
            .or_else(|| non_empty(&item.name))
            .or_else(|| non_empty(&item.text))
            .unwrap_or("")
            .to_string();
        Self {
            text,
            count: item.cnt.unwrap_or(0),
            image: item.image.clone().filter(|s| !s.is_empty()),
        }
    }
}

impl Vote {
    pub fn from_raw(raw: &RawVote) -> Self {
        let raw = raw.vote.as_deref().unwrap_or(raw);
        let title = non_empty(&raw.desc)
            .or_else(|| non_empty(&raw.title))
            .unwrap_or("投票")
            .to_string();
        let options: Vec<VoteOption> = raw
            .items
            .as_ref()
            .or(raw.options.as_ref())
            .map(|items| items.iter().map(VoteOption::from_raw).collect())
            .unwrap_or_default();
        let reported = [raw.join_num, raw.participant, raw.total, raw.total_num]
            .into_iter()
            .flatten()
            .find(|n| *n > 0)
            .unwrap_or(0);
        let summed: u64 = options.iter().map(|o| o.count).sum();
        let choice_count = raw
            .choice_cnt
            .or(raw.choice_count)
            .filter(|n| *n > 0)
            .unwrap_or(if raw.multi_select == Some(true) { 2 } else { 1 });

        Self {
            title,
            options,
            total: reported.max(summed),
            choice_count,
        }
    }

    /// First poll found in the interaction module, the major content, or
    /// the additional content, in that order.
    pub fn from_modules(modules: &Modules) -> Option<Self> {
        let interaction = &modules.module_interaction;
        let dynamic = &modules.module_dynamic;
        interaction
            .vote
            .as_ref()
            .or(interaction.vote_info.as_ref())
            .or_else(|| dynamic.major.as_ref().and_then(|m| m.vote.as_ref()))
            .or_else(|| dynamic.additional.as_ref().and_then(|a| a.vote.as_ref()))
            .map(Self::from_raw)
    }

    pub fn percent(&self, option: &VoteOption) -> u64 {
        if self.total == 0 {
            0
        } else {
            ((option.count as f64 / self.total as f64) * 100.0).round() as u64
        }
    }
}

struct VoteRow<'a> {
    text: &'a str,
    count: u64,
    percent: u64,
    image: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "cards/vote.html")]
struct VoteCard<'a> {
    icon: &'static str,
    title: &'a str,
    with_images: bool,
    /// Bars and counts only make sense once someone has voted
    show_stats: bool,
    rows: Vec<VoteRow<'a>>,
    mode: &'static str,
    total: String,
}

pub fn render_vote(vote: &Vote) -> Result<String> {
    let card = VoteCard {
        icon: icons::VOTE,
        title: &vote.title,
        with_images: vote.options.iter().any(|o| o.image.is_some()),
        show_stats: vote.total > 0,
        rows: vote
            .options
            .iter()
            .map(|option| VoteRow {
                text: &option.text,
                count: option.count,
                percent: vote.percent(option),
                image: option.image.as_deref(),
            })
            .collect(),
        mode: if vote.choice_count > 1 { "多选" } else { "单选" },
        total: format_number(vote.total),
    };
    Ok(card.render()?)
}
