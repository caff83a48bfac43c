//! Subscription list card: the users, bangumi and followed accounts one
//! consumer is subscribed to.

use super::face_or_default;
use crate::payload::{SubscribedUser, SubscriptionList};
use crate::Result;
use askama::Template;

struct UserRow<'a> {
    face: &'a str,
    name: &'a str,
    uid: Option<String>,
}

struct Section<'a> {
    title: &'a str,
    count: usize,
    empty_tip: &'static str,
    bangumi: bool,
    users: Vec<UserRow<'a>>,
    bangumis: Vec<&'a str>,
}

impl<'a> Section<'a> {
    fn users(title: &'a str, users: &'a [SubscribedUser], show_id: bool, empty_tip: &'static str) -> Self {
        Self {
            title,
            count: users.len(),
            empty_tip,
            bangumi: false,
            users: users
                .iter()
                .map(|u| UserRow {
                    face: face_or_default(&u.face),
                    name: u.name.as_deref().unwrap_or(""),
                    uid: u.uid.as_ref().filter(|_| show_id).map(|uid| uid.raw()),
                })
                .collect(),
            bangumis: Vec::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "cards/subscription.html")]
struct SubscriptionCard<'a> {
    title: &'a str,
    sections: Vec<Section<'a>>,
}

/// The `#wrapper` element of a subscription list card. The user section is
/// always present; bangumi and followed-account sections only when non-empty.
pub fn render_subscription_list(list: &SubscriptionList, title: &str, show_id: bool) -> Result<String> {
    let mut sections = vec![Section::users("本群订阅 (用户)", &list.users, show_id, "暂无用户订阅")];

    if !list.bangumis.is_empty() {
        sections.push(Section {
            title: "本群订阅 (番剧)",
            count: list.bangumis.len(),
            empty_tip: "暂无番剧订阅",
            bangumi: true,
            users: Vec::new(),
            bangumis: list
                .bangumis
                .iter()
                .map(|b| b.title.as_deref().unwrap_or(""))
                .collect(),
        });
    }

    if !list.account_follows.is_empty() {
        let heading = list
            .account_follows_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("账户关注列表");
        sections.push(Section::users(heading, &list.account_follows, show_id, "暂无关注"));
    }

    Ok(SubscriptionCard { title, sections }.render()?)
}
