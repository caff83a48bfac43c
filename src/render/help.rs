//! Help cards: the command reference shown to members and to admins.

use crate::Result;
use askama::Template;
use std::fmt;

/// Which command reference a help card shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HelpKind {
    #[default]
    User,
    Admin,
}

impl HelpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HelpKind::User => "user",
            HelpKind::Admin => "admin",
        }
    }
}

impl fmt::Display for HelpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy)]
struct SectionTag {
    class: &'static str,
    label: &'static str,
}

const ADMIN_TAG: SectionTag = SectionTag {
    class: "tag-admin",
    label: "群管",
};

const ROOT_TAG: SectionTag = SectionTag {
    class: "tag-root",
    label: "Root",
};

struct Command {
    code: &'static str,
    desc: &'static str,
}

struct Link {
    icon: &'static str,
    label: &'static str,
}

struct HelpSection {
    title: &'static str,
    tag: Option<SectionTag>,
    commands: &'static [Command],
    links: &'static [Link],
}

const fn cmd(code: &'static str, desc: &'static str) -> Command {
    Command { code, desc }
}

const fn link(icon: &'static str, label: &'static str) -> Link {
    Link { icon, label }
}

const USER_SECTIONS: &[HelpSection] = &[
    HelpSection {
        title: "用户指令",
        tag: None,
        commands: &[
            cmd("@Bot <内容>", "与 AI 进行对话"),
            cmd("/订阅列表", "查看本群订阅 & 账户关注"),
            cmd("/菜单", "显示此菜单"),
        ],
        links: &[],
    },
    HelpSection {
        title: "管理指令",
        tag: Some(ADMIN_TAG),
        commands: &[
            cmd("/订阅用户 <uid>", "订阅用户（动态+直播）"),
            cmd("/订阅番剧 <season_id>", "订阅番剧新剧集更新"),
            cmd("/取消订阅用户 <uid>", "取消用户订阅"),
            cmd("/取消订阅番剧 <season_id>", "取消番剧订阅"),
            cmd("/查询订阅 <uid|用户名>", "立即检查某用户动态"),
        ],
        links: &[],
    },
    HelpSection {
        title: "支持解析",
        tag: None,
        commands: &[],
        links: &[
            link("📺", "视频 (BV/av)"),
            link("🎬", "番剧 (ss/ep)"),
            link("📰", "专栏文章 (cv)"),
            link("📡", "直播间 (live)"),
            link("📱", "动态 (dynamic)"),
            link("🖼️", "Opus图文"),
            link("🔗", "短链 (b23.tv)"),
            link("📦", "小程序分享"),
        ],
    },
];

const ADMIN_SECTIONS: &[HelpSection] = &[
    HelpSection {
        title: "管理员菜单",
        tag: Some(ADMIN_TAG),
        commands: &[
            cmd("/设置 功能 <开|关>", "开关Bot权限"),
            cmd("/设置 关注同步 <开|关> [分组]", "同步账户关注至群订阅(可指定分组)"),
            cmd("/设置 黑名单 <操作>", "管理/查看黑名单"),
            cmd("/设置 标签 <操作>", "设置解析标签"),
            cmd("/设置 深色模式", "配置深色模式"),
            cmd("/设置 冷却 <秒数>", "设置相同链接解析冷却"),
            cmd("/设置 显示UID <开|关>", "开关订阅列表UID"),
        ],
        links: &[],
    },
    HelpSection {
        title: "系统菜单",
        tag: Some(ROOT_TAG),
        commands: &[
            cmd("/设置 AI上下文 <条数>", "设置 AI 上下文限制"),
            cmd("/设置 AI概率 <0-1>", "设置 AI 随机回复概率"),
            cmd("/设置 登录", "获取登录二维码"),
            cmd("/设置 验证 <key>", "验证登录状态"),
            cmd("/管理 新对话 [群号]", "重置 AI 对话记忆"),
            cmd("/管理 <群列表|清理>", "查看状态或清理群数据"),
            cmd("/设置 管理员 <添加|移除>", "设置本群管理员"),
            cmd("/设置 轮询 <秒数>", "设置轮询间隔"),
        ],
        links: &[],
    },
];

#[derive(Template)]
#[template(path = "cards/help.html")]
struct HelpCard {
    gradient: &'static str,
    title: &'static str,
    subtitle: &'static str,
    sections: &'static [HelpSection],
    admin_hint: Option<&'static str>,
}

/// The `.container` element of a help card. `gradient` is the card
/// background.
pub fn render_help_card(kind: HelpKind, gradient: &'static str) -> Result<String> {
    let card = match kind {
        HelpKind::User => HelpCard {
            gradient,
            title: "Bilibili Assistant",
            subtitle: "全能 B 站链接解析 & 订阅助手",
            sections: USER_SECTIONS,
            admin_hint: Some("/设置 帮助"),
        },
        HelpKind::Admin => HelpCard {
            gradient,
            title: "管理面板",
            subtitle: "系统配置与权限管理",
            sections: ADMIN_SECTIONS,
            admin_hint: None,
        },
    };
    Ok(card.render()?)
}
