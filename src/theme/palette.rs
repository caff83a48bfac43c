//! Colors: hex parsing, brightness adjustment, per-type accents and the
//! gradient/badge palette of a card.

use crate::payload::dynamic::DynamicPayload;
use crate::payload::{self, ContentType, FocusColors};
use serde_json::Value;
use std::fmt;

/// A validated `#RRGGBB` color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Strict parse: a `#` followed by exactly six hex digits.
    pub fn parse(raw: &str) -> Option<Self> {
        let hex = raw.strip_prefix('#')?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Scale each channel by `percent` (negative darkens), clamped to 0..=255.
    pub fn adjust_brightness(&self, percent: f64) -> Self {
        let scale = |c: u8| {
            let c = c as f64;
            (c + c * percent / 100.0).clamp(0.0, 255.0).round() as u8
        };
        Self::rgb(scale(self.r), scale(self.g), scale(self.b))
    }

    /// CSS `rgba()` with the given alpha
    pub fn rgba(&self, alpha: f64) -> String {
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha)
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Brightness adjustment on a hex string. Invalid input is returned as-is.
pub fn adjust_brightness(hex: &str, percent: f64) -> String {
    match HexColor::parse(hex) {
        Some(c) => c.adjust_brightness(percent).to_string(),
        None => hex.to_string(),
    }
}

/// Label, accent and icon of a content type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeConfig {
    /// Key used for badge visibility lookups (type or bangumi subtype)
    pub key: &'static str,
    pub label: &'static str,
    pub accent: HexColor,
    pub icon: &'static str,
}

const PINK: HexColor = HexColor::rgb(0xFB, 0x72, 0x99);
const BLUE: HexColor = HexColor::rgb(0x00, 0xA1, 0xD6);
const CYAN: HexColor = HexColor::rgb(0x00, 0xB5, 0xE5);
const ORANGE: HexColor = HexColor::rgb(0xFA, 0xA0, 0x23);
const ROSE: HexColor = HexColor::rgb(0xFF, 0x66, 0x99);
const RED: HexColor = HexColor::rgb(0xFE, 0x50, 0x50);

/// Descriptor used for type names nothing else matches
pub fn generic_type_config() -> TypeConfig {
    TypeConfig {
        key: "generic",
        label: "Bilibili",
        accent: PINK,
        icon: "",
    }
}

/// Type descriptor by name; bangumi payloads are refined by `season_type`.
pub fn type_config_for_name(name: &str, payload: &Value) -> TypeConfig {
    match name.parse::<ContentType>() {
        Ok(kind) => type_config(kind, payload),
        Err(_) => generic_type_config(),
    }
}

pub fn type_config(kind: ContentType, payload: &Value) -> TypeConfig {
    let base = |key, label, accent, icon| TypeConfig {
        key,
        label,
        accent,
        icon,
    };
    match kind {
        ContentType::Video => base("video", "视频", PINK, "▶️"),
        ContentType::Article => base("article", "专栏", ORANGE, "📰"),
        ContentType::Live => base("live", "直播", ROSE, "📡"),
        ContentType::Dynamic => base("dynamic", "动态", CYAN, "📱"),
        ContentType::User => base("user", "用户", PINK, "👤"),
        ContentType::Bangumi => {
            match payload.get("season_type").and_then(Value::as_i64) {
                Some(2) => base("movie", "电影", RED, "🎬"),
                Some(3) => base("doc", "纪录片", CYAN, "📽️"),
                Some(4) => base("guochuang", "国创", CYAN, "🇨🇳"),
                Some(5) => base("tv", "电视剧", RED, "📺"),
                Some(7) => base("variety", "综艺", RED, "🎤"),
                _ => base("bangumi", "番剧", BLUE, "🎬"),
            }
        }
    }
}

/// One gradient stop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub color: HexColor,
    /// Offset in percent, 0..=100
    pub offset: u8,
}

/// Badge fill: flat on dark themes, diagonal gradient on light ones
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BadgeFill {
    Flat(HexColor),
    Diagonal(HexColor, HexColor),
}

impl BadgeFill {
    pub fn css(&self) -> String {
        match self {
            BadgeFill::Flat(c) => c.to_string(),
            BadgeFill::Diagonal(a, b) => format!("linear-gradient(135deg, {}, {})", a, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeStyle {
    pub color: HexColor,
    pub background: BadgeFill,
    pub text: HexColor,
    pub shadow: String,
    pub border: String,
}

/// The derived palette of one card
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSpec {
    pub is_night: bool,
    pub accent: HexColor,
    /// Always at least two stops
    pub gradient: Vec<GradientStop>,
    pub badge: BadgeStyle,
    pub theme_class: &'static str,
}

impl ThemeSpec {
    pub fn gradient_css(&self) -> String {
        let stops = self
            .gradient
            .iter()
            .map(|s| format!("{} {}%", s.color, s.offset))
            .collect::<Vec<_>>()
            .join(", ");
        format!("linear-gradient(135deg, {})", stops)
    }
}

const NIGHT_BADGE_FILL: HexColor = HexColor::rgb(0x23, 0x27, 0x2D);
const WHITE: HexColor = HexColor::rgb(0xFF, 0xFF, 0xFF);

/// Derive gradient and badge styling for a card.
///
/// Up to three candidate colors are taken from type-specific payload fields;
/// only strict `#RRGGBB` values count and duplicates are dropped. Missing
/// stops are synthesized from the first color (-10 %, then +12 %), so the
/// gradient always has at least two stops even for an empty payload.
pub fn calculate_colors(
    kind: ContentType,
    payload: &Value,
    type_config: &TypeConfig,
    is_night: bool,
) -> ThemeSpec {
    let mut colors: Vec<HexColor> = Vec::with_capacity(3);
    let add = |colors: &mut Vec<HexColor>, c: HexColor| -> bool {
        if colors.contains(&c) {
            false
        } else {
            colors.push(c);
            true
        }
    };

    for candidate in candidate_colors(kind, payload) {
        if let Some(c) = HexColor::parse(&candidate) {
            add(&mut colors, c);
        }
    }

    if colors.is_empty() {
        colors.push(type_config.accent);
    }
    if colors.len() == 1 {
        let base = colors[0];
        if !add(&mut colors, base.adjust_brightness(-10.0))
            && !add(&mut colors, base.adjust_brightness(12.0))
        {
            // Extremes such as pure black cannot be shifted; repeat the base.
            colors.push(base);
        }
    }
    if colors.len() == 2 {
        let base = colors[0];
        if !add(&mut colors, base.adjust_brightness(12.0)) {
            add(&mut colors, base.adjust_brightness(-10.0));
        }
    }

    let last = (colors.len() - 1) as f64;
    let gradient = colors
        .iter()
        .enumerate()
        .map(|(i, &color)| GradientStop {
            color,
            offset: (i as f64 * 100.0 / last).round() as u8,
        })
        .collect();

    ThemeSpec {
        is_night,
        accent: type_config.accent,
        gradient,
        badge: badge_style(type_config.accent, is_night),
        theme_class: if is_night { "theme-dark" } else { "theme-light" },
    }
}

fn badge_style(accent: HexColor, is_night: bool) -> BadgeStyle {
    if is_night {
        let color = accent.adjust_brightness(-25.0);
        BadgeStyle {
            color,
            background: BadgeFill::Flat(NIGHT_BADGE_FILL),
            text: color,
            shadow: "0 4px 12px rgba(0, 0, 0, 0.4)".to_string(),
            border: "1px solid rgba(255, 255, 255, 0.1)".to_string(),
        }
    } else {
        BadgeStyle {
            color: accent,
            background: BadgeFill::Diagonal(accent, accent.adjust_brightness(-10.0)),
            text: WHITE,
            shadow: format!("0 8px 24px {}", accent.rgba(0.4)),
            border: "none".to_string(),
        }
    }
}

/// Raw candidate strings, in priority order, for a content type.
fn candidate_colors(kind: ContentType, payload: &Value) -> Vec<String> {
    let focus = || -> FocusColors {
        payload
            .get("focus")
            .and_then(|f| serde_json::from_value(f.clone()).ok())
            .unwrap_or_default()
    };
    let collect = |list: &[Option<String>]| -> Vec<String> { list.iter().flatten().cloned().collect() };

    match kind {
        ContentType::Video | ContentType::Article | ContentType::Live => {
            let f = focus();
            collect(&[f.cover, f.avatar])
        }
        ContentType::Bangumi => collect(&[focus().cover]),
        ContentType::User => collect(&[focus().avatar]),
        ContentType::Dynamic => {
            let parsed: DynamicPayload =
                payload::parse(ContentType::Dynamic, payload).unwrap_or_default();
            let extras = parsed.author_extras().cloned().unwrap_or_default();
            let fan_color = extras.fan_color.or_else(|| {
                parsed
                    .item()
                    .modules
                    .module_author
                    .decoration_card
                    .as_ref()
                    .and_then(|d| d.fan.as_ref())
                    .and_then(|f| f.color.clone())
            });
            collect(&[fan_color, extras.card_focus_color, extras.avatar_focus_color])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_hex_parsing() {
        assert_eq!(HexColor::parse("#FB7299"), Some(HexColor::rgb(0xfb, 0x72, 0x99)));
        assert_eq!(HexColor::parse("#fb7299").unwrap().to_string(), "#fb7299");
        for bad in ["FB7299", "#FB729", "#FB72999", "#GG0000", "", "#"] {
            assert!(HexColor::parse(bad).is_none(), "{bad} should be rejected");
        }
    }

    #[test]
    fn brightness_adjustment_clamps() {
        assert_eq!(adjust_brightness("#646464", 10.0), "#6e6e6e");
        assert_eq!(adjust_brightness("#646464", -10.0), "#5a5a5a");
        assert_eq!(adjust_brightness("#f0f0f0", 12.0), "#ffffff");
        assert_eq!(adjust_brightness("#000000", -25.0), "#000000");
        assert_eq!(adjust_brightness("nope", 10.0), "nope");
    }

    #[test]
    fn bangumi_subtypes() {
        let movie = type_config(ContentType::Bangumi, &json!({"season_type": 2}));
        assert_eq!(movie.label, "电影");
        assert_eq!(movie.key, "movie");
        let plain = type_config(ContentType::Bangumi, &json!({"season_type": 1}));
        assert_eq!(plain.label, "番剧");
        assert_eq!(type_config_for_name("podcast", &json!({})).label, "Bilibili");
    }

    #[test]
    fn empty_payload_still_gets_a_gradient() {
        for kind in ContentType::ALL {
            let cfg = type_config(kind, &json!({}));
            let theme = calculate_colors(kind, &json!({}), &cfg, false);
            assert!(theme.gradient.len() >= 2, "{kind}: {:?}", theme.gradient);
            assert_eq!(theme.gradient[0].color, cfg.accent);
            assert_eq!(theme.gradient.first().unwrap().offset, 0);
            assert_eq!(theme.gradient.last().unwrap().offset, 100);
        }
    }

    #[test]
    fn invalid_candidates_are_ignored() {
        let payload = json!({"focus": {"cover": "red", "avatar": "#12345"}});
        let cfg = type_config(ContentType::Video, &payload);
        let theme = calculate_colors(ContentType::Video, &payload, &cfg, false);
        assert_eq!(theme.gradient[0].color, cfg.accent);
    }

    #[test]
    fn extreme_colors_keep_two_stops() {
        let payload = json!({"focus": {"avatar": "#000000"}});
        let cfg = type_config(ContentType::User, &payload);
        let theme = calculate_colors(ContentType::User, &payload, &cfg, true);
        assert!(theme.gradient.len() >= 2);
        assert!(theme.gradient.iter().all(|s| s.color == HexColor::rgb(0, 0, 0)));
    }

    #[test]
    fn two_payload_colors_get_a_third_stop() {
        let payload = json!({"focus": {"cover": "#336699", "avatar": "#AA0000"}});
        let cfg = type_config(ContentType::Video, &payload);
        let theme = calculate_colors(ContentType::Video, &payload, &cfg, false);
        let offsets: Vec<u8> = theme.gradient.iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0, 50, 100]);
        assert_eq!(theme.gradient[2].color.to_string(), "#3972ab");
        assert_eq!(
            theme.gradient_css(),
            "linear-gradient(135deg, #336699 0%, #aa0000 50%, #3972ab 100%)"
        );
    }

    #[test]
    fn dynamic_colors_come_from_author_decoration() {
        let payload = json!({
            "item": {"modules": {"module_author": {"decoration_card": {"fan": {"color": "#ff00aa"}}}}}
        });
        let cfg = type_config(ContentType::Dynamic, &payload);
        let theme = calculate_colors(ContentType::Dynamic, &payload, &cfg, false);
        assert_eq!(theme.gradient[0].color.to_string(), "#ff00aa");
    }

    #[test]
    fn badge_differs_by_theme() {
        let cfg = type_config(ContentType::Video, &json!({}));
        let day = calculate_colors(ContentType::Video, &json!({}), &cfg, false);
        let night = calculate_colors(ContentType::Video, &json!({}), &cfg, true);

        assert_eq!(day.theme_class, "theme-light");
        assert!(matches!(day.badge.background, BadgeFill::Diagonal(..)));
        assert_eq!(day.badge.text, WHITE);
        assert!(day.badge.shadow.starts_with("0 8px 24px rgba(251, 114, 153, 0.4)"));
        assert_eq!(day.badge.border, "none");

        assert_eq!(night.theme_class, "theme-dark");
        assert_eq!(night.badge.background, BadgeFill::Flat(NIGHT_BADGE_FILL));
        assert_eq!(night.badge.color, cfg.accent.adjust_brightness(-25.0));
        assert_eq!(night.badge.text, night.badge.color);
    }
}
