//! Stylesheets driven by a derived [`ThemeSpec`].
//!
//! Only the palette varies between cards; layout rules are shared. The CSS
//! lives in `templates/styles/` and is returned without the `<style>` tag.

use super::palette::{HexColor, ThemeSpec};
use super::viewport::ViewportSpec;
use crate::Result;
use askama::Template;

const SUBSCRIPTION_DAY: &str = "linear-gradient(135deg, #fef5f6 0%, #e8f5ff 50%, #f0f9ff 100%)";
const SUBSCRIPTION_NIGHT: &str = "linear-gradient(135deg, #1a1a1a 0%, #2c3e50 100%)";

#[derive(Template)]
#[template(path = "styles/card.css", escape = "none")]
struct CardStyle<'a> {
    is_night: bool,
    accent: HexColor,
    accent_soft: String,
    gradient: String,
    badge_text: HexColor,
    badge_bg: String,
    badge_shadow: &'a str,
    badge_border: &'a str,
    min_width: u32,
    width: u32,
}

#[derive(Template)]
#[template(path = "styles/subscription.css", escape = "none")]
struct SubscriptionStyle {
    is_night: bool,
    gradient: &'static str,
}

#[derive(Template)]
#[template(path = "styles/help.css", escape = "none")]
struct HelpStyle {
    is_night: bool,
    width: u32,
}

/// Stylesheet for a preview card.
pub fn stylesheet(theme: &ThemeSpec, viewport: &ViewportSpec) -> Result<String> {
    let style = CardStyle {
        is_night: theme.is_night,
        accent: theme.accent,
        accent_soft: theme.accent.rgba(0.18),
        gradient: theme.gradient_css(),
        badge_text: theme.badge.text,
        badge_bg: theme.badge.background.css(),
        badge_shadow: &theme.badge.shadow,
        badge_border: &theme.badge.border,
        min_width: viewport.min_width,
        width: viewport.width,
    };
    Ok(style.render()?)
}

/// Background gradient of the list-style cards (subscriptions, help).
pub fn list_gradient(is_night: bool) -> &'static str {
    if is_night {
        SUBSCRIPTION_NIGHT
    } else {
        SUBSCRIPTION_DAY
    }
}

/// Stylesheet of the subscription list card.
pub fn subscription_stylesheet(is_night: bool) -> Result<String> {
    let style = SubscriptionStyle {
        is_night,
        gradient: list_gradient(is_night),
    };
    Ok(style.render()?)
}

/// Stylesheet of a help card laid out at `width` CSS pixels.
pub fn help_stylesheet(is_night: bool, width: u32) -> Result<String> {
    Ok(HelpStyle { is_night, width }.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::ContentType;
    use crate::theme::{calculate_colors, calculate_viewport, type_config};
    use serde_json::json;

    #[test]
    fn stylesheet_carries_theme_values() {
        let payload = json!({"focus": {"cover": "#336699"}});
        let cfg = type_config(ContentType::Video, &payload);
        let theme = calculate_colors(ContentType::Video, &payload, &cfg, false);
        let css = stylesheet(&theme, &calculate_viewport(ContentType::Video, &payload)).unwrap();

        assert!(!css.contains("<style>"));
        assert!(css.contains("--gradient-mix:linear-gradient(135deg, #336699 0%"));
        assert!(css.contains(".container{width:1000px}"));
        assert!(css.contains("min-width:400px"));
        assert!(css.contains("--color-text:#18191c"));
    }

    #[test]
    fn night_palette_switches_variables() {
        let cfg = type_config(ContentType::User, &json!({}));
        let theme = calculate_colors(ContentType::User, &json!({}), &cfg, true);
        let css = stylesheet(&theme, &ViewportSpec::default()).unwrap();
        assert!(css.contains("--color-text:#e3e5e7"));
        assert!(css.contains("--badge-bg:#23272d"));
        assert!(subscription_stylesheet(true).unwrap().contains("#2c3e50"));
        let day = subscription_stylesheet(false).unwrap();
        assert!(day.contains("--color-text:#18191c"));
        assert!(day.contains("#fef5f6"));

        let help = help_stylesheet(false, 1000).unwrap();
        assert!(help.contains("width:1000px"));
        assert!(help.contains(".theme-dark{--link-bg:#12161b"));
    }
}
