use crate::payload::dynamic::DynamicPayload;
use crate::payload::{self, ContentType};
use serde_json::Value;

/// Fixed device scale factor of every card surface
pub const DEVICE_SCALE_FACTOR: f64 = 1.1;

/// Generous initial height; trimmed to the content after layout
pub const INITIAL_HEIGHT: u32 = 1200;

/// Narrowest width a card may shrink to
pub const MIN_WIDTH: u32 = 400;

/// Viewport a surface is configured with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSpec {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub min_width: u32,
}

impl ViewportSpec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            device_scale_factor: DEVICE_SCALE_FACTOR,
            min_width: MIN_WIDTH,
        }
    }

    /// Same viewport with a different height (auto-height after layout)
    pub fn with_height(self, height: u32) -> Self {
        Self {
            height: height.max(1),
            ..self
        }
    }
}

impl Default for ViewportSpec {
    fn default() -> Self {
        Self::new(1200, INITIAL_HEIGHT)
    }
}

/// Viewport for a content type. Dynamics with media or a repost get a wider
/// canvas than plain-text ones.
pub fn calculate_viewport(kind: ContentType, payload: &Value) -> ViewportSpec {
    let width = match kind {
        ContentType::Dynamic => {
            if dynamic_has_rich_content(payload) {
                1100
            } else {
                800
            }
        }
        ContentType::Video | ContentType::Live => 1000,
        ContentType::Bangumi => 950,
        ContentType::Article => 1080,
        ContentType::User => 900,
    };
    ViewportSpec::new(width, INITIAL_HEIGHT)
}

fn dynamic_has_rich_content(payload: &Value) -> bool {
    let parsed: DynamicPayload = match payload::parse(ContentType::Dynamic, payload) {
        Ok(p) => p,
        Err(_) => return false,
    };
    let item = parsed.item();
    if item.orig.is_some() {
        return true;
    }
    match &item.modules.module_dynamic.major {
        Some(major) => {
            let has_images = major.draw.as_ref().is_some_and(|d| !d.items.is_empty())
                || major.opus.as_ref().is_some_and(|o| !o.pics.is_empty());
            has_images || major.archive.is_some() || major.live_rcmd.is_some()
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn widths_per_type() {
        let empty = json!({});
        assert_eq!(calculate_viewport(ContentType::Video, &empty).width, 1000);
        assert_eq!(calculate_viewport(ContentType::Live, &empty).width, 1000);
        assert_eq!(calculate_viewport(ContentType::Bangumi, &empty).width, 950);
        assert_eq!(calculate_viewport(ContentType::Article, &empty).width, 1080);
        assert_eq!(calculate_viewport(ContentType::User, &empty).width, 900);
        assert_eq!(calculate_viewport(ContentType::Dynamic, &empty).width, 800);
    }

    #[test]
    fn rich_dynamics_are_wider() {
        let images = json!({"item": {"modules": {"module_dynamic": {"major": {"draw": {"items": [{"src": "a"}]}}}}}});
        let video = json!({"modules": {"module_dynamic": {"major": {"archive": {"title": "v"}}}}});
        let repost = json!({"item": {"orig": {}}});
        let empty_draw = json!({"item": {"modules": {"module_dynamic": {"major": {"draw": {"items": []}}}}}});

        assert_eq!(calculate_viewport(ContentType::Dynamic, &images).width, 1100);
        assert_eq!(calculate_viewport(ContentType::Dynamic, &video).width, 1100);
        assert_eq!(calculate_viewport(ContentType::Dynamic, &repost).width, 1100);
        assert_eq!(calculate_viewport(ContentType::Dynamic, &empty_draw).width, 800);
    }

    #[test]
    fn fixed_scale_and_height() {
        let vp = calculate_viewport(ContentType::Video, &json!({}));
        assert_eq!(vp.height, INITIAL_HEIGHT);
        assert_eq!(vp.device_scale_factor, 1.1);
        assert_eq!(vp.min_width, MIN_WIDTH);
        assert_eq!(vp.with_height(0).height, 1);
    }
}
