//! Render orchestration: request in, PNG out.
//!
//! Every render walks `Init → Acquired → ContentSet → Captured → Released`.
//! Everything that can fail without a browser (type dispatch, theme
//! derivation, markup) happens in `Init`, before a surface is taken. Once a
//! surface has been acquired it is released on every path, and the original
//! error is returned unchanged.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConsumerConfigSource, ConsumerSettings, RenderConfig};
use crate::payload::{ContentType, RenderRequest, SubscriptionList};
use crate::pool::{BrowserPool, SurfaceLease};
use crate::render::{self, render_content, HelpKind};
use crate::theme::{
    help_stylesheet, list_gradient, stylesheet, subscription_stylesheet, CardTheme, ThemeEngine,
    TypeConfig, ViewportSpec, INITIAL_HEIGHT,
};
use crate::Result;
use askama::Template;
use base64::Engine as _;
use log::{debug, warn};
use std::fmt;
use std::sync::Arc;

/// Width of the subscription list card
pub const SUBSCRIPTION_WIDTH: u32 = 880;

/// Device scale factor of the subscription list card
pub const SUBSCRIPTION_SCALE: f64 = 2.0;

const SUBSCRIPTION_ROOT: &str = "#wrapper";

/// Width of the help card
pub const HELP_WIDTH: u32 = 1000;

/// Initial viewport height of the help card
pub const HELP_HEIGHT: u32 = 1500;

/// Device scale factor of the help card
pub const HELP_SCALE: f64 = 1.5;

const HELP_ROOT: &str = ".container";

/// A captured card
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCard {
    pub png: Vec<u8>,
    /// Viewport width in CSS pixels
    pub width: u32,
    /// Measured content height in CSS pixels
    pub height: u32,
}

impl RenderedCard {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.png)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Init,
    Acquired,
    ContentSet,
    Captured,
    Released,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Acquired => "acquired",
            Stage::ContentSet => "content-set",
            Stage::Captured => "captured",
            Stage::Released => "released",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Whether the type badge is shown for a consumer.
///
/// A bangumi subtype key (`movie`, `doc`, ...) takes precedence over the
/// `bangumi` key. Otherwise the badge is hidden only when the consumer maps
/// the type to `false`.
pub fn badge_visible(
    kind: ContentType,
    type_config: &TypeConfig,
    settings: Option<&ConsumerSettings>,
) -> bool {
    let map = match settings {
        Some(s) => &s.label_visibility,
        None => return true,
    };
    if kind == ContentType::Bangumi && type_config.key != kind.as_str() {
        if let Some(visible) = map.get(type_config.key) {
            return *visible;
        }
    }
    map.get(kind.as_str()) != Some(&false)
}

#[derive(Template)]
#[template(path = "card.html")]
struct CardDocument<'a> {
    stylesheet: String,
    theme_class: &'a str,
    badge: Option<&'a TypeConfig>,
    fragment: &'a str,
}

/// A bare page around pre-rendered body markup
#[derive(Template)]
#[template(path = "page.html")]
struct Page<'a> {
    stylesheet: String,
    body_class: Option<&'a str>,
    body: String,
}

/// Full HTML document for a preview card. `badge` is the type badge to show,
/// if any.
pub fn card_document(
    theme: &CardTheme,
    badge: Option<&TypeConfig>,
    fragment: &str,
) -> Result<String> {
    let document = CardDocument {
        stylesheet: stylesheet(&theme.spec, &theme.viewport)?,
        theme_class: theme.spec.theme_class,
        badge,
        fragment,
    };
    Ok(document.render()?)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

/// Turns render requests into PNG cards using a shared [`BrowserPool`].
pub struct CardRenderer {
    pool: BrowserPool,
    consumers: Arc<dyn ConsumerConfigSource>,
    clock: Arc<dyn Clock>,
    config: RenderConfig,
    theme: ThemeEngine,
}

impl CardRenderer {
    pub fn new(pool: BrowserPool, consumers: Arc<dyn ConsumerConfigSource>) -> Self {
        let config = RenderConfig::default();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            theme: ThemeEngine::new(Arc::clone(&clock), config.timezone),
            pool,
            consumers,
            clock,
            config,
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.theme = ThemeEngine::new(Arc::clone(&self.clock), config.timezone);
        self.config = config;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.theme = ThemeEngine::new(Arc::clone(&clock), self.config.timezone);
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &BrowserPool {
        &self.pool
    }

    pub fn theme_engine(&self) -> &ThemeEngine {
        &self.theme
    }

    fn consumer_settings(&self, consumer: Option<&str>) -> Option<ConsumerSettings> {
        consumer.and_then(|id| self.consumers.settings(id))
    }

    /// Markup and viewport for a request, without touching the pool
    pub fn prepare(&self, request: &RenderRequest) -> Result<(String, ViewportSpec)> {
        let kind = request.content_type;
        let settings = self.consumer_settings(request.consumer.as_deref());
        let theme = self.theme.derive(kind, &request.payload, settings.as_ref());
        let fragment = render_content(kind, &request.payload, &request.display, &self.theme.now())?;
        let badge = badge_visible(kind, &theme.type_config, settings.as_ref())
            .then_some(&theme.type_config);
        Ok((card_document(&theme, badge, &fragment)?, theme.viewport))
    }

    /// Render one preview card.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderedCard> {
        let label = request.content_type.as_str();
        debug!("[{}] {}", label, Stage::Init);
        let (document, viewport) = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => {
                debug!("[{}] {}: {}", label, Stage::Failed, e);
                return Err(e);
            }
        };
        let root = self.config.ready_selector.clone();
        self.run(label, document, viewport, &root).await
    }

    /// Convenience wrapper: build the request from a type name and an API
    /// response, then render it.
    pub async fn render_json(
        &self,
        content_type: &str,
        response: serde_json::Value,
        consumer: Option<&str>,
    ) -> Result<RenderedCard> {
        let mut request = RenderRequest::from_api_response(content_type, response)?;
        request.consumer = consumer.map(str::to_string);
        self.render(&request).await
    }

    /// Render the subscription list card of a consumer.
    pub async fn render_subscription_list(
        &self,
        list: &SubscriptionList,
        consumer: Option<&str>,
        show_id: bool,
        title: &str,
    ) -> Result<RenderedCard> {
        let label = "subscriptions";
        debug!("[{}] {}", label, Stage::Init);
        let settings = self.consumer_settings(consumer);
        let is_night = self.theme.is_night_mode(settings.as_ref());
        let document = match subscription_stylesheet(is_night).and_then(|stylesheet| {
            let body = render::render_subscription_list(list, title, show_id)?;
            let page = Page {
                stylesheet,
                body_class: None,
                body,
            };
            Ok(page.render()?)
        }) {
            Ok(document) => document,
            Err(e) => {
                debug!("[{}] {}: {}", label, Stage::Failed, e);
                return Err(e);
            }
        };
        let viewport = ViewportSpec {
            device_scale_factor: SUBSCRIPTION_SCALE,
            ..ViewportSpec::new(SUBSCRIPTION_WIDTH, INITIAL_HEIGHT)
        };
        self.run(label, document, viewport, SUBSCRIPTION_ROOT).await
    }

    /// Render the user or admin help card, themed for a consumer.
    pub async fn render_help_card(
        &self,
        kind: HelpKind,
        consumer: Option<&str>,
    ) -> Result<RenderedCard> {
        let label = "help";
        debug!("[{}:{}] {}", label, kind, Stage::Init);
        let settings = self.consumer_settings(consumer);
        let is_night = self.theme.is_night_mode(settings.as_ref());
        let document = match help_stylesheet(is_night, HELP_WIDTH).and_then(|stylesheet| {
            let body = render::render_help_card(kind, list_gradient(is_night))?;
            let page = Page {
                stylesheet,
                body_class: Some(if is_night { "theme-dark" } else { "theme-light" }),
                body,
            };
            Ok(page.render()?)
        }) {
            Ok(document) => document,
            Err(e) => {
                debug!("[{}:{}] {}: {}", label, kind, Stage::Failed, e);
                return Err(e);
            }
        };
        let viewport = ViewportSpec {
            device_scale_factor: HELP_SCALE,
            ..ViewportSpec::new(HELP_WIDTH, HELP_HEIGHT)
        };
        self.run(label, document, viewport, HELP_ROOT).await
    }

    async fn run(
        &self,
        label: &str,
        document: String,
        viewport: ViewportSpec,
        root: &str,
    ) -> Result<RenderedCard> {
        let lease = self.pool.acquire(&viewport).await?;
        debug!("[{}] {} surface {}", label, Stage::Acquired, lease.id());

        let result = self.load_and_capture(label, &lease, document, viewport, root).await;
        let id = lease.id().clone();
        lease.release().await;

        match &result {
            Ok(card) => debug!(
                "[{}] {} surface {} ({}x{}, {} bytes)",
                label,
                Stage::Released,
                id,
                card.width,
                card.height,
                card.png.len()
            ),
            Err(e) => debug!(
                "[{}] {} -> {} surface {}: {}",
                label,
                Stage::Failed,
                Stage::Released,
                id,
                e
            ),
        }
        result
    }

    async fn load_and_capture(
        &self,
        label: &str,
        lease: &SurfaceLease,
        document: String,
        viewport: ViewportSpec,
        root: &str,
    ) -> Result<RenderedCard> {
        let ready_timeout = self.config.ready_timeout;
        let ready = {
            let surface = lease.surface();
            let selector = root.to_string();
            blocking(move || surface.load(&document, Some(&selector), ready_timeout)).await?
        };
        if !ready {
            warn!(
                "[{}] {} not ready after {:?}; waiting {:?} and capturing anyway",
                label, root, ready_timeout, self.config.fallback_delay
            );
            tokio::time::sleep(self.config.fallback_delay).await;
        }
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        debug!("[{}] {}", label, Stage::ContentSet);

        let height = {
            let surface = lease.surface();
            let selector = root.to_string();
            blocking(move || surface.measure_height(&selector)).await?
        };
        let sized = viewport.with_height(height);
        {
            let surface = lease.surface();
            blocking(move || surface.configure(&sized)).await?;
        }
        let png = {
            let surface = lease.surface();
            let selector = root.to_string();
            blocking(move || surface.capture(&selector, true)).await?
        };
        debug!("[{}] {} at {}x{}", label, Stage::Captured, sized.width, sized.height);

        Ok(RenderedCard {
            png,
            width: sized.width,
            height: sized.height,
        })
    }
}

impl fmt::Debug for CardRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardRenderer")
            .field("pool", &self.pool)
            .field("config", &self.config)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticConsumerConfig;
    use crate::theme::type_config;
    use serde_json::json;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, bool)]) -> ConsumerSettings {
        ConsumerSettings {
            label_visibility: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<HashMap<_, _>>(),
            ..Default::default()
        }
    }

    #[test]
    fn badge_visible_without_settings() {
        let cfg = type_config(ContentType::Video, &json!({}));
        assert!(badge_visible(ContentType::Video, &cfg, None));
        assert!(badge_visible(ContentType::Video, &cfg, Some(&settings(&[]))));
        assert!(!badge_visible(
            ContentType::Video,
            &cfg,
            Some(&settings(&[("video", false)]))
        ));
    }

    #[test]
    fn bangumi_subtype_overrides_type_key() {
        let movie = type_config(ContentType::Bangumi, &json!({"season_type": 2}));
        assert_eq!(movie.key, "movie");
        let s = settings(&[("bangumi", false), ("movie", true)]);
        assert!(badge_visible(ContentType::Bangumi, &movie, Some(&s)));

        let s = settings(&[("bangumi", true), ("movie", false)]);
        assert!(!badge_visible(ContentType::Bangumi, &movie, Some(&s)));

        // Subtype absent from the map: the type key decides
        let s = settings(&[("bangumi", false)]);
        assert!(!badge_visible(ContentType::Bangumi, &movie, Some(&s)));
    }

    #[test]
    fn prepare_builds_document_without_surfaces() {
        let backend = crate::memory::MemoryBackend::new();
        let pool = BrowserPool::new(Default::default(), backend.clone()).unwrap();
        let renderer = CardRenderer::new(pool, Arc::new(StaticConsumerConfig::new()));
        let request = RenderRequest::new(
            "video",
            json!({"title": "T", "owner": {"name": "A", "face": "u"}, "pubdate": 1700000000}),
        )
        .unwrap();

        let (doc, viewport) = renderer.prepare(&request).unwrap();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(r#"<div class="container theme-light"><div class="type-badge">"#));
        assert!(doc.contains("<style>:root{"));
        assert!(doc.contains(r#"<div class="card">"#));
        assert_eq!(viewport.width, 1000);
        assert_eq!(backend.launches(), 0);
    }

    #[test]
    fn rendered_card_base64() {
        let card = RenderedCard {
            png: vec![0x89, b'P', b'N', b'G'],
            width: 1,
            height: 1,
        };
        assert_eq!(card.to_base64(), "iVBORw==");
    }
}
