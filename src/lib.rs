//! cardshot
//!
//! Renders shareable preview cards (PNG images) for videos, articles,
//! bangumi, live rooms, dynamics and user profiles by driving a pool of
//! headless browser surfaces.
//!
//! # Features
//!
//! - **CDP Backend** (default): headless Chrome via the DevTools Protocol
//! - **Bounded Pool**: FIFO admission, per-surface deadlines and a periodic
//!   leak sweep
//! - **Deterministic Theming**: viewport, night mode and palette derived from
//!   the payload, the consumer's settings and an injectable clock
//!
//! # Example
//!
//! ```no_run
//! use cardshot::{BrowserPool, CardRenderer, PoolConfig, RenderRequest, StaticConsumerConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = BrowserPool::chrome(PoolConfig::default())?;
//! let renderer = CardRenderer::new(pool.clone(), Arc::new(StaticConsumerConfig::new()));
//!
//! let request = RenderRequest::new(
//!     "video",
//!     serde_json::json!({"title": "T", "owner": {"name": "A", "face": "u"}, "pubdate": 1700000000}),
//! )?;
//! let card = renderer.render(&request).await?;
//! std::fs::write("card.png", &card.png)?;
//!
//! pool.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod clock;
pub mod config;
pub mod format;
pub mod payload;
pub mod render;
pub mod theme;

pub mod surface;

#[cfg(feature = "cdp")]
pub mod cdp;

// In-process backend for tests, benches and machines without Chrome
pub mod memory;

pub mod orchestrator;
pub mod pool;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    ConsumerConfigSource, ConsumerSettings, DisplayOptions, NightMode, NightModeSettings,
    PoolConfig, RenderConfig, StaticConsumerConfig,
};
pub use orchestrator::{badge_visible, CardRenderer, RenderedCard};
pub use payload::{ContentType, RenderRequest, SubscriptionList};
pub use pool::{BrowserPool, PoolStats, SurfaceLease};
pub use render::HelpKind;
pub use surface::{Engine, EngineLauncher, RenderSurface, SurfaceId};
pub use theme::{CardTheme, ThemeEngine, ThemeSpec, ViewportSpec};
