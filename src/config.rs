//! Configuration for the pool, the render pipeline and per-consumer settings.
//!
//! Defaults are conservative and match what the chat integration runs with:
//! five concurrent surfaces, a 30 second per-surface deadline and a leak sweep
//! every minute.

use crate::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of simultaneously tracked surfaces
    pub max_concurrent: usize,
    /// A surface not released within this deadline is force-closed
    pub surface_timeout: Duration,
    /// Interval of the background leak reconciliation sweep
    pub reconcile_interval: Duration,
    /// Optional upper bound on how long `acquire` waits for capacity.
    /// `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
    /// Chrome/Chromium binary; auto-detected when unset
    pub chrome_path: Option<PathBuf>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            surface_timeout: Duration::from_secs(30),
            reconcile_interval: Duration::from_secs(60),
            acquire_timeout: None,
            chrome_path: None,
        }
    }
}

impl PoolConfig {
    /// Defaults overridden by `CARDSHOT_MAX_CONCURRENT`,
    /// `CARDSHOT_SURFACE_TIMEOUT_MS`, `CARDSHOT_RECONCILE_INTERVAL_MS`,
    /// `CARDSHOT_ACQUIRE_TIMEOUT_MS` and `CHROME_PATH`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_u64(key: &str, raw: String) -> Result<u64> {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} must be an integer, got {:?}", key, raw)))
        }

        let mut cfg = Self::default();
        if let Some(v) = lookup("CARDSHOT_MAX_CONCURRENT") {
            cfg.max_concurrent = parse_u64("CARDSHOT_MAX_CONCURRENT", v)? as usize;
        }
        if let Some(v) = lookup("CARDSHOT_SURFACE_TIMEOUT_MS") {
            cfg.surface_timeout =
                Duration::from_millis(parse_u64("CARDSHOT_SURFACE_TIMEOUT_MS", v)?);
        }
        if let Some(v) = lookup("CARDSHOT_RECONCILE_INTERVAL_MS") {
            cfg.reconcile_interval =
                Duration::from_millis(parse_u64("CARDSHOT_RECONCILE_INTERVAL_MS", v)?);
        }
        if let Some(v) = lookup("CARDSHOT_ACQUIRE_TIMEOUT_MS") {
            cfg.acquire_timeout = Some(Duration::from_millis(parse_u64(
                "CARDSHOT_ACQUIRE_TIMEOUT_MS",
                v,
            )?));
        }
        if let Some(v) = lookup("CHROME_PATH") {
            if !v.trim().is_empty() {
                cfg.chrome_path = Some(PathBuf::from(v));
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::Config("max_concurrent must be at least 1".into()));
        }
        if self.surface_timeout.is_zero() {
            return Err(Error::Config("surface_timeout must be non-zero".into()));
        }
        if self.reconcile_interval.is_zero() {
            return Err(Error::Config("reconcile_interval must be non-zero".into()));
        }
        Ok(())
    }
}

/// Timing and selector settings of the render pipeline
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Structural marker awaited after loading markup
    pub ready_selector: String,
    /// How long to wait for the marker
    pub ready_timeout: Duration,
    /// Fixed delay used when the marker never appears
    pub fallback_delay: Duration,
    /// Extra settle time for asynchronous image loads
    pub settle_delay: Duration,
    /// Reference timezone for night-mode windows and publish times
    pub timezone: Tz,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ready_selector: ".container".to_string(),
            ready_timeout: Duration::from_millis(5000),
            fallback_delay: Duration::from_millis(500),
            settle_delay: Duration::from_millis(300),
            timezone: chrono_tz::Asia::Shanghai,
        }
    }
}

/// Per-call display switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayOptions {
    /// Show numeric user ids on user and subscription cards
    pub show_id: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self { show_id: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NightMode {
    On,
    #[default]
    Off,
    Timed,
}

/// Night-mode switch of one consumer. Times are `HH:MM` in the reference
/// timezone; the window is `[start_time, end_time)` and may wrap midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NightModeSettings {
    pub mode: NightMode,
    pub start_time: String,
    pub end_time: String,
}

impl Default for NightModeSettings {
    fn default() -> Self {
        Self {
            mode: NightMode::Off,
            start_time: "21:00".to_string(),
            end_time: "06:00".to_string(),
        }
    }
}

/// Everything the renderer needs to know about one consumer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumerSettings {
    pub night_mode: NightModeSettings,
    /// Type badge visibility keyed by content type or bangumi subtype
    #[serde(alias = "labelConfig")]
    pub label_visibility: HashMap<String, bool>,
}

/// Synchronous per-consumer configuration lookup
pub trait ConsumerConfigSource: Send + Sync {
    /// Settings for `consumer_id`; `None` means defaults apply.
    fn settings(&self, consumer_id: &str) -> Option<ConsumerSettings>;
}

/// In-memory consumer configuration, typically loaded from a JSON object
/// keyed by consumer id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticConsumerConfig {
    consumers: HashMap<String, ConsumerSettings>,
}

impl StaticConsumerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, consumer_id: impl Into<String>, settings: ConsumerSettings) {
        self.consumers.insert(consumer_id.into(), settings);
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Config(format!("invalid consumer configuration: {}", e)))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }
}

impl ConsumerConfigSource for StaticConsumerConfig {
    fn settings(&self, consumer_id: &str) -> Option<ConsumerSettings> {
        self.consumers.get(consumer_id).cloned()
    }
}
