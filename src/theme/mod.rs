//! Theme/viewport engine.
//!
//! Given a content type, its payload, the consumer's settings and the current
//! time, deterministically derives the viewport, the night-mode flag and the
//! card palette. The only time source is the injected [`Clock`].

mod palette;
mod style;
mod viewport;

pub use palette::{
    adjust_brightness, calculate_colors, generic_type_config, type_config,
    type_config_for_name, BadgeFill, BadgeStyle, GradientStop, HexColor, ThemeSpec, TypeConfig,
};
pub use style::{help_stylesheet, list_gradient, stylesheet, subscription_stylesheet};
pub use viewport::{
    calculate_viewport, ViewportSpec, DEVICE_SCALE_FACTOR, INITIAL_HEIGHT, MIN_WIDTH,
};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConsumerSettings, NightMode, NightModeSettings};
use crate::payload::ContentType;
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use log::warn;
use serde_json::Value;
use std::sync::Arc;

/// Parse `HH:MM` into minutes after midnight.
fn minutes_of_day(raw: &str) -> Option<u32> {
    let (h, m) = raw.trim().split_once(':')?;
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}

/// Whether night mode applies at `now`.
///
/// `on`/`off` short-circuit. `timed` checks membership of the current minute
/// in `[start, end)`; when the window wraps midnight (start > end, e.g.
/// 21:00–06:00) the rule is `now >= start || now < end`. Unparseable times
/// fall back to day mode.
pub fn is_night_mode(settings: &NightModeSettings, now: &DateTime<Tz>) -> bool {
    match settings.mode {
        NightMode::On => true,
        NightMode::Off => false,
        NightMode::Timed => {
            let (start, end) = match (
                minutes_of_day(&settings.start_time),
                minutes_of_day(&settings.end_time),
            ) {
                (Some(s), Some(e)) => (s, e),
                _ => {
                    warn!(
                        "Invalid night-mode window {:?}-{:?}; using day mode",
                        settings.start_time, settings.end_time
                    );
                    return false;
                }
            };
            let current = now.hour() * 60 + now.minute();
            if start < end {
                current >= start && current < end
            } else {
                current >= start || current < end
            }
        }
    }
}

/// Everything derived for one card before a surface is touched
#[derive(Debug, Clone)]
pub struct CardTheme {
    pub viewport: ViewportSpec,
    pub type_config: TypeConfig,
    pub spec: ThemeSpec,
}

/// Derives themes against an injectable clock and a reference timezone
#[derive(Clone)]
pub struct ThemeEngine {
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl ThemeEngine {
    pub fn new(clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self { clock, timezone }
    }

    /// Current time in the reference timezone
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.timezone)
    }

    pub fn is_night_mode(&self, settings: Option<&ConsumerSettings>) -> bool {
        match settings {
            Some(s) => is_night_mode(&s.night_mode, &self.now()),
            None => false,
        }
    }

    pub fn derive(
        &self,
        kind: ContentType,
        payload: &Value,
        settings: Option<&ConsumerSettings>,
    ) -> CardTheme {
        let viewport = calculate_viewport(kind, payload);
        let is_night = self.is_night_mode(settings);
        let type_config = type_config(kind, payload);
        let spec = calculate_colors(kind, payload, &type_config, is_night);
        CardTheme {
            viewport,
            type_config,
            spec,
        }
    }
}

impl Default for ThemeEngine {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), chrono_tz::Asia::Shanghai)
    }
}

impl std::fmt::Debug for ThemeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEngine")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::TimeZone;
    use chrono_tz::Asia::Shanghai;

    fn timed(start: &str, end: &str) -> NightModeSettings {
        NightModeSettings {
            mode: NightMode::Timed,
            start_time: start.into(),
            end_time: end.into(),
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Tz> {
        Shanghai.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    #[test]
    fn wraparound_window() {
        let s = timed("21:00", "06:00");
        assert!(is_night_mode(&s, &at(23, 0)));
        assert!(is_night_mode(&s, &at(2, 0)));
        assert!(is_night_mode(&s, &at(21, 0)));
        assert!(!is_night_mode(&s, &at(6, 0)));
        assert!(!is_night_mode(&s, &at(12, 0)));
    }

    #[test]
    fn same_day_window() {
        let s = timed("13:30", "15:00");
        assert!(!is_night_mode(&s, &at(13, 29)));
        assert!(is_night_mode(&s, &at(13, 30)));
        assert!(!is_night_mode(&s, &at(15, 0)));
    }

    #[test]
    fn explicit_modes_short_circuit() {
        let mut s = timed("bogus", "06:00");
        assert!(!is_night_mode(&s, &at(23, 0)));
        s.mode = NightMode::On;
        assert!(is_night_mode(&s, &at(12, 0)));
        s.mode = NightMode::Off;
        assert!(!is_night_mode(&s, &at(23, 0)));
    }

    #[test]
    fn engine_reads_clock_in_reference_timezone() {
        // 15:00 UTC is 23:00 in Shanghai
        let utc = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
        let engine = ThemeEngine::new(Arc::new(FixedClock(utc)), Shanghai);
        let settings = ConsumerSettings {
            night_mode: timed("21:00", "06:00"),
            ..Default::default()
        };
        assert!(engine.is_night_mode(Some(&settings)));
        assert!(!engine.is_night_mode(None));

        let theme = engine.derive(ContentType::Video, &serde_json::json!({}), Some(&settings));
        assert!(theme.spec.is_night);
        assert_eq!(theme.viewport.width, 1000);
        assert_eq!(theme.type_config.label, "视频");
    }
}
