//! Formatter layer: pure conversions from raw payload values to display text.
//!
//! Nothing here performs I/O or reads the clock; callers pass "now" in.

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape text and turn line breaks into `<br>`.
pub fn escape_multiline(raw: &str) -> String {
    escape_html(raw).replace('\n', "<br>")
}

/// Seconds to `H:MM:SS` (or `M:SS` under an hour). Zero yields an empty string.
pub fn format_duration(seconds: u64) -> String {
    if seconds == 0 {
        return String::new();
    }
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

/// Compact count: `1.2万`, `3.45亿`, or the plain integer below ten thousand.
pub fn format_number(n: u64) -> String {
    if n >= 100_000_000 {
        format!("{:.2}亿", n as f64 / 100_000_000.0)
    } else if n >= 10_000 {
        format!("{:.1}万", n as f64 / 10_000.0)
    } else {
        n.to_string()
    }
}

/// Relative publish time for a unix timestamp (seconds), evaluated in the
/// timezone of `now`.
///
/// Same year: `刚刚`, `N分钟前`, `N小时前` (same calendar day), `昨天 HH:MM`,
/// `前天 HH:MM`, then `MM月DD日 HH:MM`. Other years get the full date.
pub fn format_pub_time(timestamp: i64, now: &DateTime<Tz>) -> String {
    if timestamp <= 0 {
        return String::new();
    }
    let tz = now.timezone();
    let date = match tz.timestamp_opt(timestamp, 0).single() {
        Some(d) => d,
        None => return timestamp.to_string(),
    };
    relative_time(&date, now)
}

/// Publish time supplied as text. Recognised absolute formats are reformatted
/// relative to `now`; anything else is returned unchanged.
pub fn format_pub_time_text(text: &str, now: &DateTime<Tz>) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(secs) = trimmed.parse::<i64>() {
        return format_pub_time(secs, now);
    }
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y年%m月%d日 %H:%M",
        "%Y/%m/%d %H:%M",
    ];
    let tz = now.timezone();
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            if let Some(local) = tz.from_local_datetime(&naive).earliest() {
                return relative_time(&local, now);
            }
        }
    }
    trimmed.to_string()
}

fn relative_time(date: &DateTime<Tz>, now: &DateTime<Tz>) -> String {
    use chrono::Datelike;

    if date.year() != now.year() {
        return date.format("%Y年%m月%d日 %H:%M").to_string();
    }

    let diff = now.signed_duration_since(*date);
    let minutes = diff.num_minutes();
    if minutes < 1 {
        return "刚刚".to_string();
    }
    if minutes < 60 {
        return format!("{}分钟前", minutes);
    }

    let days = (now.date_naive() - date.date_naive()).num_days();
    match days {
        0 => format!("{}小时前", diff.num_hours()),
        1 => format!("昨天 {}", date.format("%H:%M")),
        2 => format!("前天 {}", date.format("%H:%M")),
        _ => date.format("%m月%d日 %H:%M").to_string(),
    }
}

/// Cut `text` to at most `max_chars` characters, appending `…` when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
