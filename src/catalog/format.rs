//! Display labels for catalog records

use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

fn duration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?").expect("static regex")
    })
}

/// Format an ISO-8601 duration (`PT1H2M3S`) as `1:02:03`, or `M:SS` under an hour
pub fn format_duration(iso: Option<&str>) -> String {
    let Some(iso) = iso.filter(|s| !s.is_empty()) else {
        return "N/A".to_string();
    };
    if iso == "P0D" {
        return "LIVE".to_string();
    }
    let Some(caps) = duration_regex().captures(iso) else {
        return "N/A".to_string();
    };
    let part = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, seconds) = (part(1), part(2), part(3));

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Duration label taking live and upcoming broadcasts into account
pub fn duration_label(duration: Option<&str>, live_broadcast: Option<&str>) -> String {
    match (duration, live_broadcast) {
        (_, Some("live")) | (Some("P0D"), _) => "LIVE".to_string(),
        (_, Some("upcoming")) => "Upcoming".to_string(),
        (Some("PT0S"), _) => "0:00".to_string(),
        (Some(d), _) => format_duration(Some(d)),
        (None, _) => "N/A".to_string(),
    }
}

/// Format a view count as `987 views`, `1.2K views`, `3.4M views` or `5.6B views`
pub fn format_view_count(raw: Option<&str>) -> String {
    let Some(views) = raw.and_then(|s| s.trim().parse::<u64>().ok()) else {
        return "N/A views".to_string();
    };
    let v = views as f64;
    if views >= 1_000_000_000 {
        format!("{:.1}B views", v / 1_000_000_000.0)
    } else if views >= 1_000_000 {
        format!("{:.1}M views", v / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K views", v / 1_000.0)
    } else {
        format!("{views} views")
    }
}

/// Relative distance between `then` and `now` in the largest whole unit
///
/// Each unit's value is rounded before picking the unit, so 45 seconds reads
/// as "45 seconds ago" and 59.6 minutes as "1 hour ago".
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(then).num_seconds();
    let secs = delta.unsigned_abs() as f64;

    let round = |value: f64| value.round() as u64;
    let minutes = round(secs / 60.0);
    let hours = round(secs / 3600.0);
    let days = round(secs / 86_400.0);
    let months = round(secs / (86_400.0 * 30.0));
    let years = round(secs / (86_400.0 * 365.0));

    let (value, unit) = if secs < 60.0 {
        (secs as u64, "second")
    } else if minutes < 60 {
        (minutes, "minute")
    } else if hours < 24 {
        (hours, "hour")
    } else if days < 30 {
        (days, "day")
    } else if months < 12 {
        (months, "month")
    } else {
        (years, "year")
    };

    let plural = if value == 1 { "" } else { "s" };
    if delta >= 0 {
        format!("{value} {unit}{plural} ago")
    } else {
        format!("in {value} {unit}{plural}")
    }
}

/// Relative upload date label for an RFC 3339 timestamp
pub fn format_upload_date(published_at: Option<&str>, now: DateTime<Utc>) -> String {
    published_at
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|then| format_relative(then.with_timezone(&Utc), now))
        .unwrap_or_else(|| "Unknown date".to_string())
}

/// Pull the channel reference out of a channel URL
///
/// Recognises `/@handle` (returned with its `@`), `/channel/<id>` and
/// `/user/<name>`.
pub fn extract_channel_handle(channel_url: &str) -> Option<String> {
    let url = url::Url::parse(channel_url).ok()?;
    let mut parts = url.path_segments()?.filter(|s| !s.is_empty());
    let first = parts.next()?;

    if first.starts_with('@') && first.len() > 1 {
        return Some(first.to_string());
    }
    match (first, parts.next()) {
        ("channel", Some(id)) | ("user", Some(id)) => Some(id.to_string()),
        _ => None,
    }
}
