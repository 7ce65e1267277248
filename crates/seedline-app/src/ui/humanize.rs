//! Compact human-readable renderings of sizes, rates, ratios, and durations.

const UNITS: [&str; 9] = ["B", "K", "M", "G", "T", "P", "E", "Z", "Y"];

/// ETA values at or beyond this many seconds (100 days) render as unknown.
const ETA_UNKNOWN_SECS: u64 = 8_640_000;
const INFINITY: &str = "∞";

/// `1536` renders as `1.5 K`; whole values drop the decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub(crate) fn bytes(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    let rendered = format!("{value:.1}");
    let rendered = rendered.strip_suffix(".0").unwrap_or(&rendered);
    format!("{rendered} {}", UNITS[unit])
}

/// Transfer rate in bytes per second.
#[must_use]
pub(crate) fn rate(bytes_per_second: u64) -> String {
    format!("{}/s", bytes(bytes_per_second))
}

/// Ratio in `[0.0, 1.0]` as a percentage with one decimal.
#[must_use]
pub(crate) fn percentage(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Remaining time in the coarse form the daemon's own UI uses.
#[must_use]
pub(crate) fn eta(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds.filter(|secs| *secs < ETA_UNKNOWN_SECS) else {
        return INFINITY.to_string();
    };
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    match seconds {
        0 => "0s".to_string(),
        1..60 => "< 1m".to_string(),
        _ if hours == 0 => format!("{minutes}m"),
        _ if days == 0 => format!("{hours}h {}m", minutes % 60),
        _ => format!("{days}d {}h", hours % 24),
    }
}
