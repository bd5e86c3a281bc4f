use chrono::{DateTime, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as i64)
    .unwrap_or_default()
}

/// Absolute date, e.g. `Tue Nov 14 2023 10:13:20 PM` (UTC).
pub fn format_date(timestamp_ms: i64) -> String {
  match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
    Some(dt) => dt.format("%a %b %-d %Y %I:%M:%S %p").to_string(),
    None => "an unknown date".to_string(),
  }
}

/// Coarse relative time from `timestamp_ms` to `now_ms`, using the largest whole unit.
pub fn format_relative(timestamp_ms: i64, now_ms: i64) -> String {
  const UNITS: [(i64, &str); 6] = [
    (365 * 24 * 3600, "year"),
    (30 * 24 * 3600, "month"),
    (7 * 24 * 3600, "week"),
    (24 * 3600, "day"),
    (3600, "hour"),
    (60, "minute"),
  ];

  let seconds = now_ms.saturating_sub(timestamp_ms) / 1000;
  if seconds < 0 {
    return "in the future".to_string();
  }

  for (unit_secs, name) in UNITS {
    let n = seconds / unit_secs;
    if n >= 1 {
      let plural = if n == 1 { "" } else { "s" };
      return format!("{n} {name}{plural} ago");
    }
  }
  "just now".to_string()
}
