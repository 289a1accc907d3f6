//! Wall-clock helpers.

use chrono::Utc;

/// Current unix time in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current unix time in fractional seconds
pub fn now_secs_f64() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
