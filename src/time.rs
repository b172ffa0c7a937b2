use chrono::{DateTime, Utc};

/// Milliseconds from `sent` to `received` as a float with microsecond precision.
///
/// Wall-clock steps backwards are reported as zero rather than a negative RTT.
///
/// ```
/// use chrono::{Duration, Utc};
/// use ndn_ping::time::rtt_millis;
/// let sent = Utc::now();
/// let rtt = rtt_millis(sent, sent + Duration::microseconds(1500));
/// assert_eq!(rtt, 1.5);
/// ```
pub fn rtt_millis(sent: DateTime<Utc>, received: DateTime<Utc>) -> f64 {
    let delta = received.signed_duration_since(sent);
    let micros = delta
        .num_microseconds()
        .unwrap_or_else(|| delta.num_milliseconds().saturating_mul(1000));
    (micros.max(0) as f64) / 1000.0
}

/// Whole milliseconds elapsed from `start` to `now`.
pub fn elapsed_millis(start: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(start).num_milliseconds()
}
