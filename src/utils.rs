/// Wall-clock epoch time in milliseconds.
#[must_use]
pub fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
