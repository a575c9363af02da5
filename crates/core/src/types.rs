/// Opaque identifier of one tracked job.
pub type JobId = String;

/// Epoch milliseconds, as written by the producing process.
pub type TimestampMs = i64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
