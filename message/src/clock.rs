use std::time::{SystemTime, UNIX_EPOCH};

// unix_ms returns the wall clock as unix milliseconds. BitSeal handshake
// timestamps are millisecond-granular.
pub fn unix_ms() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    elapsed.as_millis() as i64
}

// unix_s returns the wall clock as unix seconds. Token iat/exp claims are
// second-granular, unlike the handshake timestamps.
pub fn unix_s() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    elapsed.as_secs() as i64
}
