//! Wall-clock helpers for timestamps exchanged over the wire.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic_enough() {
        let first = now_ms();
        std::thread::sleep(Duration::from_millis(2));
        let second = now_ms();
        assert!(second > first);
    }
}
