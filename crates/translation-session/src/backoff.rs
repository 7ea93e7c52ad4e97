use std::time::Duration;

/// Exponential backoff starting at 1s, doubling, capped at 30s, for up to
/// 5 attempts (spec.md §4.3 Reconnect).
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// The sleep duration before reconnect attempt number `attempt` (1-indexed).
pub fn backoff_for_attempt(attempt: u32) -> Duration {
    let doublings = attempt.saturating_sub(1).min(10);
    let millis = INITIAL_BACKOFF.as_millis().saturating_mul(1u128 << doublings);
    Duration::from_millis(millis.min(MAX_BACKOFF.as_millis()) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_the_cap() {
        assert_eq!(backoff_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff_for_attempt(3), Duration::from_secs(4));
        assert_eq!(backoff_for_attempt(4), Duration::from_secs(8));
        assert_eq!(backoff_for_attempt(5), Duration::from_secs(16));
        assert_eq!(backoff_for_attempt(6), Duration::from_secs(30));
        assert_eq!(backoff_for_attempt(100), Duration::from_secs(30));
    }
}
