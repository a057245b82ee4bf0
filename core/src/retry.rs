use std::time::Duration;

/// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating at `Duration::MAX`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u32::MAX);
    base.saturating_mul(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_per_attempt() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4000));
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        assert_eq!(backoff_delay(Duration::MAX, 2), Duration::MAX);
        assert_eq!(
            backoff_delay(Duration::from_secs(1), 64),
            Duration::from_secs(u64::from(u32::MAX))
        );
    }
}
