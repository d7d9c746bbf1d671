use std::time::Duration;

/// Exponential backoff schedule for retrying transient failures.
///
/// Each consumed delay doubles the next one (1s, 2s, 4s, 8s, ...).
/// The schedule has no upper bound; the doubling saturates at
/// `Duration::MAX` rather than overflowing.
#[derive(Debug, Clone)]
pub struct Backoff {
    delay: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self { delay: initial }
    }

    /// The wait to apply for the failure that just happened.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay;
        self.delay = self.delay.saturating_mul(2);
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_each_failure() {
        let mut backoff = Backoff::new(Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.next_delay(), Duration::from_secs(8));
    }

    #[test]
    fn test_total_wait_is_the_geometric_sum() {
        // Four failures before a success on the fifth attempt.
        let mut backoff = Backoff::new(Duration::from_secs(1));
        let waited: Duration = (0..4).map(|_| backoff.next_delay()).sum();
        assert_eq!(waited, Duration::from_secs(15));
    }

    #[test]
    fn test_custom_initial_delay() {
        let mut backoff = Backoff::new(Duration::from_millis(250));
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
    }
}
