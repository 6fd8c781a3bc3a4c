use crate::rate_limit::AdaptiveTuning;
use std::time::Duration;
use tokio::time::Instant;

/// Per-domain request cadence state
///
/// One instance exists per observed domain; it is only mutated while the
/// rate limiter holds that domain's lock.
#[derive(Debug, Clone)]
pub struct DomainRateState {
    pub domain: String,

    /// Start time of the most recently reserved request slot
    pub last_request: Option<Instant>,

    /// Minimum spacing between requests to this domain
    pub current_delay: Duration,

    pub consecutive_successes: u32,

    pub consecutive_errors: u32,

    pub request_count: u64,
}

impl DomainRateState {
    pub fn new(domain: impl Into<String>, delay: Duration) -> Self {
        Self {
            domain: domain.into(),
            last_request: None,
            current_delay: delay,
            consecutive_successes: 0,
            consecutive_errors: 0,
            request_count: 0,
        }
    }

    /// Time the caller must still wait at `now`, if any
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_request?;
        let ready = last + self.current_delay;
        (ready > now).then(|| ready - now)
    }

    /// Reserves the next request slot and returns when it starts
    ///
    /// The slot is `max(now, last + delay)`; recording it before the caller
    /// sleeps keeps later callers queued behind it.
    pub fn reserve_slot(&mut self, now: Instant) -> Instant {
        let slot = match self.time_until_next_request(now) {
            Some(wait) => now + wait,
            None => now,
        };
        self.last_request = Some(slot);
        self.request_count += 1;
        slot
    }

    /// Records a successful response; relaxes the delay after a streak
    pub fn record_success(&mut self, tuning: &AdaptiveTuning) {
        self.consecutive_errors = 0;
        self.consecutive_successes += 1;

        if self.consecutive_successes >= tuning.success_threshold {
            self.current_delay = self
                .current_delay
                .mul_f64(tuning.recovery_factor)
                .max(tuning.min_delay);
            self.consecutive_successes = 0;
        }
    }

    /// Records a failed response; a 429 backs off immediately, other
    /// failures after `error_threshold` in a row
    pub fn record_failure(&mut self, tuning: &AdaptiveTuning, rate_limited: bool) {
        self.consecutive_successes = 0;
        self.consecutive_errors += 1;

        if rate_limited || self.consecutive_errors >= tuning.error_threshold {
            self.current_delay = self
                .current_delay
                .max(tuning.min_delay)
                .mul_f64(tuning.backoff_factor)
                .min(tuning.max_delay);
            self.consecutive_errors = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning() -> AdaptiveTuning {
        AdaptiveTuning {
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            recovery_factor: 0.9,
            success_threshold: 5,
            error_threshold: 3,
        }
    }

    #[test]
    fn test_first_request_is_immediate() {
        let state = DomainRateState::new("example.com", Duration::from_secs(1));
        assert!(state.time_until_next_request(Instant::now()).is_none());
    }

    #[test]
    fn test_reserve_slot_spaces_requests() {
        let mut state = DomainRateState::new("example.com", Duration::from_secs(1));
        let now = Instant::now();

        let first = state.reserve_slot(now);
        let second = state.reserve_slot(now);
        let third = state.reserve_slot(now + Duration::from_millis(200));

        assert_eq!(first, now);
        assert_eq!(second, now + Duration::from_secs(1));
        assert_eq!(third, now + Duration::from_secs(2));
        assert_eq!(state.request_count, 3);
    }

    #[test]
    fn test_slot_after_idle_period_is_now() {
        let mut state = DomainRateState::new("example.com", Duration::from_secs(1));
        let start = Instant::now();
        state.reserve_slot(start);

        let later = start + Duration::from_secs(5);
        assert_eq!(state.reserve_slot(later), later);
    }

    #[test]
    fn test_success_streak_relaxes_delay() {
        let mut state = DomainRateState::new("example.com", Duration::from_secs(2));
        let tuning = tuning();

        for _ in 0..4 {
            state.record_success(&tuning);
        }
        assert_eq!(state.current_delay, Duration::from_secs(2));

        state.record_success(&tuning);
        assert_eq!(state.current_delay, Duration::from_millis(1800));
        assert_eq!(state.consecutive_successes, 0);
    }

    #[test]
    fn test_delay_never_drops_below_floor() {
        let mut state = DomainRateState::new("example.com", Duration::from_millis(520));
        let tuning = tuning();
        for _ in 0..50 {
            state.record_success(&tuning);
        }
        assert_eq!(state.current_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_rate_limit_backs_off_immediately() {
        let mut state = DomainRateState::new("example.com", Duration::from_secs(1));
        state.consecutive_successes = 3;

        state.record_failure(&tuning(), true);
        assert_eq!(state.current_delay, Duration::from_secs(2));
        assert_eq!(state.consecutive_successes, 0);
    }

    #[test]
    fn test_errors_back_off_after_threshold() {
        let mut state = DomainRateState::new("example.com", Duration::from_secs(1));
        let tuning = tuning();

        state.record_failure(&tuning, false);
        state.record_failure(&tuning, false);
        assert_eq!(state.current_delay, Duration::from_secs(1));

        state.record_failure(&tuning, false);
        assert_eq!(state.current_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_capped_at_ceiling() {
        let mut state = DomainRateState::new("example.com", Duration::from_secs(8));
        state.record_failure(&tuning(), true);
        assert_eq!(state.current_delay, Duration::from_secs(10));
    }
}
