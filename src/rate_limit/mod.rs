//! Per-domain request cadence
//!
//! `RateLimiter::wait_if_needed` spaces requests to the same domain by that
//! domain's required delay. Concurrent callers for one domain are queued into
//! successive slots; callers for different domains never wait on each other.
//! The adaptive variant tunes each domain's delay from response feedback.

use crate::config::RateLimitConfig;
use crate::state::DomainRateState;
use crate::url::matches_wildcard;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Bounds and factors for adaptive delay tuning
#[derive(Debug, Clone)]
pub struct AdaptiveTuning {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub recovery_factor: f64,
    pub success_threshold: u32,
    pub error_threshold: u32,
}

impl Default for AdaptiveTuning {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for AdaptiveTuning {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_factor: config.backoff_factor,
            recovery_factor: config.recovery_factor,
            success_threshold: config.success_threshold.max(1),
            error_threshold: config.error_threshold.max(1),
        }
    }
}

#[derive(Debug, Default)]
struct LimiterState {
    overrides: HashMap<String, Duration>,
    wildcard_overrides: Vec<(String, Duration)>,
    domains: HashMap<String, DomainRateState>,
}

/// Enforces a minimum interval between requests to each domain
///
/// Owned by one crawl engine and shared by its workers through an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    default_delay: Duration,
    /// Ceiling for delays imposed from outside the config, e.g. robots.txt
    max_delay: Duration,
    adaptive: Option<AdaptiveTuning>,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Creates a fixed-delay limiter
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            max_delay: Duration::from_millis(RateLimitConfig::default().max_delay_ms)
                .max(default_delay),
            adaptive: None,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Creates a limiter whose per-domain delay follows response feedback
    pub fn adaptive(default_delay: Duration, tuning: AdaptiveTuning) -> Self {
        Self {
            max_delay: tuning.max_delay,
            adaptive: Some(tuning),
            ..Self::new(default_delay)
        }
    }

    /// Builds a limiter from configuration, including domain overrides
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let default_delay = Duration::from_millis(config.default_delay_ms);
        let limiter = if config.adaptive {
            Self::adaptive(default_delay, AdaptiveTuning::from(config))
        } else {
            Self::new(default_delay).with_max_delay(Duration::from_millis(config.max_delay_ms))
        };

        for entry in &config.domains {
            limiter.set_domain_delay(&entry.domain, Duration::from_millis(entry.delay_ms));
        }

        limiter
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Builder-style domain override
    pub fn with_domain_delay(self, domain: &str, delay: Duration) -> Self {
        self.set_domain_delay(domain, delay);
        self
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overrides the delay for a domain (`*.example.com` covers subdomains)
    ///
    /// An already-tracked domain adopts the new delay immediately.
    pub fn set_domain_delay(&self, domain: &str, delay: Duration) {
        let domain = domain.to_lowercase();
        let mut state = self.lock();

        if domain.starts_with("*.") {
            state.wildcard_overrides.retain(|(pattern, _)| *pattern != domain);
            state.wildcard_overrides.push((domain.clone(), delay));
            for (name, tracked) in state.domains.iter_mut() {
                if matches_wildcard(&domain, name) {
                    tracked.current_delay = delay;
                }
            }
        } else {
            if let Some(tracked) = state.domains.get_mut(&domain) {
                tracked.current_delay = delay;
            }
            state.overrides.insert(domain, delay);
        }
    }

    /// Raises a domain's delay to at least `delay`, e.g. from robots.txt
    ///
    /// `delay` is clamped to `max_delay` first.
    pub fn ensure_minimum_delay(&self, domain: &str, delay: Duration) {
        let delay = delay.min(self.max_delay);
        if self.required_delay(domain) < delay {
            info!("Raising delay for {} to {:?}", domain, delay);
            self.set_domain_delay(domain, delay);
        }
    }

    /// Configured (non-adaptive) delay for a domain
    pub fn configured_delay(&self, domain: &str) -> Duration {
        let state = self.lock();
        Self::configured_delay_locked(&state, self.default_delay, domain)
    }

    fn configured_delay_locked(state: &LimiterState, default: Duration, domain: &str) -> Duration {
        if let Some(delay) = state.overrides.get(domain) {
            return *delay;
        }
        state
            .wildcard_overrides
            .iter()
            .find(|(pattern, _)| matches_wildcard(pattern, domain))
            .map(|(_, delay)| *delay)
            .unwrap_or(default)
    }

    /// Delay currently enforced for a domain
    pub fn required_delay(&self, domain: &str) -> Duration {
        let state = self.lock();
        match state.domains.get(domain) {
            Some(tracked) => tracked.current_delay,
            None => Self::configured_delay_locked(&state, self.default_delay, domain),
        }
    }

    /// Waits until a request to `domain` is allowed and returns the time waited
    ///
    /// The slot is reserved under the lock and the sleep happens after it is
    /// released, so no lock is held while waiting.
    pub async fn wait_if_needed(&self, domain: &str) -> Duration {
        let now = Instant::now();
        let slot = {
            let mut state = self.lock();
            let default = self.default_delay;
            if !state.domains.contains_key(domain) {
                let delay = Self::configured_delay_locked(&state, default, domain);
                state
                    .domains
                    .insert(domain.to_string(), DomainRateState::new(domain, delay));
            }
            match state.domains.get_mut(domain) {
                Some(tracked) => tracked.reserve_slot(now),
                None => now,
            }
        };

        if slot > now {
            let wait = slot - now;
            debug!("Rate limiting {} for {:?}", domain, wait);
            tokio::time::sleep_until(slot).await;
            wait
        } else {
            Duration::ZERO
        }
    }

    /// Feeds a successful response back into the adaptive delay
    pub fn record_success(&self, domain: &str) {
        let Some(tuning) = &self.adaptive else {
            return;
        };
        if let Some(tracked) = self.lock().domains.get_mut(domain) {
            tracked.record_success(tuning);
        }
    }

    /// Feeds a failed response back into the adaptive delay
    pub fn record_failure(&self, domain: &str, rate_limited: bool) {
        let Some(tuning) = &self.adaptive else {
            return;
        };
        if let Some(tracked) = self.lock().domains.get_mut(domain) {
            let before = tracked.current_delay;
            tracked.record_failure(tuning, rate_limited);
            if tracked.current_delay != before {
                info!(
                    "Increased delay for {} from {:?} to {:?}",
                    domain, before, tracked.current_delay
                );
            }
        }
    }

    /// Snapshot of a domain's cadence state
    pub fn domain_state(&self, domain: &str) -> Option<DomainRateState> {
        self.lock().domains.get(domain).cloned()
    }

    /// Number of domains seen so far
    pub fn tracked_domains(&self) -> usize {
        self.lock().domains.len()
    }
}
