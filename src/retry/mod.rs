//! Retry and backoff policy
//!
//! Classifies each attempt's outcome and decides whether to retry and how
//! long to wait first. Throttling (HTTP 429) has its own retry budget and
//! honors the server's `Retry-After` header.

use crate::config::{BackoffStrategy, RetryConfig};
use crate::ErrorKind;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Range of the randomized multiplier that desynchronizes workers
const HUMAN_VARIANCE: (f64, f64) = (0.8, 1.2);

/// Result of one network attempt, as seen by the policy
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    /// Timeout, connection reset, DNS failure
    Transient,
    /// HTTP 429 with the parsed `Retry-After`, if any
    RateLimited { retry_after: Option<Duration> },
    /// HTTP 5xx
    ServerError(u16),
    /// HTTP 4xx other than 429, and other non-retryable statuses
    ClientError(u16),
}

impl Outcome {
    /// Classifies an HTTP status code
    pub fn from_status(status: u16, retry_after: Option<Duration>) -> Self {
        match status {
            200..=399 => Outcome::Success,
            429 => Outcome::RateLimited { retry_after },
            500..=599 => Outcome::ServerError(status),
            _ => Outcome::ClientError(status),
        }
    }
}

/// What the caller should do next
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Done,
    Retry(Duration),
    GiveUp(ErrorKind),
}

/// Attempt counters for one logical fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub retries: u32,
    pub rate_limit_retries: u32,
}

impl RetryState {
    pub fn total_retries(&self) -> u32 {
        self.retries + self.rate_limit_retries
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Exponential backoff with jitter and a separate 429 budget
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub rate_limit_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the delay added or removed at random (0.0-1.0)
    pub jitter_factor: f64,
    /// Multiplier applied to a server's `Retry-After`
    pub retry_after_buffer: f64,
    pub strategy: BackoffStrategy,
    /// Apply the 0.8-1.2x randomized multiplier
    pub human_variance: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            rate_limit_retries: config.rate_limit_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            jitter_factor: config.jitter,
            retry_after_buffer: config.retry_after_buffer,
            strategy: config.strategy,
            human_variance: true,
        }
    }

    /// Policy with every random component disabled
    pub fn deterministic(self) -> Self {
        Self {
            jitter_factor: 0.0,
            human_variance: false,
            ..self
        }
    }

    /// `min(max_delay, base_delay * multiplier^attempt)`
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Exponential backoff with jitter and human-like variance
    ///
    /// The result is clamped to `[base_delay, max_delay]`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let mut secs = self.base_backoff(attempt).as_secs_f64();

        if self.jitter_factor > 0.0 && secs > 0.0 {
            let range = secs * self.jitter_factor;
            secs += rand::random_range(-range..range);
        }

        if self.human_variance {
            secs *= rand::random_range(HUMAN_VARIANCE.0..HUMAN_VARIANCE.1);
        }

        let secs = secs
            .max(self.base_delay.as_secs_f64())
            .min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Decorrelated jitter: attempt 0 waits `base`, later attempts draw from
    /// `[base, 3 * base * multiplier^(attempt-1)]`
    pub fn decorrelated(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.base_delay;
        }

        let base = self.base_delay.as_secs_f64();
        let upper = (base * 3.0 * self.multiplier.powi(attempt as i32 - 1))
            .min(self.max_delay.as_secs_f64());
        let secs = if upper > base {
            rand::random_range(base..upper)
        } else {
            base
        };
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before retry number `attempt` under the configured strategy
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Exponential => self.backoff(attempt),
            BackoffStrategy::Decorrelated => self.decorrelated(attempt),
        }
    }

    /// Delay before retrying a 429: at least `Retry-After * buffer`
    ///
    /// The server's share is capped at `max_delay * buffer`.
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let computed = self.retry_delay(attempt);
        let Some(server) = retry_after else {
            return computed;
        };
        let ceiling = self.max_delay.as_secs_f64() * self.retry_after_buffer;
        let secs = (server.as_secs_f64() * self.retry_after_buffer).min(ceiling);
        computed.max(Duration::try_from_secs_f64(secs).unwrap_or(self.max_delay))
    }

    /// A `Retry-After` longer than `max_delay` is not worth waiting for
    fn exceeds_ceiling(&self, retry_after: Option<Duration>) -> bool {
        retry_after.is_some_and(|after| after > self.max_delay)
    }

    /// Decides the next step after an attempt and advances the counters
    pub fn decide(&self, outcome: &Outcome, state: &mut RetryState) -> RetryDecision {
        match outcome {
            Outcome::Success => {
                state.reset();
                RetryDecision::Done
            }
            Outcome::Transient | Outcome::ServerError(_) => {
                if state.retries < self.max_retries {
                    let delay = self.retry_delay(state.retries);
                    state.retries += 1;
                    RetryDecision::Retry(delay)
                } else {
                    RetryDecision::GiveUp(ErrorKind::Network)
                }
            }
            Outcome::RateLimited { retry_after } => {
                if state.rate_limit_retries < self.rate_limit_retries
                    && !self.exceeds_ceiling(*retry_after)
                {
                    let delay = self.rate_limit_delay(state.rate_limit_retries, *retry_after);
                    state.rate_limit_retries += 1;
                    RetryDecision::Retry(delay)
                } else {
                    RetryDecision::GiveUp(ErrorKind::RateLimit)
                }
            }
            Outcome::ClientError(_) => RetryDecision::GiveUp(ErrorKind::Network),
        }
    }
}

/// Parses a `Retry-After` value: delay-seconds or an HTTP date
///
/// Values too large for a `Duration` saturate to `Duration::MAX`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<f64>() {
        if secs.is_nan() || secs < 0.0 {
            return None;
        }
        return Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
