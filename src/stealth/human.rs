use std::time::Duration;

/// Randomized post-response pause
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanDelay {
    base: Duration,
}

impl HumanDelay {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    pub fn is_enabled(&self) -> bool {
        !self.base.is_zero()
    }

    /// `base * uniform(0.8, 1.2)`, or zero when disabled
    pub fn sample(&self) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        self.base.mul_f64(rand::random_range(0.8..1.2))
    }

    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
