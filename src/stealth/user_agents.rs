use std::sync::{Mutex, PoisonError};

/// Built-in desktop browser user agents
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

#[derive(Debug)]
struct Rotation {
    current: usize,
    served: u32,
}

/// Hands out user agents, switching every `rotate_every` requests
///
/// A rotation never picks the agent that was just in use when the pool has
/// more than one entry.
#[derive(Debug)]
pub struct UserAgentRotator {
    pool: Vec<String>,
    rotate_every: u32,
    rotation: Mutex<Rotation>,
}

impl UserAgentRotator {
    pub fn new(pool: Vec<String>, rotate_every: u32) -> Self {
        let pool = if pool.is_empty() {
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()
        } else {
            pool
        };
        let current = rand::random_range(0..pool.len());

        Self {
            pool,
            rotate_every: rotate_every.max(1),
            rotation: Mutex::new(Rotation { current, served: 0 }),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    /// Returns the user agent for the next request
    pub fn next_user_agent(&self) -> String {
        let mut rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);

        if rotation.served >= self.rotate_every {
            rotation.served = 0;
            if self.pool.len() > 1 {
                // Shift by 1..len so the new index always differs
                let shift = rand::random_range(1..self.pool.len());
                rotation.current = (rotation.current + shift) % self.pool.len();
            }
        }

        rotation.served += 1;
        self.pool[rotation.current].clone()
    }
}
