//! Browser impersonation for outgoing requests
//!
//! - `UserAgentRotator`: rotates through a pool of real browser user agents
//! - `browser_headers`: builds the header set a browser with that agent sends
//! - `HumanDelay`: optional randomized pause after each response

mod headers;
mod human;
mod user_agents;

pub use headers::{browser_headers, BrowserKind};
pub use human::HumanDelay;
pub use user_agents::{UserAgentRotator, DEFAULT_USER_AGENTS};

use crate::config::StealthConfig;
use std::time::Duration;

/// Produces per-request headers according to the stealth configuration
#[derive(Debug)]
pub struct StealthProfile {
    rotator: Option<UserAgentRotator>,
    identity: String,
    human_delay: HumanDelay,
}

impl StealthProfile {
    /// `identity` is sent as the user agent when stealth is disabled
    pub fn from_config(config: &StealthConfig, identity: &str) -> Self {
        Self {
            rotator: config
                .enabled
                .then(|| UserAgentRotator::new(config.user_agents.clone(), config.rotate_every)),
            identity: identity.to_string(),
            human_delay: HumanDelay::new(Duration::from_millis(config.human_delay_ms)),
        }
    }

    /// A profile that identifies honestly and never pauses
    pub fn plain(identity: &str) -> Self {
        Self {
            rotator: None,
            identity: identity.to_string(),
            human_delay: HumanDelay::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.rotator.is_some()
    }

    pub fn human_delay(&self) -> HumanDelay {
        self.human_delay
    }

    pub fn headers_for(&self, referer: Option<&str>) -> Vec<(String, String)> {
        match &self.rotator {
            Some(rotator) => browser_headers(&rotator.next_user_agent(), referer),
            None => {
                let mut headers = vec![("User-Agent".to_string(), self.identity.clone())];
                if let Some(referer) = referer {
                    headers.push(("Referer".to_string(), referer.to_string()));
                }
                headers
            }
        }
    }
}
