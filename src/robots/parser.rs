//! robots.txt rules, backed by the robotstxt crate's matcher

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Rules from one robots.txt file
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw file content; empty means everything is allowed
    content: String,
}

impl RobotsRules {
    pub fn parse(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules used when robots.txt is missing or unreachable
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_allow_all(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Checks a full URL against the rules for `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// `Crawl-delay` for `user_agent`, preferring its own group over `*`
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut reading_agents = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive user-agent lines share a group
                if !reading_agents {
                    group.clear();
                }
                group.push(value.to_lowercase());
                reading_agents = true;
                continue;
            }
            reading_agents = false;

            if key != "crawl-delay" {
                continue;
            }
            let Some(delay) = value
                .parse::<f64>()
                .ok()
                .filter(|d| *d >= 0.0)
                .map(|d| Duration::try_from_secs_f64(d).unwrap_or(Duration::MAX))
            else {
                continue;
            };

            if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                specific = Some(delay);
            } else if group.iter().any(|ua| ua == "*") {
                wildcard = Some(delay);
            }
        }

        specific.or(wildcard)
    }
}
