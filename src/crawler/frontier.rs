//! Crawl frontier and visited set
//!
//! Everything here runs under the caller's lock. Claiming a URL and marking
//! it visited is one operation, so no two workers ever fetch the same URL.

use crate::state::{EngineState, PageState};
use std::collections::{HashMap, VecDeque};
use url::Url;

/// Anchor text and surrounding text of the link a target was found through
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkOrigin {
    pub text: String,
    pub context: String,
    /// Page the link appeared on
    pub referer: String,
}

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlTarget {
    /// Normalized URL; its string form is the target's identity
    pub url: Url,
    pub depth: u32,
    /// None for the seed
    pub origin: Option<LinkOrigin>,
}

impl CrawlTarget {
    pub fn seed(url: Url) -> Self {
        Self {
            url,
            depth: 0,
            origin: None,
        }
    }

    pub fn key(&self) -> &str {
        self.url.as_str()
    }

    pub fn referer(&self) -> Option<&str> {
        self.origin.as_ref().map(|o| o.referer.as_str())
    }
}

/// Answer to a worker asking for work
#[derive(Debug)]
pub enum Claim {
    /// Fetch this; it is now marked visited
    Target(CrawlTarget),
    /// Nothing queued, but in-flight pages may still discover links
    Wait,
    /// No more work will be handed out
    Done,
}

#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlTarget>,
    pages: HashMap<String, PageState>,
    in_flight: usize,
    claimed: usize,
    max_pages: usize,
    max_depth: u32,
}

impl Frontier {
    pub fn new(max_pages: usize, max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            pages: HashMap::new(),
            in_flight: 0,
            claimed: 0,
            max_pages,
            max_depth,
        }
    }

    /// Enqueues a target unless its URL is already known or it is too deep
    ///
    /// `front` places it ahead of everything queued. Returns whether the
    /// target was accepted.
    pub fn push(&mut self, target: CrawlTarget, front: bool) -> bool {
        if target.depth > self.max_depth || self.pages.contains_key(target.key()) {
            return false;
        }
        self.pages.insert(target.key().to_string(), PageState::Queued);
        if front {
            self.queue.push_front(target);
        } else {
            self.queue.push_back(target);
        }
        true
    }

    /// Hands out the next target, marking it visited
    pub fn claim(&mut self, cancelled: bool) -> Claim {
        if cancelled || self.claimed >= self.max_pages {
            return Claim::Done;
        }

        match self.queue.pop_front() {
            Some(target) => {
                self.pages
                    .insert(target.key().to_string(), PageState::Fetching);
                self.claimed += 1;
                self.in_flight += 1;
                Claim::Target(target)
            }
            None if self.in_flight > 0 => Claim::Wait,
            None => Claim::Done,
        }
    }

    /// Records a finished page and enqueues what it discovered
    ///
    /// Both happen before `in_flight` drops, so an idle worker never sees an
    /// empty frontier while links are still on their way in.
    pub fn complete<I>(&mut self, key: &str, succeeded: bool, discovered: I) -> usize
    where
        I: IntoIterator<Item = (CrawlTarget, bool)>,
    {
        let next = if succeeded {
            PageState::Succeeded
        } else {
            PageState::Failed
        };
        if let Some(state) = self.pages.get_mut(key) {
            debug_assert!(state.can_transition_to(next));
            *state = next;
        }

        let accepted = discovered
            .into_iter()
            .map(|(target, front)| self.push(target, front))
            .filter(|accepted| *accepted)
            .count();
        self.in_flight = self.in_flight.saturating_sub(1);
        accepted
    }

    pub fn state_of(&self, key: &str) -> Option<PageState> {
        self.pages.get(key).copied()
    }

    pub fn visited_count(&self) -> usize {
        self.claimed
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Terminal state once no worker is active
    pub fn outcome(&self, cancelled: bool) -> EngineState {
        if cancelled {
            EngineState::Aborted
        } else if self.queue.is_empty() {
            EngineState::Completed
        } else {
            EngineState::BudgetExhausted
        }
    }
}
