//! Per-URL and per-run state machines
//!
//! A URL moves `Queued -> Fetching -> {Succeeded, Failed}`; a crawl run moves
//! `Idle -> Running -> {Completed, BudgetExhausted, Aborted}`.

use serde::Serialize;
use std::fmt;

/// Represents the current state of a URL within one crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    /// Accepted into the frontier, not yet claimed by a worker
    Queued,

    /// Claimed by a worker; the URL now counts as visited
    Fetching,

    /// Fetched and processed
    Succeeded,

    /// Fetch or processing failed; the error is on the result
    Failed,
}

impl PageState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true once the URL has been claimed for fetching
    pub fn is_visited(&self) -> bool {
        !matches!(self, Self::Queued)
    }

    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Fetching)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running,
    /// The frontier drained
    Completed,
    /// The page budget was reached with work still queued
    BudgetExhausted,
    /// Stopped by an external cancel
    Aborted,
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::BudgetExhausted | Self::Aborted
        )
    }

    pub fn can_transition_to(&self, next: EngineState) -> bool {
        match self {
            Self::Idle => next == Self::Running,
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
