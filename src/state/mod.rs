//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageState`: lifecycle of one URL within a run
//! - `EngineState`: lifecycle of a crawl run
//! - `DomainRateState`: per-domain cadence used by the rate limiter

mod domain_state;
mod page_state;

pub use domain_state::DomainRateState;
pub use page_state::{EngineState, PageState};
