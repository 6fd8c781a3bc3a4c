//! URL handling module for Trawler
//!
//! This module provides URL normalization, domain helpers, suffix-walk
//! blocklist matching, and the link filter that guards the frontier.

mod domain;
mod filter;
mod matcher;
mod normalize;

pub use domain::{base_domain, extract_domain, is_same_or_subdomain, strip_www};
pub use filter::{FilterReason, LinkFilter, ShapeLimits};
pub use matcher::{matches_wildcard, DomainSet};
pub use normalize::{normalize_str, normalize_url};
