//! Test suites for the portfolio site
//!
//! Each module declares its cases with [`TestCase`]; bodies are plain
//! functions that pull fixtures from their [`TestScope`](crate::fixtures::TestScope).

use regex::Regex;

use crate::error::{E2eError, E2eResult};
use crate::runner::TestCase;

pub mod a11y;
pub mod api;
pub mod career;
pub mod demos;
pub mod form;
pub mod landmarks;
pub mod navigation;
pub mod responsive;

/// Every case, in a stable order
pub fn all() -> Vec<TestCase> {
    let mut cases = Vec::new();
    cases.extend(navigation::cases());
    cases.extend(career::cases());
    cases.extend(demos::cases());
    cases.extend(responsive::cases());
    cases.extend(a11y::cases());
    cases.extend(landmarks::cases());
    cases.extend(form::cases());
    cases.extend(api::cases());
    cases
}

/// Pattern matching `url` with or without its scheme, e.g. a configured
/// profile address against an `href`
pub(crate) fn link_pattern(url: &str) -> E2eResult<Regex> {
    let bare = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_end_matches('/');
    Regex::new(&regex::escape(bare))
        .map_err(|e| E2eError::AssertionFailed(format!("bad link pattern for {}: {}", url, e)))
}
