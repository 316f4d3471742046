//! Error types for the E2E harness

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("Fixture '{name}' failed to construct: {source}")]
    FixtureConstruction {
        name: String,
        #[source]
        source: Box<E2eError>,
    },

    #[error("Fixture dependency cycle: {0}")]
    FixtureCycle(String),

    #[error("Unknown fixture: {0}")]
    UnknownFixture(String),

    #[error("Fixture '{name}' is not a {expected}")]
    FixtureType { name: String, expected: &'static str },

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element not ready: {query} - {reason}")]
    ElementNotReady { query: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Accessibility audit engine failed: {0}")]
    AuditEngine(String),

    #[error("{count} accessibility violation(s): {summary}")]
    AccessibilityViolations { count: usize, summary: String },

    #[error("Link unreachable: {url} ({})", status.map(|s| s.to_string()).unwrap_or_else(|| "no response".to_string()))]
    LinkUnreachable { url: String, status: Option<u16> },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Test panicked: {0}")]
    Panicked(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Reporting bucket for a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Configuration,
    Fixture,
    Interaction,
    AuditEngine,
    Accessibility,
    Network,
    Assertion,
    Timeout,
    Infrastructure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "configuration",
            FailureKind::Fixture => "fixture",
            FailureKind::Interaction => "interaction",
            FailureKind::AuditEngine => "audit-engine",
            FailureKind::Accessibility => "accessibility",
            FailureKind::Network => "network",
            FailureKind::Assertion => "assertion",
            FailureKind::Timeout => "timeout",
            FailureKind::Infrastructure => "infrastructure",
        }
    }
}

impl E2eError {
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn not_ready(query: impl ToString, reason: impl Into<String>) -> Self {
        E2eError::ElementNotReady {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify the error for reporting. Engine failures and violations are
    /// kept in separate buckets.
    pub fn category(&self) -> FailureKind {
        match self {
            E2eError::Config { .. } => FailureKind::Configuration,
            E2eError::FixtureConstruction { .. }
            | E2eError::FixtureCycle(_)
            | E2eError::UnknownFixture(_)
            | E2eError::FixtureType { .. } => FailureKind::Fixture,
            E2eError::Navigation { .. } | E2eError::ElementNotReady { .. } => {
                FailureKind::Interaction
            }
            E2eError::AssertionFailed(_) | E2eError::Panicked(_) => FailureKind::Assertion,
            E2eError::AuditEngine(_) => FailureKind::AuditEngine,
            E2eError::AccessibilityViolations { .. } => FailureKind::Accessibility,
            E2eError::LinkUnreachable { .. } | E2eError::Http(_) => FailureKind::Network,
            E2eError::Timeout(_) => FailureKind::Timeout,
            E2eError::Browser(_) | E2eError::Cdp(_) | E2eError::Io(_) | E2eError::Json(_) => {
                FailureKind::Infrastructure
            }
        }
    }

    /// Interaction errors a caller may retry until the element settles.
    pub fn is_retryable(&self) -> bool {
        matches!(self, E2eError::ElementNotReady { .. })
    }
}
