//! Portfolio E2E Test Framework
//!
//! This crate provides a Rust-controlled browser verification harness that:
//! - Resolves run configuration from flags, environment and defaults
//! - Drives Chromium over the DevTools protocol, one isolated context per test
//! - Models the site as typed page surfaces over lazy element handles
//! - Provisions per-test fixtures with guaranteed teardown
//! - Runs axe-core audits and normalizes their violations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── worker pool (JoinSet + Semaphore)                    │
//! │    ├── run_case(case) -> TestResult (retries, flaky)        │
//! │    └── failure artifacts: screenshot.png, trace.json        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestScope (one per attempt)                                │
//! │    ├── page          -> BrowserPage (isolated context)      │
//! │    ├── base_page     -> BasePage                            │
//! │    ├── career_page / demos_page / contact_page              │
//! │    ├── audit         -> Audit -> AuditRequest -> Violations │
//! │    └── links         -> LinkChecker                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowsingContext (trait)                                    │
//! │    ├── CdpContext     (chromiumoxide)                       │
//! │    └── TracedContext  (records every operation)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod a11y;
pub mod browser;
pub mod chromium;
pub mod config;
pub mod error;
pub mod expect;
pub mod fixtures;
pub mod links;
pub mod locator;
pub mod model;
pub mod pages;
pub mod report;
pub mod runner;
pub mod suites;
pub mod trace;
pub mod wait;

pub use a11y::{expect_no_violations, Audit, AuditConfig, AuditEngine, AuditRequest, Violation, ViolationList};
pub use browser::{BrowsingContext, ContextProvider, SharedContext};
pub use chromium::ChromiumProvider;
pub use config::{ConfigKey, HarnessConfig, Resolver};
pub use error::{E2eError, E2eResult, FailureKind};
pub use fixtures::{FixtureKey, FixtureRegistry, Provisioned, TestScope};
pub use locator::{BrowserPage, Locator, Query};
pub use runner::{TestCase, TestFilter, TestRunner, TestSuiteResult};
