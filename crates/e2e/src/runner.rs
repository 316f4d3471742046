//! Test runner: bounded worker pool, retries, failure artifacts

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::a11y::AuditEngine;
use crate::browser::{ContextProvider, SharedContext};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult, FailureKind};
use crate::fixtures::{Ambient, FixtureRegistry, TestScope};
use crate::model::{Project, ViewportPreset};
use crate::trace::TraceLog;

const ARTIFACT_TIMEOUT: Duration = Duration::from_secs(10);

/// Async test body
pub type TestBody = for<'a> fn(&'a mut TestScope) -> BoxFuture<'a, E2eResult<()>>;

/// One named test and the viewport it runs at
///
/// A case built with [`TestCase::new`] runs once per configured project.
/// [`TestCase::at`] pins it to a single viewport instead.
#[derive(Clone)]
pub struct TestCase {
    pub group: &'static str,
    pub name: &'static str,
    pub viewport: ViewportPreset,
    pub pinned: bool,
    pub project: Option<Project>,
    pub body: TestBody,
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("viewport", &self.viewport)
            .field("project", &self.project)
            .finish()
    }
}

impl TestCase {
    /// Test that follows the configured projects; desktop when run directly
    pub fn new(group: &'static str, name: &'static str, body: TestBody) -> Self {
        Self {
            group,
            name,
            viewport: ViewportPreset::Desktop,
            pinned: false,
            project: None,
            body,
        }
    }

    /// Pin to one viewport regardless of projects
    pub fn at(mut self, viewport: ViewportPreset) -> Self {
        self.viewport = viewport;
        self.pinned = true;
        self
    }

    /// This case bound to a project's device profile
    pub fn under(mut self, project: Project) -> Self {
        self.viewport = project.preset();
        self.project = Some(project);
        self
    }

    /// `group › name`
    pub fn full_name(&self) -> String {
        format!("{} › {}", self.group, self.name)
    }

    /// Project name, or the viewport for pinned and direct runs
    pub fn label(&self) -> &'static str {
        match self.project {
            Some(project) => project.as_str(),
            None => self.viewport.as_str(),
        }
    }

    /// Filesystem-safe identifier, unique per group, name and label
    pub fn slug(&self) -> String {
        let raw = format!("{} {} {}", self.group, self.name, self.label());
        let mut slug = String::with_capacity(raw.len());
        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        slug.trim_matches('-').to_string()
    }
}

/// One entry per project for each unpinned case, pinned cases once.
/// Declaration order is kept, projects vary fastest.
pub fn expand_projects(cases: &[TestCase], projects: &[Project]) -> Vec<TestCase> {
    let mut expanded = Vec::with_capacity(cases.len() * projects.len().max(1));
    for case in cases {
        if case.pinned || case.project.is_some() {
            expanded.push(case.clone());
            continue;
        }
        for project in projects {
            expanded.push(case.clone().under(*project));
        }
    }
    expanded
}

/// Name and group selection
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    /// Case-insensitive substring of `group › name`
    pub grep: Option<String>,
    pub group: Option<String>,
}

impl TestFilter {
    pub fn matches(&self, case: &TestCase) -> bool {
        let group_ok = self.group.as_deref().map_or(true, |g| case.group == g);
        let grep_ok = self.grep.as_deref().map_or(true, |pattern| {
            case.full_name().to_lowercase().contains(&pattern.to_lowercase())
        });
        group_ok && grep_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    /// Passed only after a retry
    Flaky,
    Failed,
}

/// Outcome of one attempt of a test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub category: Option<FailureKind>,
    pub artifacts: Vec<PathBuf>,
    pub teardown_errors: Vec<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub project: Option<Project>,
    pub viewport: String,
    pub status: TestStatus,
    pub duration_ms: u64,
    pub attempts: Vec<AttemptResult>,
    pub error: Option<String>,
    pub category: Option<FailureKind>,
}

impl TestResult {
    pub fn success(&self) -> bool {
        self.status != TestStatus::Failed
    }

    fn infrastructure(case: &TestCase, message: String) -> Self {
        Self {
            name: case.name.to_string(),
            group: case.group.to_string(),
            project: case.project,
            viewport: case.viewport.as_str().to_string(),
            status: TestStatus::Failed,
            duration_ms: 0,
            attempts: Vec::new(),
            error: Some(message),
            category: Some(FailureKind::Infrastructure),
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub flaky: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs test cases against isolated browsing contexts
#[derive(Clone)]
pub struct TestRunner {
    config: Arc<HarnessConfig>,
    provider: Arc<dyn ContextProvider>,
    registry: Arc<FixtureRegistry>,
    audit_engine: Arc<AuditEngine>,
    filter: TestFilter,
}

impl TestRunner {
    /// Runner with the standard fixtures and an engine for the configured
    /// axe-core source
    pub fn new(config: Arc<HarnessConfig>, provider: Arc<dyn ContextProvider>) -> Self {
        let audit_engine = Arc::new(AuditEngine::new(config.axe_source.clone()));
        Self {
            config,
            provider,
            registry: Arc::new(FixtureRegistry::standard()),
            audit_engine,
            filter: TestFilter::default(),
        }
    }

    pub fn with_registry(mut self, registry: FixtureRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_audit_engine(mut self, engine: Arc<AuditEngine>) -> Self {
        self.audit_engine = engine;
        self
    }

    pub fn with_filter(mut self, filter: TestFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &Arc<HarnessConfig> {
        &self.config
    }

    /// Cases selected by the filter, expanded per project, in declaration
    /// order
    pub fn select(&self, cases: &[TestCase]) -> Vec<TestCase> {
        let matching: Vec<TestCase> =
            cases.iter().filter(|c| self.filter.matches(c)).cloned().collect();
        expand_projects(&matching, &self.config.projects)
    }

    /// Run the selected cases with at most `workers` in flight
    pub async fn run(&self, cases: &[TestCase]) -> TestSuiteResult {
        let selected = self.select(cases);
        let started_at = Utc::now();
        let start = Instant::now();
        let projects: Vec<&str> = self.config.projects.iter().map(Project::as_str).collect();
        info!(
            "Running {} test(s) using {} worker(s) against {} [{}]",
            selected.len(),
            self.config.workers,
            self.config.base_url,
            projects.join(", ")
        );

        let permits = Arc::new(Semaphore::new(self.config.workers));
        let mut set = JoinSet::new();
        for (index, case) in selected.iter().cloned().enumerate() {
            let runner = self.clone();
            let permits = permits.clone();
            set.spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                (index, runner.run_case(&case).await)
            });
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; selected.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => error!("Test worker failed: {}", e),
            }
        }

        let results: Vec<TestResult> = slots
            .into_iter()
            .zip(&selected)
            .map(|(slot, case)| {
                slot.unwrap_or_else(|| {
                    TestResult::infrastructure(case, "test worker terminated".to_string())
                })
            })
            .collect();

        let count = |status| results.iter().filter(|r| r.status == status).count();
        let (passed, flaky, failed) = (
            count(TestStatus::Passed),
            count(TestStatus::Flaky),
            count(TestStatus::Failed),
        );
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Test Results: {} passed, {} flaky, {} failed ({} ms)",
            passed, flaky, failed, duration_ms
        );

        TestSuiteResult {
            started_at,
            base_url: self.config.base_url.clone(),
            total: results.len(),
            passed,
            flaky,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run one case, retrying failed attempts up to the configured count
    pub async fn run_case(&self, case: &TestCase) -> TestResult {
        let start = Instant::now();
        let max_attempts = self.config.retries + 1;
        let mut attempts = Vec::new();

        for attempt in 1..=max_attempts {
            let outcome = self.run_attempt(case, attempt).await;
            let passed = outcome.error.is_none();
            attempts.push(outcome);
            if passed {
                break;
            }
            if attempt < max_attempts {
                warn!("↻ [{}] {} failed on attempt {}, retrying", case.label(), case.full_name(), attempt);
            }
        }

        let last = attempts.last();
        let status = match last {
            Some(a) if a.error.is_none() && a.attempt == 1 => TestStatus::Passed,
            Some(a) if a.error.is_none() => TestStatus::Flaky,
            _ => TestStatus::Failed,
        };
        let (error, category) = match (status, last) {
            (TestStatus::Failed, Some(a)) => (a.error.clone(), a.category),
            _ => (None, None),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let label = case.label();
        match status {
            TestStatus::Passed => info!("✓ [{}] {} ({} ms)", label, case.full_name(), duration_ms),
            TestStatus::Flaky => warn!("⚠ [{}] {} flaky ({} ms)", label, case.full_name(), duration_ms),
            TestStatus::Failed => error!(
                "✗ [{}] {} - {}",
                label,
                case.full_name(),
                error.as_deref().unwrap_or("unknown error")
            ),
        }

        TestResult {
            name: case.name.to_string(),
            group: case.group.to_string(),
            project: case.project,
            viewport: case.viewport.as_str().to_string(),
            status,
            duration_ms,
            attempts,
            error,
            category,
        }
    }

    async fn run_attempt(&self, case: &TestCase, attempt: u32) -> AttemptResult {
        let trace = TraceLog::new();
        let ambient = Ambient {
            config: self.config.clone(),
            provider: self.provider.clone(),
            audit_engine: self.audit_engine.clone(),
            viewport: self.config.viewport(case.viewport),
            trace: trace.clone(),
        };
        let mut scope = TestScope::new(self.registry.clone(), ambient);
        debug!(test = %case.full_name(), attempt, scope = %scope.id(), "starting attempt");

        let start = Instant::now();
        let outcome = {
            let body = AssertUnwindSafe((case.body)(&mut scope)).catch_unwind();
            match tokio::time::timeout(self.config.test_timeout, body).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => Err(E2eError::Panicked(panic_message(panic))),
                Err(_) => Err(E2eError::Timeout(format!(
                    "test exceeded {:?}",
                    self.config.test_timeout
                ))),
            }
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        // Capture before teardown closes the context
        let artifacts = match &outcome {
            Ok(()) => Vec::new(),
            Err(_) => {
                let opened = scope.opened_context();
                self.capture_artifacts(case, attempt, opened, &trace).await
            }
        };

        let teardown_errors =
            match tokio::time::timeout(self.config.teardown_timeout, scope.teardown()).await {
                Ok(errors) => errors.into_iter().map(|e| e.to_string()).collect(),
                Err(_) => {
                    warn!(test = %case.full_name(), "Teardown timed out");
                    vec![E2eError::Timeout(format!(
                        "teardown exceeded {:?}",
                        self.config.teardown_timeout
                    ))
                    .to_string()]
                }
            };

        AttemptResult {
            attempt,
            duration_ms,
            category: outcome.as_ref().err().map(E2eError::category),
            error: outcome.err().map(|e| e.to_string()),
            artifacts,
            teardown_errors,
        }
    }

    /// Screenshot and trace of a failed attempt. Capture problems are
    /// logged and never change the verdict.
    async fn capture_artifacts(
        &self,
        case: &TestCase,
        attempt: u32,
        opened: Option<SharedContext>,
        trace: &TraceLog,
    ) -> Vec<PathBuf> {
        let dir = attempt_dir(&self.config.output_dir, case, attempt);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(dir = %dir.display(), "Cannot create artifact directory: {}", e);
            return Vec::new();
        }

        let mut written = Vec::new();
        if let Some(ctx) = opened {
            let path = dir.join("screenshot.png");
            match tokio::time::timeout(ARTIFACT_TIMEOUT, ctx.screenshot()).await {
                Ok(Ok(png)) => match tokio::fs::write(&path, png).await {
                    Ok(()) => written.push(path),
                    Err(e) => warn!(path = %path.display(), "Cannot write screenshot: {}", e),
                },
                Ok(Err(e)) => warn!(test = %case.full_name(), "Screenshot failed: {}", e),
                Err(_) => warn!(test = %case.full_name(), "Screenshot timed out"),
            }
        }

        let path = dir.join("trace.json");
        let written_trace = match trace.to_json() {
            Ok(json) => tokio::fs::write(&path, json).await.map_err(E2eError::from),
            Err(e) => Err(e),
        };
        match written_trace {
            Ok(()) => written.push(path),
            Err(e) => warn!(path = %path.display(), "Cannot write trace: {}", e),
        }
        written
    }
}

/// `<output>/<test-slug>/attempt-<n>`
pub fn attempt_dir(output_dir: &Path, case: &TestCase, attempt: u32) -> PathBuf {
    output_dir.join(case.slug()).join(format!("attempt-{}", attempt))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
