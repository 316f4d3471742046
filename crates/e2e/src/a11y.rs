//! Accessibility audits
//!
//! axe-core is loaded once per run by the [`AuditEngine`] and injected into
//! each page on demand. An [`AuditRequest`] carries the rule tags, disabled
//! rules and excluded regions for one run of `axe.run` against the current
//! DOM; the result is normalized into a [`ViolationList`]. Passing or failing
//! happens in exactly one place, [`expect_no_violations`].
//!
//! Engine problems (script fetch, injection, a throwing `axe.run`) surface
//! as [`E2eError::AuditEngine`] and are never reported as violations.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::AxeSource;
use crate::error::{E2eError, E2eResult};
use crate::locator::BrowserPage;
use crate::trace::TraceLog;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Rule selection for one audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    pub tags: Vec<String>,
    pub disabled_rules: Vec<String>,
    pub excluded_regions: Vec<String>,
}

impl AuditConfig {
    /// No tag filter, nothing disabled, nothing excluded
    pub fn empty() -> Self {
        Self {
            tags: Vec::new(),
            disabled_rules: Vec::new(),
            excluded_regions: Vec::new(),
        }
    }

    /// WCAG 2.0 A and AA rules, with the accent-colour contrast false
    /// positive disabled and the embedded report frame left out
    pub fn standard() -> Self {
        Self {
            tags: vec!["wcag2a".into(), "wcag2aa".into()],
            disabled_rules: vec!["color-contrast".into()],
            excluded_regions: vec![REPORT_FRAME_REGION.into()],
        }
    }

    /// `axe.run` options object
    fn options(&self) -> serde_json::Value {
        let mut options = serde_json::Map::new();
        if !self.tags.is_empty() {
            options.insert(
                "runOnly".into(),
                serde_json::json!({ "type": "tag", "values": self.tags }),
            );
        }
        if !self.disabled_rules.is_empty() {
            let rules: serde_json::Map<String, serde_json::Value> = self
                .disabled_rules
                .iter()
                .map(|id| (id.clone(), serde_json::json!({ "enabled": false })))
                .collect();
            options.insert("rules".into(), serde_json::Value::Object(rules));
        }
        serde_json::Value::Object(options)
    }

    /// `axe.run` context: the whole document minus excluded regions
    fn context(&self) -> serde_json::Value {
        if self.excluded_regions.is_empty() {
            return serde_json::Value::Null;
        }
        let exclude: Vec<Vec<&str>> = self.excluded_regions.iter().map(|s| vec![s.as_str()]).collect();
        serde_json::json!({ "exclude": exclude })
    }

    fn script(&self) -> String {
        format!(
            r#"(async () => {{
  const context = {context};
  const result = await axe.run(context === null ? document : context, {options});
  return result.violations.map(v => ({{
    id: v.id,
    impact: v.impact || null,
    help: v.help,
    helpUrl: v.helpUrl,
    targets: v.nodes.map(n => n.target.join(' '))
  }}));
}})()"#,
            context = self.context(),
            options = self.options(),
        )
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Region that embeds third-party report content
pub const REPORT_FRAME_REGION: &str = "[data-testid=\"report-iframe\"]";

/// One failed rule and the nodes it failed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: String,
    pub impact: Option<String>,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub help_url: Option<String>,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl Violation {
    /// Number of affected nodes
    pub fn nodes(&self) -> usize {
        self.targets.len()
    }
}

/// Ordered violations from a single audit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationList {
    violations: Vec<Violation>,
}

impl ViolationList {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.id.as_str()).collect()
    }

    /// Violations of a single rule
    pub fn only(&self, rule: &str) -> ViolationList {
        Self::new(self.violations.iter().filter(|v| v.id == rule).cloned().collect())
    }

    /// `id (n nodes)` for each violation
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("{} ({} nodes)", v.id, v.nodes()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ViolationList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} violations", self.len())?;
        for v in &self.violations {
            write!(f, "\n  - {}: {} nodes", v.id, v.nodes())?;
        }
        Ok(())
    }
}

/// The pass contract: an audit passes only with zero violations
pub fn expect_no_violations(list: &ViolationList) -> E2eResult<()> {
    if list.is_empty() {
        return Ok(());
    }
    Err(E2eError::AccessibilityViolations {
        count: list.len(),
        summary: list.summary(),
    })
}

/// Loads axe-core once and injects it into pages
pub struct AuditEngine {
    source: AxeSource,
    script: OnceCell<Arc<str>>,
}

impl fmt::Debug for AuditEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditEngine")
            .field("source", &self.source)
            .field("loaded", &self.script.initialized())
            .finish()
    }
}

impl AuditEngine {
    pub fn new(source: AxeSource) -> Self {
        Self {
            source,
            script: OnceCell::new(),
        }
    }

    /// Engine with the script already in memory
    pub fn from_script(script: impl Into<String>) -> Self {
        let text: String = script.into();
        Self {
            source: AxeSource::File("<inline>".into()),
            script: OnceCell::new_with(Some(Arc::from(text))),
        }
    }

    pub fn source(&self) -> &AxeSource {
        &self.source
    }

    /// The axe-core source, loaded on first use
    pub async fn script(&self) -> E2eResult<Arc<str>> {
        self.script
            .get_or_try_init(|| load(&self.source))
            .await
            .map(Arc::clone)
    }

    /// Make `axe` available in the page if it is not already
    pub async fn ensure_injected(&self, page: &BrowserPage) -> E2eResult<()> {
        let present = page
            .evaluate("typeof window.axe !== 'undefined'")
            .await
            .map_err(engine_error)?;
        if present.as_bool() == Some(true) {
            return Ok(());
        }

        let script = self.script().await?;
        debug!(context = page.context().id(), "injecting axe-core");
        page.evaluate(&format!("{};\ntypeof window.axe !== 'undefined'", script))
            .await
            .map_err(engine_error)
            .and_then(|loaded| match loaded.as_bool() {
                Some(true) => Ok(()),
                _ => Err(E2eError::AuditEngine(
                    "axe-core did not register window.axe".to_string(),
                )),
            })
    }
}

async fn load(source: &AxeSource) -> E2eResult<Arc<str>> {
    let text = match source {
        AxeSource::Url(url) => {
            info!(%url, "fetching axe-core");
            let client = reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .map_err(engine_error)?;
            let response = client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(engine_error)?;
            response.text().await.map_err(engine_error)?
        }
        AxeSource::File(path) => {
            info!(path = %path.display(), "reading axe-core");
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| E2eError::AuditEngine(format!("{}: {}", path.display(), e)))?
        }
    };
    if text.trim().is_empty() {
        return Err(E2eError::AuditEngine("axe-core source is empty".to_string()));
    }
    Ok(Arc::from(text))
}

fn engine_error(e: impl fmt::Display) -> E2eError {
    E2eError::AuditEngine(e.to_string())
}

/// Audit factory bound to one test's page
#[derive(Debug, Clone)]
pub struct Audit {
    page: BrowserPage,
    engine: Arc<AuditEngine>,
    trace: TraceLog,
}

impl Audit {
    pub fn new(page: BrowserPage, engine: Arc<AuditEngine>, trace: TraceLog) -> Self {
        Self { page, engine, trace }
    }

    /// Request with the standard configuration
    pub fn request(&self) -> AuditRequest {
        self.build(AuditConfig::standard())
    }

    pub fn build(&self, config: AuditConfig) -> AuditRequest {
        AuditRequest {
            page: self.page.clone(),
            engine: self.engine.clone(),
            config,
        }
    }

    /// Audit the current state with the standard configuration and log a
    /// per-state summary under `label`. Each call is independent.
    pub async fn checkpoint(&self, label: &str) -> E2eResult<ViolationList> {
        let list = self.request().execute().await?;
        info!("{}: {} violations", label, list.len());
        for v in list.iter() {
            info!("  - {}: {} nodes", v.id, v.nodes());
        }
        self.trace.note("audit", format!("{}: {} violations", label, list.len()));
        Ok(list)
    }
}

/// A configured audit of the page's current DOM
#[derive(Clone)]
pub struct AuditRequest {
    page: BrowserPage,
    engine: Arc<AuditEngine>,
    config: AuditConfig,
}

impl AuditRequest {
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Replace the rule tag set
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn disable_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for rule in rules {
            let rule = rule.into();
            if !self.config.disabled_rules.contains(&rule) {
                self.config.disabled_rules.push(rule);
            }
        }
        self
    }

    pub fn exclude(mut self, selector: impl Into<String>) -> Self {
        let selector = selector.into();
        if !self.config.excluded_regions.contains(&selector) {
            self.config.excluded_regions.push(selector);
        }
        self
    }

    /// Run the audit and wait for the engine to finish
    pub async fn execute(&self) -> E2eResult<ViolationList> {
        self.engine.ensure_injected(&self.page).await?;
        let raw = self
            .page
            .evaluate(&self.config.script())
            .await
            .map_err(engine_error)?;
        let violations: Vec<Violation> = serde_json::from_value(raw)
            .map_err(|e| E2eError::AuditEngine(format!("unexpected axe result: {}", e)))?;
        debug!(
            context = self.page.context().id(),
            count = violations.len(),
            "audit finished"
        );
        Ok(ViolationList::new(violations))
    }
}
