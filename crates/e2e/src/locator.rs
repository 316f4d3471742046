//! Element handles
//!
//! A [`Locator`] is a query plus the context it runs against. It never holds
//! a resolved node: the page mutates between interactions (accordion, theme,
//! report viewer), so every read or action resolves the query again.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::browser::{BoundingBox, ElementState, Key, SharedContext};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::wait::{self, WaitConfig, DEFAULT_POLL_INTERVAL};

/// One step of a query chain. Each step after the first is evaluated
/// against the descendants of the previous step's matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selector {
    Css { value: String },
    TestId { value: String },
    Role { role: String, name: Option<String> },
    Nth { index: usize },
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css { value } => write!(f, "css={}", value),
            Selector::TestId { value } => write!(f, "testid={}", value),
            Selector::Role { role, name: Some(name) } => write!(f, "role={}[name=\"{}\"]", role, name),
            Selector::Role { role, name: None } => write!(f, "role={}", role),
            Selector::Nth { index } => write!(f, "nth={}", index),
        }
    }
}

/// Stable, serializable element query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query {
    steps: Vec<Selector>,
}

impl Query {
    pub fn css(value: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css { value: value.into() })
    }

    pub fn test_id(value: impl Into<String>) -> Self {
        Self::from_selector(Selector::TestId { value: value.into() })
    }

    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Self::from_selector(Selector::Role {
            role: role.into(),
            name: name.map(String::from),
        })
    }

    fn from_selector(selector: Selector) -> Self {
        Self { steps: vec![selector] }
    }

    pub fn then(&self, selector: Selector) -> Self {
        let mut steps = self.steps.clone();
        steps.push(selector);
        Self { steps }
    }

    pub fn steps(&self) -> &[Selector] {
        &self.steps
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.steps).unwrap_or_else(|_| "[]".to_string())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.steps.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" >> "))
    }
}

/// Upper bounds for actions and web-first expectations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub action: Duration,
    pub expect: Duration,
}

impl Timeouts {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            action: config.action_timeout,
            expect: config.expect_timeout,
        }
    }

    pub fn action_wait(&self) -> WaitConfig {
        WaitConfig {
            timeout: self.action,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn expect_wait(&self) -> WaitConfig {
        WaitConfig {
            timeout: self.expect,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action: wait::DEFAULT_TIMEOUT,
            expect: wait::DEFAULT_TIMEOUT,
        }
    }
}

/// Lazy handle to zero or more live nodes
#[derive(Clone)]
pub struct Locator {
    ctx: SharedContext,
    query: Query,
    timeouts: Timeouts,
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("context", &self.ctx.id())
            .field("query", &self.query.to_string())
            .finish()
    }
}

impl Locator {
    pub fn new(ctx: SharedContext, query: Query, timeouts: Timeouts) -> Self {
        Self { ctx, query, timeouts }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Descendants matching a CSS selector
    pub fn locator(&self, css: impl Into<String>) -> Locator {
        self.derive(Selector::Css { value: css.into() })
    }

    pub fn get_by_test_id(&self, id: impl Into<String>) -> Locator {
        self.derive(Selector::TestId { value: id.into() })
    }

    pub fn nth(&self, index: usize) -> Locator {
        self.derive(Selector::Nth { index })
    }

    pub fn first(&self) -> Locator {
        self.nth(0)
    }

    fn derive(&self, selector: Selector) -> Locator {
        Locator {
            ctx: self.ctx.clone(),
            query: self.query.then(selector),
            timeouts: self.timeouts,
        }
    }

    /// One locator per current match, each still lazy
    pub async fn all(&self) -> E2eResult<Vec<Locator>> {
        let count = self.count().await?;
        Ok((0..count).map(|i| self.nth(i)).collect())
    }

    pub async fn count(&self) -> E2eResult<usize> {
        self.ctx.count(&self.query).await
    }

    pub async fn inspect(&self) -> E2eResult<Option<ElementState>> {
        self.ctx.inspect(&self.query).await
    }

    async fn require_state(&self) -> E2eResult<ElementState> {
        self.inspect()
            .await?
            .ok_or_else(|| E2eError::not_ready(&self.query, "no matching element"))
    }

    /// False when nothing matches
    pub async fn is_visible(&self) -> E2eResult<bool> {
        Ok(self.inspect().await?.map(|s| s.visible).unwrap_or(false))
    }

    pub async fn is_hidden(&self) -> E2eResult<bool> {
        self.is_visible().await.map(|v| !v)
    }

    pub async fn is_focused(&self) -> E2eResult<bool> {
        Ok(self.inspect().await?.map(|s| s.focused).unwrap_or(false))
    }

    pub async fn is_in_viewport(&self) -> E2eResult<bool> {
        Ok(self.inspect().await?.map(|s| s.in_viewport).unwrap_or(false))
    }

    /// Attribute of the first match; the element itself must exist
    pub async fn attribute(&self, name: &str) -> E2eResult<Option<String>> {
        self.ctx.attribute(&self.query, name).await
    }

    pub async fn text(&self) -> E2eResult<String> {
        Ok(self.require_state().await?.text)
    }

    pub async fn input_value(&self) -> E2eResult<String> {
        Ok(self.require_state().await?.value.unwrap_or_default())
    }

    pub async fn bounding_box(&self) -> E2eResult<Option<BoundingBox>> {
        Ok(self.inspect().await?.and_then(|s| s.bounding_box))
    }

    pub async fn click(&self) -> E2eResult<()> {
        debug!(query = %self.query, "click");
        wait::retry_action(self.timeouts.action_wait(), || self.ctx.click(&self.query)).await
    }

    pub async fn focus(&self) -> E2eResult<()> {
        wait::retry_action(self.timeouts.action_wait(), || self.ctx.focus(&self.query)).await
    }

    pub async fn fill(&self, value: &str) -> E2eResult<()> {
        debug!(query = %self.query, "fill");
        wait::retry_action(self.timeouts.action_wait(), || self.ctx.fill(&self.query, value)).await
    }

    /// Focus the element, then press a key
    pub async fn press(&self, key: Key) -> E2eResult<()> {
        self.focus().await?;
        self.ctx.press(key).await
    }

    pub async fn scroll_into_view(&self) -> E2eResult<()> {
        wait::retry_action(self.timeouts.action_wait(), || {
            self.ctx.scroll_into_view(&self.query)
        })
        .await
    }
}

/// Raw page handle bound to one isolated browsing context
#[derive(Clone)]
pub struct BrowserPage {
    ctx: SharedContext,
    config: Arc<HarnessConfig>,
    timeouts: Timeouts,
}

impl fmt::Debug for BrowserPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserPage")
            .field("context", &self.ctx.id())
            .field("base_url", &self.config.base_url)
            .finish()
    }
}

impl BrowserPage {
    pub fn new(ctx: SharedContext, config: Arc<HarnessConfig>) -> Self {
        let timeouts = Timeouts::from_config(&config);
        Self { ctx, config, timeouts }
    }

    pub fn context(&self) -> &SharedContext {
        &self.ctx
    }

    pub fn config(&self) -> &Arc<HarnessConfig> {
        &self.config
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Load a path relative to the target address
    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = self.config.url(path);
        debug!(%url, context = self.ctx.id(), "navigate");
        self.ctx.goto(&url).await
    }

    pub async fn url(&self) -> E2eResult<String> {
        self.ctx.url().await
    }

    pub fn locator(&self, css: impl Into<String>) -> Locator {
        Locator::new(self.ctx.clone(), Query::css(css), self.timeouts)
    }

    pub fn get_by_test_id(&self, id: impl Into<String>) -> Locator {
        Locator::new(self.ctx.clone(), Query::test_id(id), self.timeouts)
    }

    pub fn get_by_role(&self, role: &str, name: Option<&str>) -> Locator {
        Locator::new(self.ctx.clone(), Query::role(role, name), self.timeouts)
    }

    /// Press a key against whatever has focus
    pub async fn press(&self, key: Key) -> E2eResult<()> {
        self.ctx.press(key).await
    }

    pub async fn evaluate(&self, script: &str) -> E2eResult<serde_json::Value> {
        self.ctx.evaluate(script).await
    }
}
