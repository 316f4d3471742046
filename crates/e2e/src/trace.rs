//! Operation trace kept as a failure artifact

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::browser::{BrowsingContext, ElementState, Key, SharedContext};
use crate::error::E2eResult;
use crate::locator::Query;
use crate::model::Viewport;

#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    pub at: DateTime<Utc>,
    pub operation: &'static str,
    pub target: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Shared, append-only event log for one test attempt
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }

    /// Free-form marker, e.g. an audit checkpoint label
    pub fn note(&self, operation: &'static str, target: impl Into<String>) {
        self.record(TraceEvent {
            at: Utc::now(),
            operation,
            target: target.into(),
            duration_ms: 0,
            error: None,
        });
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> E2eResult<String> {
        Ok(serde_json::to_string_pretty(&*self.events.lock())?)
    }
}

/// Decorator that records every operation on the wrapped context
pub struct TracedContext {
    inner: SharedContext,
    log: TraceLog,
}

impl TracedContext {
    pub fn wrap(inner: SharedContext, log: TraceLog) -> SharedContext {
        Arc::new(Self { inner, log })
    }

    async fn traced<T, Fut>(&self, operation: &'static str, target: String, fut: Fut) -> E2eResult<T>
    where
        Fut: Future<Output = E2eResult<T>>,
    {
        let at = Utc::now();
        let start = Instant::now();
        let result = fut.await;
        self.log.record(TraceEvent {
            at,
            operation,
            target,
            duration_ms: start.elapsed().as_millis() as u64,
            error: result.as_ref().err().map(ToString::to_string),
        });
        result
    }
}

#[async_trait]
impl BrowsingContext for TracedContext {
    fn id(&self) -> &str {
        self.inner.id()
    }

    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.traced("goto", url.to_string(), self.inner.goto(url)).await
    }

    async fn url(&self) -> E2eResult<String> {
        self.inner.url().await
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        self.traced("set_viewport", viewport.to_string(), self.inner.set_viewport(viewport))
            .await
    }

    async fn count(&self, query: &Query) -> E2eResult<usize> {
        self.inner.count(query).await
    }

    async fn inspect(&self, query: &Query) -> E2eResult<Option<ElementState>> {
        self.inner.inspect(query).await
    }

    async fn attribute(&self, query: &Query, name: &str) -> E2eResult<Option<String>> {
        self.inner.attribute(query, name).await
    }

    async fn click(&self, query: &Query) -> E2eResult<()> {
        self.traced("click", query.to_string(), self.inner.click(query)).await
    }

    async fn focus(&self, query: &Query) -> E2eResult<()> {
        self.traced("focus", query.to_string(), self.inner.focus(query)).await
    }

    async fn fill(&self, query: &Query, value: &str) -> E2eResult<()> {
        self.traced("fill", query.to_string(), self.inner.fill(query, value)).await
    }

    async fn press(&self, key: Key) -> E2eResult<()> {
        self.traced("press", key.code().to_string(), self.inner.press(key)).await
    }

    async fn scroll_into_view(&self, query: &Query) -> E2eResult<()> {
        self.traced("scroll_into_view", query.to_string(), self.inner.scroll_into_view(query))
            .await
    }

    async fn evaluate(&self, script: &str) -> E2eResult<serde_json::Value> {
        let preview: String = script.chars().take(60).collect();
        self.traced("evaluate", preview, self.inner.evaluate(script)).await
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        self.inner.screenshot().await
    }

    async fn close(&self) -> E2eResult<()> {
        self.traced("close", self.inner.id().to_string(), self.inner.close()).await
    }
}
