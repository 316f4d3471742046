//! Chromium automation over the DevTools protocol
//!
//! One browser process is shared by the whole run. Every test gets its own
//! CDP browser context (separate cookies, storage and cache) with a single
//! page, so parallel tests never observe each other's theme, scroll or
//! accordion state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::browser::{BrowsingContext, ContextProvider, ElementState, Key, SharedContext};
use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::locator::Query;
use crate::model::Viewport;

/// In-page query resolver and element checks. Kept in one place so the
/// Rust side only ever sends serialized queries.
const PRELUDE: &str = r#"
const __e2e = (() => {
  const heading = () => 'heading';
  const IMPLICIT = {
    a: el => el.hasAttribute('href') ? 'link' : null,
    area: el => el.hasAttribute('href') ? 'link' : null,
    aside: () => 'complementary',
    button: () => 'button',
    dialog: () => 'dialog',
    footer: () => 'contentinfo',
    form: () => 'form',
    h1: heading, h2: heading, h3: heading, h4: heading, h5: heading, h6: heading,
    header: () => 'banner',
    img: el => el.getAttribute('alt') === '' ? 'presentation' : 'img',
    input: el => {
      const t = (el.getAttribute('type') || 'text').toLowerCase();
      if (t === 'checkbox') return 'checkbox';
      if (t === 'radio') return 'radio';
      if (['button', 'submit', 'reset', 'image'].includes(t)) return 'button';
      if (t === 'hidden') return null;
      return 'textbox';
    },
    li: () => 'listitem',
    main: () => 'main',
    nav: () => 'navigation',
    ol: () => 'list',
    section: el => (el.hasAttribute('aria-label') || el.hasAttribute('aria-labelledby')) ? 'region' : null,
    select: () => 'combobox',
    table: () => 'table',
    textarea: () => 'textbox',
    ul: () => 'list',
  };
  const roleOf = el => {
    const explicit = (el.getAttribute('role') || '').trim();
    if (explicit) return explicit.split(/\s+/)[0];
    const f = IMPLICIT[el.localName];
    return f ? f(el) : null;
  };
  const hiddenFromTree = el => {
    if (el.closest('[aria-hidden="true"]')) return true;
    if (el.checkVisibility) return !el.checkVisibility({ visibilityProperty: true });
    return el.getClientRects().length === 0;
  };
  const squash = s => (s || '').replace(/\s+/g, ' ').trim();
  const nameOf = el => {
    const label = squash(el.getAttribute('aria-label'));
    if (label) return label;
    const by = el.getAttribute('aria-labelledby');
    if (by) {
      const text = by.split(/\s+/).map(id => document.getElementById(id))
        .filter(Boolean).map(n => n.textContent).join(' ');
      if (squash(text)) return squash(text);
    }
    if (el.labels && el.labels.length) {
      return squash(Array.from(el.labels).map(l => l.textContent).join(' '));
    }
    if (el.localName === 'img') return squash(el.getAttribute('alt'));
    return squash(el.innerText || el.textContent) || squash(el.getAttribute('title'));
  };
  const within = (roots, selector) => {
    const out = new Set();
    for (const root of roots) {
      for (const el of root.querySelectorAll(selector)) out.add(el);
    }
    return Array.from(out);
  };
  const resolve = steps => {
    let current = [document];
    for (const step of steps) {
      switch (step.kind) {
        case 'css':
          current = within(current, step.value);
          break;
        case 'testId':
          current = within(current, `[data-testid="${CSS.escape(step.value)}"]`);
          break;
        case 'role': {
          const wanted = step.name == null ? null : step.name.toLowerCase();
          current = within(current, '*').filter(el =>
            roleOf(el) === step.role && !hiddenFromTree(el) &&
            (wanted === null || nameOf(el).toLowerCase().includes(wanted)));
          break;
        }
        case 'nth':
          current = current[step.index] ? [current[step.index]] : [];
          break;
      }
    }
    return current.filter(n => n !== document);
  };
  const isVisible = el => {
    const style = getComputedStyle(el);
    if (style.visibility === 'hidden' || style.visibility === 'collapse') return false;
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  };
  const inViewport = el => {
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0 && r.bottom > 0 && r.right > 0 &&
      r.top < window.innerHeight && r.left < window.innerWidth;
  };
  const isEditable = el =>
    (el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement) ? !el.readOnly : el.isContentEditable;
  const state = el => {
    const r = el.getBoundingClientRect();
    const hasValue = el instanceof HTMLInputElement || el instanceof HTMLTextAreaElement || el instanceof HTMLSelectElement;
    return {
      visible: isVisible(el),
      inViewport: inViewport(el),
      focused: document.activeElement === el,
      enabled: !el.matches(':disabled'),
      text: squash(el.innerText || el.textContent),
      value: hasValue ? el.value : null,
      boundingBox: { x: r.x, y: r.y, width: r.width, height: r.height },
    };
  };
  const single = els => {
    if (els.length === 0) return { ok: false, reason: 'no matching element' };
    if (els.length > 1) return { ok: false, reason: `${els.length} elements match` };
    return null;
  };
  const describe = n => n ? n.localName + (n.id ? '#' + n.id : '') : 'nothing';
  const actionable = el => {
    if (!inViewport(el)) el.scrollIntoView({ block: 'center', inline: 'center', behavior: 'instant' });
    if (!isVisible(el)) return { ok: false, reason: 'element is not visible' };
    if (el.matches(':disabled')) return { ok: false, reason: 'element is disabled' };
    const r = el.getBoundingClientRect();
    const x = r.left + r.width / 2;
    const y = r.top + r.height / 2;
    const hit = document.elementFromPoint(x, y);
    if (!hit || !(hit === el || el.contains(hit))) {
      return { ok: false, reason: 'element is obscured by ' + describe(hit) };
    }
    return { ok: true, x, y };
  };
  return { resolve, state, single, actionable, isVisible, isEditable };
})();
"#;

#[derive(Debug, Deserialize)]
struct ActionTarget {
    ok: bool,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
}

#[derive(Debug, Deserialize)]
struct AttributeRead {
    found: bool,
    #[serde(default)]
    value: Option<String>,
}

fn query_script(query: &Query, body: &str) -> String {
    format!(
        "(() => {{ {prelude}\nconst els = __e2e.resolve({steps});\n{body}\n}})()",
        prelude = PRELUDE,
        steps = query.to_json(),
        body = body,
    )
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Launches and owns the shared Chromium process
pub struct ChromiumProvider {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumProvider {
    pub async fn launch(config: &HarnessConfig) -> E2eResult<Self> {
        let mut builder = BrowserConfig::builder().window_size(1280, 800);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        if config.ci {
            builder = builder.no_sandbox().arg("--disable-dev-shm-usage");
        }
        let browser_config = builder.build().map_err(E2eError::Browser)?;

        info!(headless = config.headless, "Launching Chromium");
        let (browser, mut handler) = Browser::launch(browser_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {}", e);
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler,
        })
    }

    /// Close the browser once every context has been released
    pub async fn shutdown(self) -> E2eResult<()> {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                browser.close().await?;
                let _ = browser.wait().await;
            }
            Err(_) => warn!("Browser still referenced at shutdown; relying on drop to kill it"),
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl ContextProvider for ChromiumProvider {
    async fn open(&self, viewport: Viewport) -> E2eResult<SharedContext> {
        let created = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await?;
        let browser_context = created.result.browser_context_id.clone();

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(browser_context.clone())
            .build()
            .map_err(E2eError::Browser)?;
        let page = self.browser.new_page(target).await?;

        let ctx = CdpContext {
            id: format!("{:?}", browser_context),
            page,
            browser: self.browser.clone(),
            browser_context,
            closed: AtomicBool::new(false),
        };
        ctx.set_viewport(viewport).await?;
        debug!(context = ctx.id(), %viewport, "Opened browser context");
        Ok(Arc::new(ctx))
    }
}

/// One CDP browser context with a single page
pub struct CdpContext {
    id: String,
    page: Page,
    browser: Arc<Browser>,
    browser_context: BrowserContextId,
    closed: AtomicBool,
}

impl CdpContext {
    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> E2eResult<T> {
        let value = self.evaluate(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn resolve_single(&self, query: &Query, check: &str) -> E2eResult<ActionTarget> {
        let body = format!(
            "const bad = __e2e.single(els); if (bad) return bad; const el = els[0]; {}",
            check
        );
        let target: ActionTarget = self.eval(query_script(query, &body)).await?;
        if !target.ok {
            return Err(E2eError::not_ready(
                query,
                target.reason.unwrap_or_else(|| "not actionable".to_string()),
            ));
        }
        Ok(target)
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> E2eResult<()> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(x).y(y);
        if kind != DispatchMouseEventType::MouseMoved {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(E2eError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn key_event(&self, kind: DispatchKeyEventType, key: Key) -> E2eResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind.clone())
            .key(key.as_str())
            .code(key.code())
            .windows_virtual_key_code(key.key_code())
            .native_virtual_key_code(key.key_code());
        if kind == DispatchKeyEventType::KeyDown {
            if let Some(text) = key.text() {
                builder = builder.text(text);
            }
        }
        let params = builder.build().map_err(E2eError::Browser)?;
        self.page.execute(params).await?;
        Ok(())
    }
}

#[async_trait]
impl BrowsingContext for CdpContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.page.goto(url).await.map_err(|e| E2eError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    async fn url(&self) -> E2eResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width as i64)
            .height(viewport.height as i64)
            .device_scale_factor(1.0)
            .mobile(viewport.is_mobile())
            .build()
            .map_err(E2eError::Browser)?;
        self.page.execute(params).await?;

        let touch = SetTouchEmulationEnabledParams::builder()
            .enabled(viewport.is_mobile())
            .build()
            .map_err(E2eError::Browser)?;
        self.page.execute(touch).await?;
        Ok(())
    }

    async fn count(&self, query: &Query) -> E2eResult<usize> {
        self.eval(query_script(query, "return els.length;")).await
    }

    async fn inspect(&self, query: &Query) -> E2eResult<Option<ElementState>> {
        self.eval(query_script(
            query,
            "return els.length ? __e2e.state(els[0]) : null;",
        ))
        .await
    }

    async fn attribute(&self, query: &Query, name: &str) -> E2eResult<Option<String>> {
        let body = format!(
            "if (!els.length) return {{ found: false }}; return {{ found: true, value: els[0].getAttribute({}) }};",
            js_string(name)
        );
        let target: AttributeRead = self.eval(query_script(query, &body)).await?;
        if !target.found {
            return Err(E2eError::not_ready(query, "no matching element"));
        }
        Ok(target.value)
    }

    async fn click(&self, query: &Query) -> E2eResult<()> {
        let target = self
            .resolve_single(query, "return __e2e.actionable(el);")
            .await?;
        self.mouse(DispatchMouseEventType::MouseMoved, target.x, target.y).await?;
        self.mouse(DispatchMouseEventType::MousePressed, target.x, target.y).await?;
        self.mouse(DispatchMouseEventType::MouseReleased, target.x, target.y).await
    }

    async fn focus(&self, query: &Query) -> E2eResult<()> {
        self.resolve_single(
            query,
            "el.focus(); return document.activeElement === el \
             ? { ok: true } : { ok: false, reason: 'element is not focusable' };",
        )
        .await?;
        Ok(())
    }

    async fn fill(&self, query: &Query, value: &str) -> E2eResult<()> {
        self.resolve_single(
            query,
            "const a = __e2e.actionable(el); if (!a.ok) return a; \
             if (!__e2e.isEditable(el)) return { ok: false, reason: 'element is not editable' }; \
             el.focus(); el.value = ''; \
             el.dispatchEvent(new Event('input', { bubbles: true })); return a;",
        )
        .await?;
        if !value.is_empty() {
            self.page.execute(InsertTextParams::new(value)).await?;
        }
        Ok(())
    }

    async fn press(&self, key: Key) -> E2eResult<()> {
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn scroll_into_view(&self, query: &Query) -> E2eResult<()> {
        let body = "if (!els.length) return { ok: false, reason: 'no matching element' }; \
                    els[0].scrollIntoView({ block: 'center', behavior: 'instant' }); return { ok: true };";
        let target: ActionTarget = self.eval(query_script(query, body)).await?;
        if !target.ok {
            return Err(E2eError::not_ready(
                query,
                target.reason.unwrap_or_default(),
            ));
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> E2eResult<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(E2eError::Browser)?;
        let result = self.page.evaluate_expression(params).await?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        Ok(self.page.screenshot(ScreenshotParams::builder().build()).await?)
    }

    async fn close(&self) -> E2eResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.page.clone().close().await {
            warn!(context = %self.id, "Page close failed: {}", e);
        }
        self.browser
            .execute(DisposeBrowserContextParams::new(self.browser_context.clone()))
            .await?;
        debug!(context = %self.id, "Disposed browser context");
        Ok(())
    }
}
