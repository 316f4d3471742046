//! In-memory stand-in for the portfolio site
//!
//! `FakeProvider` hands out `FakeContext`s that resolve the same queries the
//! page surfaces issue against a small model of the page: sidebar and scroll
//! spy, theme, career accordion, report viewer and contact form.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use portfolio_e2e::browser::{BoundingBox, ElementState, Key};
use portfolio_e2e::config::Resolver;
use portfolio_e2e::locator::Selector;
use portfolio_e2e::model::{Framework, Section, Viewport};
use portfolio_e2e::{
    BrowsingContext, ConfigKey, ContextProvider, E2eError, E2eResult, HarnessConfig, Query,
    SharedContext,
};

/// Source handed to `AuditEngine::from_script`
pub const FAKE_AXE: &str = "/* fake axe */ window.axe = { run: async () => ({ violations: [] }) };";

pub const CAREER_ENTRIES: usize = 3;

/// Resolver with fast timeouts for the fake site
pub fn test_resolver(output_dir: &std::path::Path) -> Resolver {
    Resolver::new(HashMap::<String, String>::new())
        .with_override(ConfigKey::BaseUrl, "http://portfolio.test/")
        .with_override(ConfigKey::Workers, "2")
        .with_override(ConfigKey::ActionTimeoutMs, "300")
        .with_override(ConfigKey::ExpectTimeoutMs, "300")
        .with_override(ConfigKey::TestTimeoutMs, "2000")
        .with_override(ConfigKey::Projects, "chromium")
        .with_override(ConfigKey::OutputDir, output_dir.display().to_string())
}

pub fn test_config(output_dir: &std::path::Path) -> Arc<HarnessConfig> {
    Arc::new(HarnessConfig::resolve(&test_resolver(output_dir)).expect("test config resolves"))
}

#[derive(Debug, Clone, Default)]
pub struct SiteOptions {
    /// Report viewer shows the fallback notice instead of the frame
    pub report_fallback: bool,
    /// Violations returned by every audit, as axe result objects
    pub violations: Vec<Value>,
    /// `open` fails as if the browser were gone
    pub fail_open: bool,
    /// Theme reads lag this many polls behind a toggle
    pub theme_lag: u32,
    /// Outbound links reported on the page
    pub page_links: Vec<String>,
    /// `close` never completes, like a wedged CDP session
    pub hang_close: bool,
}

#[derive(Debug, Default)]
pub struct SiteLog {
    pub opened: Vec<String>,
    pub closed: Vec<String>,
    pub viewports: Vec<Viewport>,
    pub audits: usize,
    pub axe_injections: usize,
}

pub struct FakeProvider {
    options: SiteOptions,
    log: Arc<Mutex<SiteLog>>,
    next_id: AtomicUsize,
}

impl FakeProvider {
    pub fn new(options: SiteOptions) -> Self {
        Self {
            options,
            log: Arc::new(Mutex::new(SiteLog::default())),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn log(&self) -> Arc<Mutex<SiteLog>> {
        self.log.clone()
    }

    /// Context opened directly, bypassing the fixture system
    pub fn context(&self, viewport: Viewport) -> Arc<FakeContext> {
        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.log.lock().opened.push(id.clone());
        Arc::new(FakeContext {
            id,
            options: self.options.clone(),
            log: self.log.clone(),
            state: Mutex::new(PageState::loaded("about:blank".into(), viewport)),
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl ContextProvider for FakeProvider {
    async fn open(&self, viewport: Viewport) -> E2eResult<SharedContext> {
        if self.options.fail_open {
            return Err(E2eError::Browser("browser is not running".into()));
        }
        let ctx = self.context(viewport);
        ctx.set_viewport(viewport).await?;
        Ok(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum El {
    Html,
    Main,
    Sidebar,
    SocialNav,
    NavLink(Section),
    ThemeToggle,
    GithubLink,
    LinkedinLink,
    SkipLink,
    BackToTop,
    Logo,
    Section(Section),
    CareerTable,
    Header(usize),
    Expand(usize),
    Detail(usize),
    Card(Framework),
    RepoLink(Framework),
    ReportButton(Framework),
    Viewer,
    Iframe,
    Fallback,
    CloseReport,
    NameLabel,
    NameInput,
    NameError,
    EmailLabel,
    EmailInput,
    Send,
    Toast,
}

/// Document order
fn all_elements() -> Vec<El> {
    let mut out = vec![El::Html, El::SkipLink, El::Sidebar, El::Logo];
    out.extend(Section::NAVIGABLE.iter().map(|s| El::NavLink(*s)));
    out.extend([El::SocialNav, El::GithubLink, El::LinkedinLink, El::ThemeToggle, El::Main]);
    out.push(El::Section(Section::Intro));
    out.extend([El::Section(Section::Career), El::CareerTable]);
    out.extend((0..4).map(El::Header));
    for i in 0..CAREER_ENTRIES {
        out.extend([El::Expand(i), El::Detail(i)]);
    }
    out.push(El::Section(Section::Demos));
    for fw in Framework::ALL {
        out.extend([El::Card(fw), El::RepoLink(fw), El::ReportButton(fw)]);
    }
    out.extend([El::Viewer, El::CloseReport, El::Iframe, El::Fallback]);
    out.extend([
        El::Section(Section::Contact),
        El::NameLabel,
        El::NameInput,
        El::NameError,
        El::EmailLabel,
        El::EmailInput,
        El::Send,
    ]);
    out.extend([El::Toast, El::BackToTop]);
    out
}

fn parent(el: El) -> Option<El> {
    match el {
        El::NavLink(_) | El::Logo => Some(El::Sidebar),
        El::GithubLink | El::LinkedinLink | El::ThemeToggle => Some(El::SocialNav),
        El::Header(_) | El::Expand(_) | El::Detail(_) => Some(El::CareerTable),
        El::CareerTable => Some(El::Section(Section::Career)),
        El::RepoLink(fw) | El::ReportButton(fw) => Some(El::Card(fw)),
        El::Card(_) | El::Viewer => Some(El::Section(Section::Demos)),
        El::CloseReport | El::Iframe | El::Fallback => Some(El::Viewer),
        El::NameLabel | El::NameInput | El::NameError | El::EmailLabel | El::EmailInput | El::Send => {
            Some(El::Section(Section::Contact))
        }
        El::Section(_) => Some(El::Main),
        El::Html => None,
        _ => Some(El::Html),
    }
}

fn is_descendant(el: El, ancestor: El) -> bool {
    let mut current = parent(el);
    while let Some(p) = current {
        if p == ancestor {
            return true;
        }
        current = parent(p);
    }
    ancestor == El::Html && el != El::Html
}

fn test_id(el: El) -> Option<String> {
    let id = match el {
        El::Sidebar => "sidebar".to_string(),
        El::NavLink(s) => format!("nav-{}", s),
        El::ThemeToggle => "theme-toggle".into(),
        El::GithubLink => "github-link".into(),
        El::LinkedinLink => "linkedin-link".into(),
        El::SkipLink => "skip-link".into(),
        El::BackToTop => "back-to-top".into(),
        El::Logo => "logo".into(),
        El::Section(s) => format!("section-{}", s),
        El::CareerTable => "career-table".into(),
        El::Expand(i) => format!("expand-{}", i),
        El::Detail(i) => format!("career-detail-{}", i),
        El::Card(fw) => format!("card-{}", fw),
        El::Viewer => "report-viewer".into(),
        El::Iframe => "report-iframe".into(),
        El::Fallback => "report-fallback".into(),
        El::CloseReport => "close-report".into(),
        El::Toast => "toast".into(),
        _ => return None,
    };
    Some(id)
}

fn element_id(el: El) -> Option<String> {
    match el {
        El::Main => Some("main".into()),
        El::Detail(i) => Some(format!("detail-{}", i)),
        El::NameInput => Some("name".into()),
        El::EmailInput => Some("email".into()),
        El::NameError => Some("name-error".into()),
        _ => None,
    }
}

fn role(el: El) -> Option<(&'static str, &'static str)> {
    match el {
        El::Main => Some(("main", "")),
        El::Sidebar => Some(("navigation", "Main sections")),
        El::SocialNav => Some(("navigation", "Social links")),
        El::Send => Some(("button", "Send")),
        El::ThemeToggle => Some(("button", "Toggle theme")),
        El::Expand(_) => Some(("button", "Show details")),
        El::ReportButton(_) => Some(("button", "View reports")),
        El::CloseReport => Some(("button", "Close report")),
        El::BackToTop => Some(("button", "Back to top")),
        El::NameError => Some(("alert", "")),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct PageState {
    url: String,
    viewport: Viewport,
    theme: Option<&'static str>,
    pending_theme: Option<(&'static str, u32)>,
    scrolled: Section,
    active: Option<Section>,
    expanded: Option<usize>,
    viewer: Option<Framework>,
    name: String,
    email: String,
    name_invalid: bool,
    toast: bool,
    focused: Option<El>,
    axe_loaded: bool,
}

impl PageState {
    fn loaded(url: String, viewport: Viewport) -> Self {
        Self {
            url,
            viewport,
            theme: None,
            pending_theme: None,
            scrolled: Section::Intro,
            active: Some(Section::Intro),
            expanded: Some(0),
            viewer: None,
            name: String::new(),
            email: String::new(),
            name_invalid: false,
            toast: false,
            focused: None,
            axe_loaded: false,
        }
    }

    fn theme_attribute(&mut self) -> Option<String> {
        if let Some((target, remaining)) = self.pending_theme {
            if remaining == 0 {
                self.theme = Some(target);
                self.pending_theme = None;
            } else {
                self.pending_theme = Some((target, remaining - 1));
            }
        }
        self.theme.map(String::from)
    }
}

pub struct FakeContext {
    id: String,
    options: SiteOptions,
    log: Arc<Mutex<SiteLog>>,
    state: Mutex<PageState>,
    closed: AtomicBool,
}

impl FakeContext {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> E2eResult<()> {
        if self.is_closed() {
            return Err(E2eError::Browser(format!("context {} is closed", self.id)));
        }
        Ok(())
    }

    fn css_matches(&self, st: &PageState, selector: &str, el: El) -> E2eResult<bool> {
        let matched = match selector {
            "html" => el == El::Html,
            ".nav-link[data-section]" => matches!(el, El::NavLink(_)),
            ".nav-link[aria-current=\"true\"]" => matches!(el, El::NavLink(s) if st.active == Some(s)),
            "[data-testid^=\"expand-\"]" => matches!(el, El::Expand(_)),
            ".framework-card" => matches!(el, El::Card(_)),
            "a" => matches!(
                el,
                El::RepoLink(_) | El::GithubLink | El::LinkedinLink | El::SkipLink
            ),
            ".link-btn" => matches!(el, El::ReportButton(_)),
            "th" => matches!(el, El::Header(_)),
            "#name" => el == El::NameInput,
            "#email" => el == El::EmailInput,
            "#name-error" => el == El::NameError,
            "label[for=\"name\"]" => el == El::NameLabel,
            "label[for=\"email\"]" => el == El::EmailLabel,
            other => match other.strip_prefix("[id=\"").and_then(|s| s.strip_suffix("\"]")) {
                Some(id) => element_id(el).as_deref() == Some(id),
                None => {
                    return Err(E2eError::Browser(format!(
                        "fake site does not support selector {}",
                        other
                    )))
                }
            },
        };
        Ok(matched)
    }

    fn resolve(&self, st: &PageState, query: &Query) -> E2eResult<Vec<El>> {
        let mut current: Option<Vec<El>> = None;
        for step in query.steps() {
            if let Selector::Nth { index } = step {
                let previous = current.unwrap_or_default();
                current = Some(previous.get(*index).copied().into_iter().collect());
                continue;
            }
            let pool: Vec<El> = match &current {
                None => all_elements(),
                Some(scopes) => all_elements()
                    .into_iter()
                    .filter(|el| scopes.iter().any(|s| is_descendant(*el, *s)))
                    .collect(),
            };
            let mut next = Vec::new();
            for el in pool {
                let keep = match step {
                    Selector::Css { value } => self.css_matches(st, value, el)?,
                    Selector::TestId { value } => test_id(el).as_deref() == Some(value.as_str()),
                    Selector::Role { role: wanted, name } => match role(el) {
                        Some((r, accessible)) => {
                            r == wanted.as_str()
                                && self.visible(st, el)
                                && name.as_ref().map_or(true, |n| {
                                    accessible.to_lowercase().contains(&n.to_lowercase())
                                })
                        }
                        None => false,
                    },
                    Selector::Nth { .. } => unreachable!("handled above"),
                };
                if keep {
                    next.push(el);
                }
            }
            current = Some(next);
        }
        Ok(current.unwrap_or_default())
    }

    fn visible(&self, st: &PageState, el: El) -> bool {
        match el {
            El::BackToTop => st.scrolled != Section::Intro,
            El::Logo => !st.viewport.is_mobile(),
            El::Detail(i) => st.expanded == Some(i),
            El::Viewer | El::CloseReport => st.viewer.is_some(),
            El::Iframe => st.viewer.is_some() && !self.options.report_fallback,
            El::Fallback => st.viewer.is_some() && self.options.report_fallback,
            El::NameError => st.name_invalid,
            El::Toast => st.toast,
            _ => true,
        }
    }

    fn bounding_box(&self, st: &PageState, el: El) -> BoundingBox {
        let w = f64::from(st.viewport.width);
        let h = f64::from(st.viewport.height);
        let mobile = st.viewport.is_mobile();
        match el {
            El::Sidebar if mobile => BoundingBox { x: 0.0, y: h - 64.0, width: w, height: 64.0 },
            El::Sidebar => BoundingBox { x: 0.0, y: 0.0, width: 220.0, height: h },
            El::NavLink(s) => {
                let i = Section::NAVIGABLE.iter().position(|n| *n == s).unwrap_or(0) as f64;
                if mobile {
                    BoundingBox { x: 20.0 + 100.0 * i, y: h - 52.0, width: 90.0, height: 40.0 }
                } else {
                    BoundingBox { x: 20.0, y: 120.0 + 48.0 * i, width: 180.0, height: 40.0 }
                }
            }
            El::Toast if mobile => BoundingBox { x: 16.0, y: h - 150.0, width: w - 32.0, height: 50.0 },
            El::Toast => BoundingBox { x: w - 340.0, y: h - 90.0, width: 320.0, height: 50.0 },
            _ => BoundingBox { x: 240.0, y: 100.0, width: 200.0, height: 40.0 },
        }
    }

    fn state_of(&self, st: &PageState, el: El) -> ElementState {
        let visible = self.visible(st, el);
        let in_viewport = match el {
            El::Section(s) => st.scrolled == s,
            El::SkipLink => st.focused == Some(El::SkipLink),
            _ => visible,
        };
        let text = match el {
            El::Send => "Send".to_string(),
            El::Toast => "Demo only: messages are not delivered".to_string(),
            El::NameError => "Please enter your name".to_string(),
            other => role(other).map(|(_, name)| name.to_string()).unwrap_or_default(),
        };
        let value = match el {
            El::NameInput => Some(st.name.clone()),
            El::EmailInput => Some(st.email.clone()),
            _ => None,
        };
        ElementState {
            visible,
            in_viewport,
            focused: st.focused == Some(el),
            enabled: true,
            text,
            value,
            bounding_box: visible.then(|| self.bounding_box(st, el)),
        }
    }

    fn attribute_of(&self, st: &mut PageState, el: El, name: &str) -> Option<String> {
        if name == "data-testid" {
            return test_id(el);
        }
        if name == "id" {
            return element_id(el);
        }
        match (el, name) {
            (El::Html, "data-theme") => st.theme_attribute(),
            (El::NavLink(s), "data-section") => Some(s.to_string()),
            (El::NavLink(s), "aria-current") => (st.active == Some(s)).then(|| "true".to_string()),
            (El::GithubLink, "href") => Some("https://github.com/nokillkenny".into()),
            (El::LinkedinLink, "href") => Some("https://linkedin.com/in/kenny-lin".into()),
            (El::SkipLink, "href") => Some("#main".into()),
            (El::Expand(i), "aria-expanded") => Some((st.expanded == Some(i)).to_string()),
            (El::Expand(i), "aria-controls") => Some(format!("detail-{}", i)),
            (El::RepoLink(fw), "href") => Some(format!("https://github.com/nokillkenny/{}-demo", fw)),
            (El::Iframe, "src") => st
                .viewer
                .map(|fw| format!("https://nokillkenny.github.io/reports/{}/", fw)),
            (El::Iframe, "sandbox") => Some("allow-scripts allow-same-origin allow-popups".into()),
            (El::NameInput, "aria-required") | (El::EmailInput, "aria-required") => Some("true".into()),
            (El::NameInput, "aria-describedby") => Some("name-error".into()),
            (El::NameInput, "aria-invalid") => st.name_invalid.then(|| "true".to_string()),
            (El::NameError, "role") => Some("alert".into()),
            (El::Toast, "aria-live") => Some("polite".into()),
            _ => None,
        }
    }

    fn single(&self, st: &PageState, query: &Query) -> E2eResult<El> {
        let matches = self.resolve(st, query)?;
        match matches.as_slice() {
            [] => Err(E2eError::not_ready(query, "no matching element")),
            [el] => Ok(*el),
            many => Err(E2eError::not_ready(query, format!("{} elements match", many.len()))),
        }
    }

    fn activate(&self, st: &mut PageState, el: El) {
        match el {
            El::NavLink(s) => {
                st.scrolled = s;
                st.active = Some(s);
            }
            El::ThemeToggle => {
                let current = st.pending_theme.map(|(t, _)| t).or(st.theme).unwrap_or("dark");
                let target = if current == "dark" { "light" } else { "dark" };
                if self.options.theme_lag == 0 {
                    st.theme = Some(target);
                } else {
                    st.pending_theme = Some((target, self.options.theme_lag));
                }
            }
            El::BackToTop => {
                st.scrolled = Section::Intro;
                st.active = Some(Section::Intro);
            }
            El::Expand(i) => {
                st.expanded = if st.expanded == Some(i) { None } else { Some(i) };
            }
            El::ReportButton(fw) => st.viewer = Some(fw),
            El::CloseReport => st.viewer = None,
            El::Send => {
                if st.name.trim().is_empty() || st.email.trim().is_empty() {
                    st.name_invalid = st.name.trim().is_empty();
                    st.toast = false;
                } else {
                    st.name_invalid = false;
                    st.toast = true;
                    st.name.clear();
                    st.email.clear();
                }
            }
            El::SkipLink => {
                if !st.url.ends_with("#main") {
                    st.url.push_str("#main");
                }
            }
            _ => {}
        }
    }
}

#[async_trait]
impl BrowsingContext for FakeContext {
    fn id(&self) -> &str {
        &self.id
    }

    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        let viewport = st.viewport;
        *st = PageState::loaded(url.to_string(), viewport);
        Ok(())
    }

    async fn url(&self) -> E2eResult<String> {
        self.ensure_open()?;
        Ok(self.state.lock().url.clone())
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        self.ensure_open()?;
        self.state.lock().viewport = viewport;
        self.log.lock().viewports.push(viewport);
        Ok(())
    }

    async fn count(&self, query: &Query) -> E2eResult<usize> {
        self.ensure_open()?;
        let st = self.state.lock();
        Ok(self.resolve(&st, query)?.len())
    }

    async fn inspect(&self, query: &Query) -> E2eResult<Option<ElementState>> {
        self.ensure_open()?;
        let st = self.state.lock();
        Ok(self.resolve(&st, query)?.first().map(|el| self.state_of(&st, *el)))
    }

    async fn attribute(&self, query: &Query, name: &str) -> E2eResult<Option<String>> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        let el = self
            .resolve(&st, query)?
            .first()
            .copied()
            .ok_or_else(|| E2eError::not_ready(query, "no matching element"))?;
        Ok(self.attribute_of(&mut st, el, name))
    }

    async fn click(&self, query: &Query) -> E2eResult<()> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        let el = self.single(&st, query)?;
        if !self.visible(&st, el) {
            return Err(E2eError::not_ready(query, "element is not visible"));
        }
        st.focused = Some(el);
        self.activate(&mut st, el);
        Ok(())
    }

    async fn focus(&self, query: &Query) -> E2eResult<()> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        let el = self.single(&st, query)?;
        st.focused = Some(el);
        Ok(())
    }

    async fn fill(&self, query: &Query, value: &str) -> E2eResult<()> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        match self.single(&st, query)? {
            El::NameInput => st.name = value.to_string(),
            El::EmailInput => st.email = value.to_string(),
            _ => return Err(E2eError::not_ready(query, "element is not editable")),
        }
        Ok(())
    }

    async fn press(&self, key: Key) -> E2eResult<()> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        if matches!(key, Key::Enter | Key::Space) {
            if let Some(el) = st.focused {
                self.activate(&mut st, el);
            }
        }
        Ok(())
    }

    async fn scroll_into_view(&self, query: &Query) -> E2eResult<()> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        let el = self.single(&st, query)?;
        if let El::Section(s) = el {
            st.scrolled = s;
            if s.is_navigable() {
                st.active = Some(s);
            }
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> E2eResult<Value> {
        self.ensure_open()?;
        let mut st = self.state.lock();
        if script.contains("axe.run") {
            if !st.axe_loaded {
                return Err(E2eError::Browser("ReferenceError: axe is not defined".into()));
            }
            self.log.lock().audits += 1;
            let contrast_off = script.contains(r#""color-contrast":{"enabled":false}"#);
            let violations: Vec<Value> = self
                .options
                .violations
                .iter()
                .filter(|v| !(contrast_off && v["id"] == "color-contrast"))
                .cloned()
                .collect();
            return Ok(Value::Array(violations));
        }
        if script.contains(FAKE_AXE) {
            st.axe_loaded = true;
            self.log.lock().axe_injections += 1;
            return Ok(Value::Bool(true));
        }
        if script.starts_with("typeof window.axe") {
            return Ok(Value::Bool(st.axe_loaded));
        }
        if script.contains("a[href^=") {
            return Ok(json!(self.options.page_links));
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        self.ensure_open()?;
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn close(&self) -> E2eResult<()> {
        if self.options.hang_close {
            futures::future::pending::<()>().await;
        }
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.log.lock().closed.push(self.id.clone());
        }
        Ok(())
    }
}

/// Axe-shaped violation record
pub fn violation(id: &str, nodes: usize) -> Value {
    json!({
        "id": id,
        "impact": "serious",
        "help": format!("{} rule", id),
        "helpUrl": format!("https://dequeuniversity.com/rules/axe/4.10/{}", id),
        "targets": (0..nodes).map(|i| format!("#node-{}", i)).collect::<Vec<_>>(),
    })
}
