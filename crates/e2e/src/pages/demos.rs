//! Demos section: framework cards and the embedded report viewer

use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::locator::{BrowserPage, Locator};
use crate::model::{Framework, Section, Theme};
use crate::pages::{BasePage, SandboxFlags};
use crate::wait;

/// What the report viewer ended up showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportContent {
    Frame,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DemosPage {
    base: BasePage,
    pub section: Locator,
    pub framework_cards: Locator,
    pub report_viewer: Locator,
    pub report_iframe: Locator,
    pub report_fallback: Locator,
    pub close_button: Locator,
}

impl DemosPage {
    pub fn new(page: BrowserPage) -> Self {
        Self::from_base(BasePage::new(page))
    }

    pub fn from_base(base: BasePage) -> Self {
        let page = base.page();
        Self {
            section: page.get_by_test_id("section-demos"),
            framework_cards: page.locator(".framework-card"),
            report_viewer: page.get_by_test_id("report-viewer"),
            report_iframe: page.get_by_test_id("report-iframe"),
            report_fallback: page.get_by_test_id("report-fallback"),
            close_button: page.get_by_test_id("close-report"),
            base,
        }
    }

    pub fn base(&self) -> &BasePage {
        &self.base
    }

    pub async fn goto(&self) -> E2eResult<()> {
        self.base.goto().await
    }

    pub async fn navigate_to(&self, section: Section) -> E2eResult<()> {
        self.base.navigate_to(section).await
    }

    pub async fn toggle_theme(&self) -> E2eResult<()> {
        self.base.toggle_theme().await
    }

    pub async fn theme(&self) -> E2eResult<Theme> {
        self.base.theme().await
    }

    pub async fn active_section(&self) -> E2eResult<Option<Section>> {
        self.base.active_section().await
    }

    pub fn card(&self, framework: Framework) -> Locator {
        self.base.page().get_by_test_id(format!("card-{}", framework))
    }

    pub fn repo_link(&self, framework: Framework) -> Locator {
        self.card(framework).locator("a")
    }

    pub async fn open_report(&self, framework: Framework) -> E2eResult<()> {
        debug!(%framework, "open report viewer");
        self.card(framework).locator(".link-btn").click().await
    }

    pub async fn close_report(&self) -> E2eResult<()> {
        self.close_button.click().await
    }

    /// `src` of the embedded report frame
    pub async fn iframe_src(&self) -> E2eResult<Option<String>> {
        self.report_iframe.attribute("src").await
    }

    pub async fn iframe_sandbox(&self) -> E2eResult<SandboxFlags> {
        let raw = self.report_iframe.attribute("sandbox").await?;
        Ok(SandboxFlags::parse(raw.as_deref()))
    }

    /// Wait until the viewer shows either the frame or the fallback notice.
    /// The frame wins when both happen to be visible.
    pub async fn wait_for_report_content(&self) -> E2eResult<ReportContent> {
        wait::until_some(
            self.base.page().timeouts().expect_wait(),
            "report frame or fallback to be visible",
            || async move {
                if self.report_iframe.is_visible().await? {
                    return Ok(Some(ReportContent::Frame));
                }
                if self.report_fallback.is_visible().await? {
                    return Ok(Some(ReportContent::Fallback));
                }
                Ok(None)
            },
        )
        .await
        .map_err(|e| match e {
            E2eError::Timeout(detail) => E2eError::AssertionFailed(format!("expected {}", detail)),
            other => other,
        })
    }
}
