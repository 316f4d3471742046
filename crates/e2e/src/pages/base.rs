//! Shared chrome: sidebar navigation, theme toggle, top-bar links

use tracing::debug;

use crate::error::{E2eError, E2eResult};
use crate::locator::{BrowserPage, Locator};
use crate::model::{Section, Theme};
use crate::wait;

#[derive(Debug, Clone)]
pub struct BasePage {
    page: BrowserPage,
    pub sidebar: Locator,
    pub nav_links: Locator,
    pub theme_toggle: Locator,
    pub github_link: Locator,
    pub linkedin_link: Locator,
    pub skip_link: Locator,
    pub back_to_top: Locator,
    pub logo: Locator,
}

impl BasePage {
    pub fn new(page: BrowserPage) -> Self {
        Self {
            sidebar: page.get_by_test_id("sidebar"),
            nav_links: page.locator(".nav-link[data-section]"),
            theme_toggle: page.get_by_test_id("theme-toggle"),
            github_link: page.get_by_test_id("github-link"),
            linkedin_link: page.get_by_test_id("linkedin-link"),
            skip_link: page.get_by_test_id("skip-link"),
            back_to_top: page.get_by_test_id("back-to-top"),
            logo: page.get_by_test_id("logo"),
            page,
        }
    }

    pub fn page(&self) -> &BrowserPage {
        &self.page
    }

    /// Load the target address
    pub async fn goto(&self) -> E2eResult<()> {
        self.page.goto("./").await
    }

    /// Activate the sidebar control for a section. Whether the section
    /// actually became active is for the caller to assert.
    pub async fn navigate_to(&self, section: Section) -> E2eResult<()> {
        let control = self.nav_control(section);
        if !section.is_navigable() {
            return Err(E2eError::not_ready(
                control.query(),
                format!("section '{}' has no navigation control", section),
            ));
        }
        debug!(%section, "navigate to section");
        control.click().await
    }

    pub fn nav_control(&self, section: Section) -> Locator {
        self.page.get_by_test_id(format!("nav-{}", section))
    }

    pub fn section(&self, section: Section) -> Locator {
        self.page.get_by_test_id(format!("section-{}", section))
    }

    /// Bring a section into view by scrolling, as a reader would
    pub async fn scroll_to(&self, section: Section) -> E2eResult<()> {
        self.section(section).scroll_into_view().await
    }

    pub async fn toggle_theme(&self) -> E2eResult<()> {
        self.theme_toggle.click().await
    }

    /// Current theme; a missing `data-theme` attribute reads as dark
    pub async fn theme(&self) -> E2eResult<Theme> {
        let value = self.page.locator("html").attribute("data-theme").await?;
        Ok(Theme::from_attribute(value.as_deref()))
    }

    /// Section whose nav link carries `aria-current="true"`, if any
    pub async fn active_section(&self) -> E2eResult<Option<Section>> {
        let current = self.page.locator(".nav-link[aria-current=\"true\"]");
        if current.count().await? == 0 {
            return Ok(None);
        }
        // The marker can move between the count and the read mid-scroll
        let marker = match current.first().attribute("data-section").await {
            Err(E2eError::ElementNotReady { .. }) => return Ok(None),
            other => other?,
        };
        match marker {
            None => Ok(None),
            Some(raw) => raw.parse::<Section>().map(Some).map_err(|e| {
                E2eError::AssertionFailed(format!("active nav link has {}", e))
            }),
        }
    }

    /// Poll until the scroll spy marks `section` as current
    pub async fn wait_for_active_section(&self, section: Section) -> E2eResult<()> {
        let timeouts = self.page.timeouts();
        let what = format!("active section {}", section);
        wait::until(timeouts.expect_wait(), &what, || async move {
            Ok(self.active_section().await? == Some(section))
        })
        .await
        .map_err(|e| match e {
            E2eError::Timeout(detail) => E2eError::AssertionFailed(format!("expected {}", detail)),
            other => other,
        })
    }

    /// Poll until the theme reads `expected`
    pub async fn wait_for_theme(&self, expected: Theme) -> E2eResult<()> {
        let what = format!("theme {}", expected.as_str());
        wait::until(self.page.timeouts().expect_wait(), &what, || async move {
            Ok(self.theme().await? == expected)
        })
        .await
    }
}
