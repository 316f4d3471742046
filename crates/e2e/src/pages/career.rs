//! Career section: the experience table and its accordion rows

use crate::error::{E2eError, E2eResult};
use crate::locator::{BrowserPage, Locator};
use crate::model::{Section, Theme};
use crate::pages::BasePage;
use crate::wait;

#[derive(Debug, Clone)]
pub struct CareerPage {
    base: BasePage,
    pub section: Locator,
    pub table: Locator,
    pub expand_buttons: Locator,
}

impl CareerPage {
    pub fn new(page: BrowserPage) -> Self {
        Self::from_base(BasePage::new(page))
    }

    pub fn from_base(base: BasePage) -> Self {
        let page = base.page();
        Self {
            section: page.get_by_test_id("section-career"),
            table: page.get_by_test_id("career-table"),
            expand_buttons: page.locator("[data-testid^=\"expand-\"]"),
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

    pub fn expand_button(&self, index: usize) -> Locator {
        self.base.page().get_by_test_id(format!("expand-{}", index))
    }

    pub fn detail(&self, index: usize) -> Locator {
        self.base.page().get_by_test_id(format!("career-detail-{}", index))
    }

    pub async fn entry_count(&self) -> E2eResult<usize> {
        self.expand_buttons.count().await
    }

    /// Click an entry's expand control. Opening one entry closes any other.
    pub async fn toggle_entry(&self, index: usize) -> E2eResult<()> {
        self.expand_button(index).click().await
    }

    pub async fn is_expanded(&self, index: usize) -> E2eResult<bool> {
        Ok(self
            .expand_button(index)
            .attribute("aria-expanded")
            .await?
            .as_deref()
            == Some("true"))
    }

    /// Indices of entries whose control reports `aria-expanded="true"`
    pub async fn expanded_entries(&self) -> E2eResult<Vec<usize>> {
        let mut expanded = Vec::new();
        for index in 0..self.entry_count().await? {
            if self.is_expanded(index).await? {
                expanded.push(index);
            }
        }
        Ok(expanded)
    }

    /// Expand an entry if it is collapsed and wait for the state to settle
    pub async fn expand(&self, index: usize) -> E2eResult<()> {
        if !self.is_expanded(index).await? {
            self.toggle_entry(index).await?;
        }
        let what = format!("entry {} expanded", index);
        wait::until(self.base.page().timeouts().expect_wait(), &what, || {
            self.is_expanded(index)
        })
        .await
    }

    /// Region referenced by an entry's `aria-controls`
    pub async fn controlled_region(&self, index: usize) -> E2eResult<(String, Locator)> {
        let button = self.expand_button(index);
        let id = button.attribute("aria-controls").await?.ok_or_else(|| {
            E2eError::AssertionFailed(format!("{} has no aria-controls", button.query()))
        })?;
        let region = self.base.page().locator(format!("[id=\"{}\"]", id));
        Ok((id, region))
    }
}
