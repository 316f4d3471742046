//! Contact form

use crate::error::E2eResult;
use crate::locator::{BrowserPage, Locator};
use crate::model::{Section, Theme};
use crate::pages::BasePage;

#[derive(Debug, Clone)]
pub struct ContactPage {
    base: BasePage,
    pub section: Locator,
    pub name_input: Locator,
    pub email_input: Locator,
    pub name_label: Locator,
    pub email_label: Locator,
    pub name_error: Locator,
    pub send_button: Locator,
    pub toast: Locator,
}

impl ContactPage {
    pub fn new(page: BrowserPage) -> Self {
        Self::from_base(BasePage::new(page))
    }

    pub fn from_base(base: BasePage) -> Self {
        let page = base.page();
        Self {
            section: page.get_by_test_id("section-contact"),
            name_input: page.locator("#name"),
            email_input: page.locator("#email"),
            name_label: page.locator("label[for=\"name\"]"),
            email_label: page.locator("label[for=\"email\"]"),
            name_error: page.locator("#name-error"),
            send_button: page.get_by_role("button", Some("Send")),
            toast: page.get_by_test_id("toast"),
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

    /// Load the page and bring the form into view
    pub async fn open(&self) -> E2eResult<()> {
        self.base.goto().await?;
        self.base.scroll_to(Section::Contact).await
    }

    pub async fn fill_form(&self, name: &str, email: &str) -> E2eResult<()> {
        self.name_input.fill(name).await?;
        self.email_input.fill(email).await
    }

    pub async fn submit(&self) -> E2eResult<()> {
        self.send_button.click().await
    }
}
