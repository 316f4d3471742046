//! Accessibility patterns and audits, including the multi-state flow audit

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use crate::a11y::{expect_no_violations, AuditConfig, REPORT_FRAME_REGION};
use crate::error::E2eResult;
use crate::expect::{ensure, expect};
use crate::fixtures::{TestScope, AUDIT, BASE_PAGE, CAREER_PAGE, CONTACT_PAGE, DEMOS_PAGE, PAGE};
use crate::model::{Framework, Section};
use crate::runner::TestCase;

const PATTERNS: &str = "a11y patterns";
const FLOW: &str = "a11y e2e";

const KEYBOARD_SAMPLE: usize = 15;
const FOCUS_STYLE_SAMPLE: usize = 10;

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(PATTERNS, "all interactive elements are keyboard accessible", keyboard_focusable),
        TestCase::new(PATTERNS, "all images have alt text or are decorative", images_have_alt),
        TestCase::new(PATTERNS, "form inputs have associated labels", inputs_have_labels),
        TestCase::new(PATTERNS, "buttons have accessible names", buttons_have_names),
        TestCase::new(PATTERNS, "links have discernible text", links_have_text),
        TestCase::new(PATTERNS, "expandable elements have aria-expanded", expandables_have_state),
        TestCase::new(PATTERNS, "page has no axe violations", page_audit),
        TestCase::new(PATTERNS, "color contrast meets WCAG AA", contrast_audit),
        TestCase::new(PATTERNS, "focus is visible on interactive elements", focus_visible),
        TestCase::new(FLOW, "e2e flow passes axe audit at every state", audited_flow),
    ]
}

fn keyboard_focusable(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        let mut checked = 0;
        for element in page.locator("a, button, input, textarea").all().await? {
            if checked == KEYBOARD_SAMPLE {
                break;
            }
            if !element.is_visible().await? {
                continue;
            }
            element.focus().await?;
            expect(&element).to_be_focused().await?;
            checked += 1;
        }
        Ok(())
    })
}

fn images_have_alt(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        for (i, image) in page.locator("img, svg").all().await?.into_iter().enumerate() {
            let alt = image.attribute("alt").await?;
            let hidden = image.attribute("aria-hidden").await?;
            let role = image.attribute("role").await?;
            ensure(
                alt.is_some() || hidden.as_deref() == Some("true") || role.as_deref() == Some("presentation"),
                format!("image {} ({}) missing alt or aria-hidden", i, image.query()),
            )?;
        }
        Ok(())
    })
}

fn inputs_have_labels(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        let inputs = page.locator("input:not([type=\"hidden\"]), textarea, select");
        for input in inputs.all().await? {
            let Some(id) = input.attribute("id").await? else {
                continue;
            };
            let labelled = page.locator(format!("label[for=\"{}\"]", id)).count().await? > 0
                || input.attribute("aria-label").await?.is_some()
                || input.attribute("aria-labelledby").await?.is_some();
            ensure(labelled, format!("input {} missing label", id))?;
        }
        Ok(())
    })
}

fn buttons_have_names(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        for (i, button) in page.locator("button").all().await?.into_iter().enumerate() {
            if !button.is_visible().await? {
                continue;
            }
            let text = button.text().await?;
            let label = button.attribute("aria-label").await?.unwrap_or_default();
            ensure(
                !text.trim().is_empty() || !label.trim().is_empty(),
                format!("button {} missing accessible name", i),
            )?;
        }
        Ok(())
    })
}

fn links_have_text(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        for (i, link) in page.locator("a[href]").all().await?.into_iter().enumerate() {
            if !link.is_visible().await? {
                continue;
            }
            let text = link.text().await?;
            let label = link.attribute("aria-label").await?.unwrap_or_default();
            ensure(
                !text.trim().is_empty() || !label.trim().is_empty(),
                format!("link {} missing discernible text", i),
            )?;
        }
        Ok(())
    })
}

fn expandables_have_state(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        for (i, element) in page.locator("[aria-controls]").all().await?.into_iter().enumerate() {
            let expanded = element.attribute("aria-expanded").await?;
            ensure(
                expanded.is_some(),
                format!("element {} with aria-controls missing aria-expanded", i),
            )?;

            let controls = element.attribute("aria-controls").await?.unwrap_or_default();
            expect(&page.locator(format!("[id=\"{}\"]", controls)))
                .described(format!("aria-controls target {} not found", controls))
                .to_be_attached()
                .await?;
        }
        Ok(())
    })
}

fn page_audit(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        let audit = scope.get(&AUDIT).await?;
        base.goto().await?;
        expect(&base.sidebar).to_be_visible().await?;

        let violations = audit.request().execute().await?;
        expect_no_violations(&violations)
    })
}

/// The standard audit disables the contrast rule; this one keeps it on
fn contrast_audit(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        let audit = scope.get(&AUDIT).await?;
        base.goto().await?;
        expect(&base.sidebar).to_be_visible().await?;

        let violations = audit
            .build(AuditConfig::empty())
            .with_tags(["wcag2aa"])
            .exclude(REPORT_FRAME_REGION)
            .execute()
            .await?;
        expect_no_violations(&violations.only("color-contrast"))
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FocusStyle {
    outline_style: String,
    box_shadow: String,
}

fn focus_visible(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        page.goto("./").await?;

        let mut checked = 0;
        for element in page.locator("a, button").all().await? {
            if checked == FOCUS_STYLE_SAMPLE {
                break;
            }
            if !element.is_visible().await? {
                continue;
            }
            element.focus().await?;
            let style: FocusStyle = serde_json::from_value(
                page.evaluate(
                    "(() => { const s = getComputedStyle(document.activeElement); \
                     return { outlineStyle: s.outlineStyle, boxShadow: s.boxShadow }; })()",
                )
                .await?,
            )?;
            let has_indicator = style.outline_style != "none" || style.box_shadow != "none";
            ensure(
                has_indicator,
                format!("{} missing visible focus indicator", element.query()),
            )?;
            checked += 1;
        }
        Ok(())
    })
}

/// Audit each state of a visitor's path through the site. Violations that
/// only exist transiently (error state, toast) surface here.
fn audited_flow(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        let career = scope.get(&CAREER_PAGE).await?;
        let demos = scope.get(&DEMOS_PAGE).await?;
        let contact = scope.get(&CONTACT_PAGE).await?;
        let audit = scope.get(&AUDIT).await?;

        base.goto().await?;
        expect(&base.sidebar).to_be_visible().await?;
        expect_no_violations(&audit.checkpoint("1. Initial load").await?)?;

        let initial = base.theme().await?;
        base.toggle_theme().await?;
        base.wait_for_theme(initial.toggled()).await?;
        expect_no_violations(&audit.checkpoint("2. Light theme").await?)?;

        base.navigate_to(Section::Career).await?;
        expect(&career.section).to_be_in_viewport().await?;
        expect_no_violations(&audit.checkpoint("3. Career section").await?)?;

        career.expand(2).await?;
        expect_no_violations(&audit.checkpoint("4. Job expanded").await?)?;

        base.navigate_to(Section::Demos).await?;
        expect(&demos.section).to_be_in_viewport().await?;
        expect_no_violations(&audit.checkpoint("5. Demos section").await?)?;

        demos.open_report(Framework::Playwright).await?;
        expect(&demos.report_viewer).to_be_visible().await?;
        let content = demos.wait_for_report_content().await?;
        info!(?content, "report viewer settled");
        expect_no_violations(&audit.checkpoint("6. Report viewer open").await?)?;

        demos.close_report().await?;
        expect(&demos.report_viewer).to_be_hidden().await?;
        expect_no_violations(&audit.checkpoint("7. Report viewer closed").await?)?;

        base.scroll_to(Section::Contact).await?;
        contact.submit().await?;
        expect(&contact.name_error).to_be_visible().await?;
        expect_no_violations(&audit.checkpoint("8. Form with errors").await?)?;

        contact.fill_form("Test", "test@test.com").await?;
        contact.submit().await?;
        expect(&contact.toast).to_be_visible().await?;
        expect_no_violations(&audit.checkpoint("9. Form submitted (toast visible)").await?)
    })
}
