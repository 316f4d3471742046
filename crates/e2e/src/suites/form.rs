//! Contact form semantics: labels, validation state, live toast

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, expect};
use crate::fixtures::{TestScope, BASE_PAGE, CONTACT_PAGE};
use crate::model::ViewportPreset;
use crate::pages::ContactPage;
use crate::runner::TestCase;

const GROUP: &str = "contact form";
const MOBILE: &str = "contact form mobile";

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(GROUP, "inputs have associated labels", labelled_inputs),
        TestCase::new(GROUP, "required fields have aria-required", required_fields),
        TestCase::new(GROUP, "error messages use aria-describedby", described_by_error),
        TestCase::new(GROUP, "validation shows errors with aria-invalid", invalid_state),
        TestCase::new(GROUP, "valid submission shows toast with aria-live", toast_live_region),
        TestCase::new(GROUP, "form clears after successful submission", form_clears),
        TestCase::new(MOBILE, "toast is visible above bottom nav", toast_above_bottom_nav)
            .at(ViewportPreset::Mobile),
    ]
}

async fn open(scope: &mut TestScope) -> E2eResult<Arc<ContactPage>> {
    let contact = scope.get(&CONTACT_PAGE).await?;
    contact.open().await?;
    Ok(contact)
}

fn labelled_inputs(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        expect(&contact.name_label).to_be_visible().await?;
        expect(&contact.name_input).to_be_visible().await?;
        expect(&contact.email_label).to_be_visible().await?;
        expect(&contact.email_input).to_be_visible().await
    })
}

fn required_fields(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        expect(&contact.name_input)
            .to_have_attribute("aria-required", "true")
            .await?;
        expect(&contact.email_input)
            .to_have_attribute("aria-required", "true")
            .await
    })
}

fn described_by_error(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        let described_by = contact.name_input.attribute("aria-describedby").await?;
        ensure(
            described_by.as_deref() == Some("name-error"),
            format!("expected aria-describedby=\"name-error\", got {:?}", described_by),
        )?;
        expect(&contact.name_error).to_be_attached().await
    })
}

fn invalid_state(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        contact.submit().await?;

        expect(&contact.name_input)
            .to_have_attribute("aria-invalid", "true")
            .await?;
        expect(&contact.name_error).to_be_visible().await?;
        expect(&contact.name_error).to_have_attribute("role", "alert").await
    })
}

fn toast_live_region(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        contact.fill_form("Test User", "test@example.com").await?;
        contact.submit().await?;

        expect(&contact.toast).to_be_visible().await?;
        expect(&contact.toast).to_have_attribute("aria-live", "polite").await?;
        expect(&contact.toast).to_contain_text("Demo only").await
    })
}

fn form_clears(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        contact.fill_form("Test User", "test@example.com").await?;
        contact.submit().await?;

        expect(&contact.name_input).to_have_value("").await?;
        expect(&contact.email_input).to_have_value("").await
    })
}

fn toast_above_bottom_nav(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let contact = open(scope).await?;
        let base = scope.get(&BASE_PAGE).await?;
        contact.fill_form("Test", "test@test.com").await?;
        contact.submit().await?;
        expect(&contact.toast).to_be_visible().await?;

        let missing = |what: &str| E2eError::AssertionFailed(format!("{} has no layout box", what));
        let toast = contact.toast.bounding_box().await?.ok_or_else(|| missing("toast"))?;
        let sidebar = base.sidebar.bounding_box().await?.ok_or_else(|| missing("sidebar"))?;
        ensure(
            toast.bottom() < sidebar.y,
            format!(
                "toast bottom {} overlaps bottom nav starting at {}",
                toast.bottom(),
                sidebar.y
            ),
        )
    })
}
