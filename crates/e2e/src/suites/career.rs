//! Career table semantics and accordion behavior

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::browser::Key;
use crate::error::E2eResult;
use crate::expect::{ensure, expect};
use crate::fixtures::{TestScope, CAREER_PAGE};
use crate::model::Section;
use crate::pages::CareerPage;
use crate::runner::TestCase;

const GROUP: &str = "career";

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(GROUP, "career table has proper structure", table_structure),
        TestCase::new(GROUP, "first job is expanded by default", first_expanded),
        TestCase::new(GROUP, "career rows are keyboard accessible", keyboard_expansion),
        TestCase::new(GROUP, "accordion - only one detail open at a time", accordion_exclusive),
        TestCase::new(GROUP, "clicking open row closes it", reclick_collapses),
        TestCase::new(GROUP, "expanded detail has aria-controls relationship", controls_relation),
    ]
}

async fn open(scope: &mut TestScope) -> E2eResult<Arc<CareerPage>> {
    let career = scope.get(&CAREER_PAGE).await?;
    career.goto().await?;
    career.navigate_to(Section::Career).await?;
    Ok(career)
}

fn table_structure(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let career = open(scope).await?;
        expect(&career.table).to_be_visible().await?;
        // Headers are visually hidden but present
        expect(&career.table.locator("th")).to_have_count(4).await
    })
}

fn first_expanded(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let career = open(scope).await?;
        expect(&career.expand_button(0))
            .to_have_attribute("aria-expanded", "true")
            .await?;
        expect(&career.detail(0)).to_be_visible().await
    })
}

fn keyboard_expansion(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let career = open(scope).await?;
        let button = career.expand_button(1);
        button.focus().await?;
        expect(&button).to_be_focused().await?;

        career.base().page().press(Key::Enter).await?;
        expect(&button).to_have_attribute("aria-expanded", "true").await?;
        expect(&career.detail(1)).to_be_visible().await
    })
}

fn accordion_exclusive(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let career = open(scope).await?;
        expect(&career.expand_button(0))
            .to_have_attribute("aria-expanded", "true")
            .await?;

        career.toggle_entry(1).await?;

        expect(&career.expand_button(1))
            .to_have_attribute("aria-expanded", "true")
            .await?;
        expect(&career.expand_button(0))
            .to_have_attribute("aria-expanded", "false")
            .await?;
        expect(&career.detail(1)).to_be_visible().await?;
        expect(&career.detail(0)).to_be_hidden().await?;

        // The open detail is the region its control points at
        let (id, region) = career.controlled_region(1).await?;
        expect(&region).to_be_visible().await?;
        let detail_id = career.detail(1).attribute("id").await?;
        ensure(
            detail_id.as_deref() == Some(id.as_str()),
            format!("expected detail id \"{}\", got {:?}", id, detail_id),
        )?;

        let expanded = career.expanded_entries().await?;
        ensure(
            expanded == vec![1],
            format!("expected only entry 1 expanded, got {:?}", expanded),
        )
    })
}

fn reclick_collapses(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let career = open(scope).await?;
        let button = career.expand_button(0);
        expect(&button).to_have_attribute("aria-expanded", "true").await?;

        button.click().await?;
        expect(&button).to_have_attribute("aria-expanded", "false").await?;
        expect(&career.detail(0)).to_be_hidden().await
    })
}

fn controls_relation(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let career = open(scope).await?;
        let (id, region) = career.controlled_region(0).await?;
        ensure(id == "detail-0", format!("expected aria-controls=\"detail-0\", got \"{}\"", id))?;
        expect(&region).to_be_attached().await
    })
}
