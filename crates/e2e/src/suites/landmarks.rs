//! Skip link and landmark regions

use futures::future::BoxFuture;

use crate::error::E2eResult;
use crate::expect::{ensure, expect};
use crate::fixtures::{TestScope, BASE_PAGE};
use crate::runner::TestCase;
use crate::wait;

const SKIP_LINK: &str = "skip link";
const LANDMARKS: &str = "landmarks";

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(SKIP_LINK, "skip link exists and targets main", skip_link_target),
        TestCase::new(SKIP_LINK, "skip link becomes visible on focus", skip_link_on_focus),
        TestCase::new(SKIP_LINK, "skip link navigates to main", skip_link_navigates),
        TestCase::new(LANDMARKS, "page has main landmark", main_landmark),
        TestCase::new(LANDMARKS, "page has navigation landmarks", navigation_landmarks),
        TestCase::new(LANDMARKS, "navigation landmarks have labels", labelled_navigation),
    ]
}

fn skip_link_target(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.skip_link).to_have_attribute("href", "#main").await
    })
}

fn skip_link_on_focus(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        base.skip_link.focus().await?;
        expect(&base.skip_link).to_be_focused().await?;
        // :focus styling moves it on screen
        expect(&base.skip_link).to_be_in_viewport().await
    })
}

fn skip_link_navigates(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        base.skip_link.focus().await?;
        base.skip_link.click().await?;

        let page = base.page();
        let settled = wait::until(page.timeouts().expect_wait(), "url to contain #main", || async move {
            Ok(page.url().await?.contains("#main"))
        })
        .await;
        let url = page.url().await?;
        ensure(settled.is_ok(), format!("expected url to contain #main, got {}", url))
    })
}

fn main_landmark(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.page().get_by_role("main", None)).to_be_visible().await
    })
}

fn navigation_landmarks(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        // Sidebar and top bar
        expect(&base.page().get_by_role("navigation", None))
            .to_have_count(2)
            .await
    })
}

fn labelled_navigation(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        let page = base.page();
        expect(&page.get_by_role("navigation", Some("Main sections")))
            .to_be_visible()
            .await?;
        expect(&page.get_by_role("navigation", Some("Social links")))
            .to_be_visible()
            .await
    })
}
