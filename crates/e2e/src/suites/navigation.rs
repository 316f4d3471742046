//! Sidebar navigation, scroll spy, theming and back-to-top

use futures::future::BoxFuture;

use crate::error::E2eResult;
use crate::expect::expect;
use crate::fixtures::{TestScope, BASE_PAGE};
use crate::model::{ExternalLink, Section};
use crate::runner::TestCase;
use crate::suites::link_pattern;

const GROUP: &str = "navigation";
const BACK_TO_TOP: &str = "back to top";

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(GROUP, "loads homepage with sidebar", loads_with_sidebar),
        TestCase::new(GROUP, "navigates between sections", navigates_between_sections),
        TestCase::new(GROUP, "scroll spy updates active section", scroll_spy),
        TestCase::new(GROUP, "theme toggle switches themes", theme_toggle),
        TestCase::new(GROUP, "double toggle restores theme", double_toggle),
        TestCase::new(GROUP, "external links have correct targets", external_link_targets),
        TestCase::new(BACK_TO_TOP, "hidden on intro section", back_to_top_hidden),
        TestCase::new(BACK_TO_TOP, "visible at demos section", back_to_top_visible),
        TestCase::new(BACK_TO_TOP, "scrolls to top on click", back_to_top_scrolls),
    ]
}

fn loads_with_sidebar(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.sidebar).to_be_visible().await
    })
}

fn navigates_between_sections(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;

        base.navigate_to(Section::Career).await?;
        expect(&base.section(Section::Career)).to_be_in_viewport().await?;

        base.navigate_to(Section::Demos).await?;
        expect(&base.section(Section::Demos)).to_be_in_viewport().await
    })
}

fn scroll_spy(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        base.scroll_to(Section::Career).await?;
        base.wait_for_active_section(Section::Career).await
    })
}

fn theme_toggle(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        let initial = base.theme().await?;
        base.toggle_theme().await?;
        base.wait_for_theme(initial.toggled()).await
    })
}

fn double_toggle(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        let initial = base.theme().await?;
        base.toggle_theme().await?;
        base.wait_for_theme(initial.toggled()).await?;
        base.toggle_theme().await?;
        base.wait_for_theme(initial).await
    })
}

fn external_link_targets(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        let config = base.page().config().clone();

        let github = link_pattern(config.external_link(ExternalLink::Github))?;
        expect(&base.github_link).to_match_attribute("href", &github).await?;

        let linkedin = link_pattern(config.external_link(ExternalLink::Linkedin))?;
        expect(&base.linkedin_link).to_match_attribute("href", &linkedin).await
    })
}

fn back_to_top_hidden(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.back_to_top).to_be_hidden().await
    })
}

fn back_to_top_visible(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        base.navigate_to(Section::Demos).await?;
        expect(&base.back_to_top).to_be_visible().await
    })
}

fn back_to_top_scrolls(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        base.navigate_to(Section::Demos).await?;
        expect(&base.back_to_top).to_be_visible().await?;
        base.back_to_top.click().await?;
        expect(&base.section(Section::Intro)).to_be_in_viewport().await
    })
}
