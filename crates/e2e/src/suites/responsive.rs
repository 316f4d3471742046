//! Mobile layout: the sidebar becomes a bottom bar

use futures::future::BoxFuture;

use crate::error::{E2eError, E2eResult};
use crate::expect::{ensure, expect};
use crate::fixtures::{TestScope, BASE_PAGE};
use crate::model::ViewportPreset;
use crate::runner::TestCase;

const GROUP: &str = "responsive mobile";

pub fn cases() -> Vec<TestCase> {
    [
        TestCase::new(GROUP, "sidebar renders as bottom bar", sidebar_bottom_bar),
        TestCase::new(GROUP, "logo is hidden", logo_hidden),
        TestCase::new(GROUP, "nav links are horizontal", nav_links_horizontal),
        TestCase::new(GROUP, "top bar icons visible", top_bar_icons),
    ]
    .into_iter()
    .map(|case| case.at(ViewportPreset::Mobile))
    .collect()
}

fn sidebar_bottom_bar(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.sidebar).to_be_visible().await?;

        let viewport = scope.ambient().viewport;
        let bbox = base
            .sidebar
            .bounding_box()
            .await?
            .ok_or_else(|| E2eError::AssertionFailed("sidebar has no layout box".into()))?;
        // Lower quarter of the screen
        let threshold = f64::from(viewport.height) * 0.75;
        ensure(
            bbox.y > threshold,
            format!("sidebar top {} is not below {} on {}", bbox.y, threshold, viewport),
        )
    })
}

fn logo_hidden(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.logo).to_be_hidden().await
    })
}

fn nav_links_horizontal(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.sidebar).to_be_visible().await?;

        let mut tops = Vec::new();
        for link in base.nav_links.all().await? {
            if let Some(bbox) = link.bounding_box().await? {
                tops.push(bbox.y.round() as i64);
            }
        }
        ensure(!tops.is_empty(), "no navigation links laid out")?;
        tops.sort_unstable();
        tops.dedup();
        ensure(
            tops.len() == 1,
            format!("navigation links sit on different rows: {:?}", tops),
        )
    })
}

fn top_bar_icons(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let base = scope.get(&BASE_PAGE).await?;
        base.goto().await?;
        expect(&base.github_link).to_be_visible().await?;
        expect(&base.linkedin_link).to_be_visible().await
    })
}
