//! Reachability of external links and published reports

use futures::future::BoxFuture;
use tracing::{info, warn};

use crate::error::E2eResult;
use crate::fixtures::{TestScope, LINKS, PAGE};
use crate::links::page_links;
use crate::model::{ExternalLink, Framework};
use crate::runner::TestCase;

const EXTERNAL: &str = "api external links";
const REPORTS: &str = "api report urls";
const PAGE_LINKS: &str = "api page links";

pub fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new(EXTERNAL, "github is reachable", github_reachable),
        TestCase::new(EXTERNAL, "linkedin is reachable", linkedin_reachable),
        TestCase::new(REPORTS, "playwright reports accessible", playwright_report),
        TestCase::new(REPORTS, "ruby-cucumber reports accessible", ruby_cucumber_report),
        TestCase::new(REPORTS, "codeceptjs reports accessible", codeceptjs_report),
        TestCase::new(PAGE_LINKS, "all page links return valid responses", page_links_respond),
    ]
}

async fn external(scope: &mut TestScope, link: ExternalLink) -> E2eResult<()> {
    let links = scope.get(&LINKS).await?;
    links.expect_reachable(scope.config().external_link(link)).await
}

async fn report(scope: &mut TestScope, framework: Framework) -> E2eResult<()> {
    let links = scope.get(&LINKS).await?;
    links
        .expect_published_or_pending(scope.config().report_url(framework))
        .await
}

fn github_reachable(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(external(scope, ExternalLink::Github))
}

fn linkedin_reachable(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(external(scope, ExternalLink::Linkedin))
}

fn playwright_report(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(report(scope, Framework::Playwright))
}

fn ruby_cucumber_report(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(report(scope, Framework::RubyCucumber))
}

fn codeceptjs_report(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(report(scope, Framework::Codeceptjs))
}

/// Every distinct outbound link is checked; all failures are logged and the
/// first one fails the test
fn page_links_respond(scope: &mut TestScope) -> BoxFuture<'_, E2eResult<()>> {
    Box::pin(async move {
        let page = scope.get(&PAGE).await?;
        let links = scope.get(&LINKS).await?;
        page.goto("./").await?;

        let urls = page_links(&page).await?;
        info!(count = urls.len(), "checking page links");
        let mut first_failure = None;
        for url in &urls {
            if let Err(e) = links.expect_no_server_error(url).await {
                warn!(%url, "{}", e);
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })
}
