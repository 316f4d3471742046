//! HTTP reachability checks for outbound links

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};
use crate::locator::BrowserPage;

const USER_AGENT: &str = concat!("portfolio-e2e/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Per-link status checks. Each check stands alone; one bad link never
/// hides the result of another.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    pub fn new(config: &HarnessConfig) -> E2eResult<Self> {
        // Never wait longer for a link than for the whole test
        let timeout = REQUEST_TIMEOUT.min(config.test_timeout);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    async fn status(&self, method: Method, url: &str) -> E2eResult<StatusCode> {
        match self.client.request(method.clone(), url).send().await {
            Ok(response) => {
                debug!(%method, url, status = response.status().as_u16(), "link checked");
                Ok(response.status())
            }
            Err(e) => {
                warn!(%method, url, error = %e, "link request failed");
                Err(E2eError::LinkUnreachable {
                    url: url.to_string(),
                    status: None,
                })
            }
        }
    }

    fn judge(url: &str, status: StatusCode, accept: impl Fn(u16) -> bool) -> E2eResult<()> {
        if accept(status.as_u16()) {
            Ok(())
        } else {
            Err(E2eError::LinkUnreachable {
                url: url.to_string(),
                status: Some(status.as_u16()),
            })
        }
    }

    /// GET must answer below 400. Some hosts reject HEAD, so this uses GET.
    pub async fn expect_reachable(&self, url: &str) -> E2eResult<()> {
        let status = self.status(Method::GET, url).await?;
        Self::judge(url, status, |s| s < 400)
    }

    /// HEAD must answer 200, or 404 while the target is not yet published
    pub async fn expect_published_or_pending(&self, url: &str) -> E2eResult<()> {
        let status = self.status(Method::HEAD, url).await?;
        Self::judge(url, status, |s| s == 200 || s == 404)
    }

    /// HEAD must not answer with a server error
    pub async fn expect_no_server_error(&self, url: &str) -> E2eResult<()> {
        let status = self.status(Method::HEAD, url).await?;
        Self::judge(url, status, |s| s < 500)
    }
}

/// Distinct absolute `http(s)` link targets on the current page, in
/// document order
pub async fn page_links(page: &BrowserPage) -> E2eResult<Vec<String>> {
    let value = page
        .evaluate(
            "[...new Set([...document.querySelectorAll('a[href^=\"http\"]')]\
             .map(a => a.getAttribute('href')))]",
        )
        .await?;
    let links: Vec<String> = serde_json::from_value(value)?;
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(200, true ; "ok")]
    #[test_case(301, true ; "redirect")]
    #[test_case(404, false ; "missing")]
    #[test_case(999, false ; "garbage")]
    fn test_reachable_threshold(status: u16, accepted: bool) {
        let status = StatusCode::from_u16(status).unwrap();
        let result = LinkChecker::judge("https://example.com", status, |s| s < 400);
        assert_eq!(result.is_ok(), accepted);
    }

    #[test_case(200, true ; "published")]
    #[test_case(404, true ; "pending")]
    #[test_case(302, false ; "redirect")]
    #[test_case(500, false ; "server error")]
    fn test_published_or_pending(status: u16, accepted: bool) {
        let status = StatusCode::from_u16(status).unwrap();
        let result = LinkChecker::judge("https://example.com/report", status, |s| s == 200 || s == 404);
        assert_eq!(result.is_ok(), accepted);
    }

    #[test]
    fn test_rejection_carries_status() {
        let err = LinkChecker::judge("https://example.com", StatusCode::BAD_GATEWAY, |s| s < 500)
            .unwrap_err();
        match err {
            E2eError::LinkUnreachable { url, status } => {
                assert_eq!(url, "https://example.com");
                assert_eq!(status, Some(502));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_failure_has_no_status() {
        let config = HarnessConfig::resolve(&crate::config::Resolver::new(
            std::collections::HashMap::<String, String>::new(),
        ))
        .unwrap();
        let checker = LinkChecker::new(&config).unwrap();
        // Port 9 (discard) on loopback is closed in test environments
        let err = checker.expect_reachable("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, E2eError::LinkUnreachable { status: None, .. }));
    }
}
