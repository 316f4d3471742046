//! Web-first expectations
//!
//! Each expectation polls its locator until the condition holds or the
//! expect timeout elapses, then fails with [`E2eError::AssertionFailed`].

use regex::Regex;

use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::wait;

pub fn expect(locator: &Locator) -> Expectation<'_> {
    Expectation {
        locator,
        message: None,
    }
}

/// Plain (non-polling) check with a custom message
pub fn ensure(condition: bool, message: impl Into<String>) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message.into()))
    }
}

pub struct Expectation<'a> {
    locator: &'a Locator,
    message: Option<String>,
}

impl<'a> Expectation<'a> {
    /// Prefix failures with a caller-supplied message
    pub fn described(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    async fn poll<F, Fut>(&self, what: String, check: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = E2eResult<bool>>,
    {
        let description = format!("{} to {}", self.locator.query(), what);
        match wait::until(self.locator.timeouts().expect_wait(), &description, check).await {
            Ok(()) => Ok(()),
            Err(E2eError::Timeout(detail)) => Err(E2eError::AssertionFailed(match &self.message {
                Some(m) => format!("{}: expected {}", m, detail),
                None => format!("expected {}", detail),
            })),
            Err(e) => Err(e),
        }
    }

    pub async fn to_be_visible(self) -> E2eResult<()> {
        let l = self.locator;
        self.poll("be visible".into(), || l.is_visible()).await
    }

    pub async fn to_be_hidden(self) -> E2eResult<()> {
        let l = self.locator;
        self.poll("be hidden".into(), || l.is_hidden()).await
    }

    pub async fn to_be_attached(self) -> E2eResult<()> {
        let l = self.locator;
        self.poll("be attached".into(), || async move { Ok(l.count().await? > 0) })
            .await
    }

    pub async fn to_be_focused(self) -> E2eResult<()> {
        let l = self.locator;
        self.poll("be focused".into(), || l.is_focused()).await
    }

    pub async fn to_be_in_viewport(self) -> E2eResult<()> {
        let l = self.locator;
        self.poll("be in viewport".into(), || l.is_in_viewport()).await
    }

    pub async fn to_have_count(self, expected: usize) -> E2eResult<()> {
        let l = self.locator;
        self.poll(format!("have count {}", expected), || async move {
            Ok(l.count().await? == expected)
        })
        .await
    }

    pub async fn to_have_attribute(self, name: &str, expected: &str) -> E2eResult<()> {
        let l = self.locator;
        self.poll(format!("have {}=\"{}\"", name, expected), || async move {
            Ok(attribute_or_none(l, name).await?.as_deref() == Some(expected))
        })
        .await
    }

    pub async fn to_match_attribute(self, name: &str, pattern: &Regex) -> E2eResult<()> {
        let l = self.locator;
        self.poll(format!("have {} matching /{}/", name, pattern), || async move {
            Ok(attribute_or_none(l, name)
                .await?
                .map(|v| pattern.is_match(&v))
                .unwrap_or(false))
        })
        .await
    }

    pub async fn to_contain_text(self, expected: &str) -> E2eResult<()> {
        let l = self.locator;
        self.poll(format!("contain text \"{}\"", expected), || async move {
            Ok(l
                .inspect()
                .await?
                .map(|s| s.text.contains(expected))
                .unwrap_or(false))
        })
        .await
    }

    pub async fn to_have_value(self, expected: &str) -> E2eResult<()> {
        let l = self.locator;
        self.poll(format!("have value \"{}\"", expected), || async move {
            Ok(l
                .inspect()
                .await?
                .map(|s| s.value.unwrap_or_default() == expected)
                .unwrap_or(false))
        })
        .await
    }
}

/// Attribute read that treats a missing element as "not yet"
async fn attribute_or_none(locator: &Locator, name: &str) -> E2eResult<Option<String>> {
    if locator.count().await? == 0 {
        return Ok(None);
    }
    locator.attribute(name).await
}
