//! Browsing context abstraction
//!
//! A [`BrowsingContext`] is one isolated tab with its own storage. Element
//! operations take a [`Query`] and resolve it again on every call, so no
//! node reference outlives a single operation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;
use crate::locator::Query;
use crate::model::Viewport;

pub type SharedContext = Arc<dyn BrowsingContext>;

/// Layout box in CSS pixels relative to the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Snapshot of the first element matching a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementState {
    pub visible: bool,
    pub in_viewport: bool,
    pub focused: bool,
    pub enabled: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

/// Keys the harness presses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Tab,
    Space,
    Escape,
}

impl Key {
    pub fn as_str(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Space => " ",
            Key::Escape => "Escape",
        }
    }

    pub(crate) fn code(&self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Tab => "Tab",
            Key::Space => "Space",
            Key::Escape => "Escape",
        }
    }

    pub(crate) fn key_code(&self) -> i64 {
        match self {
            Key::Enter => 13,
            Key::Tab => 9,
            Key::Space => 32,
            Key::Escape => 27,
        }
    }

    /// Text inserted by the key, if any
    pub(crate) fn text(&self) -> Option<&'static str> {
        match self {
            Key::Enter => Some("\r"),
            Key::Space => Some(" "),
            Key::Tab | Key::Escape => None,
        }
    }
}

/// One isolated tab driven by the harness
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Stable identifier of this context
    fn id(&self) -> &str;

    /// Load an absolute address and wait for the load event
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn url(&self) -> E2eResult<String>;

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()>;

    /// Number of nodes currently matching
    async fn count(&self, query: &Query) -> E2eResult<usize>;

    /// State of the first match, `None` when nothing matches
    async fn inspect(&self, query: &Query) -> E2eResult<Option<ElementState>>;

    /// Attribute of the first match. Fails when nothing matches.
    async fn attribute(&self, query: &Query, name: &str) -> E2eResult<Option<String>>;

    /// Click the single match. Fails unless it is attached, visible,
    /// enabled and receives the pointer event.
    async fn click(&self, query: &Query) -> E2eResult<()>;

    async fn focus(&self, query: &Query) -> E2eResult<()>;

    /// Replace the value of an editable element
    async fn fill(&self, query: &Query, value: &str) -> E2eResult<()>;

    /// Press a key against the focused element
    async fn press(&self, key: Key) -> E2eResult<()>;

    async fn scroll_into_view(&self, query: &Query) -> E2eResult<()>;

    /// Evaluate a script, awaiting promises, and return its JSON value
    async fn evaluate(&self, script: &str) -> E2eResult<serde_json::Value>;

    /// PNG of the current viewport
    async fn screenshot(&self) -> E2eResult<Vec<u8>>;

    /// Release the context and everything it owns
    async fn close(&self) -> E2eResult<()>;
}

/// Creates isolated browsing contexts for tests
#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn open(&self, viewport: Viewport) -> E2eResult<SharedContext>;
}
