//! PageDriver - the seam between the suite and whatever renders the page.
//!
//! The CDP page (`browser` feature) and the in-memory [`MockSignUpPage`]
//! both implement it, so every case runs unchanged against either.
//!
//! Drivers resolve a selector once and act on it once. Auto-waiting,
//! strictness and retries live in [`Locator`] and
//! [`expect`].
//!
//! [`MockSignUpPage`]: crate::MockSignUpPage
//! [`Locator`]: crate::Locator
//! [`expect`]: crate::expect()

use crate::locator::Selector;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Snapshot of one element matched by a selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lower-case tag name
    pub tag: String,
    /// Whether the element is rendered with a non-empty box
    pub visible: bool,
    /// Rendered text (or input value), trimmed
    #[serde(default)]
    pub text: String,
}

impl ElementInfo {
    /// Create a visible element snapshot
    #[must_use]
    pub fn visible(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            visible: true,
            text: text.into(),
        }
    }

    /// Create a hidden element snapshot
    #[must_use]
    pub fn hidden(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            visible: false,
            text: text.into(),
        }
    }
}

/// Abstract page automation.
///
/// Actions take the selector rather than a handle; implementations must
/// fail if the selector does not resolve to exactly one element at the
/// moment of the call.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load event
    async fn goto(&mut self, url: &str) -> ProbeResult<()>;

    /// Current URL of the page
    async fn current_url(&self) -> ProbeResult<String>;

    /// All elements currently matching the selector, in document order
    async fn resolve(&self, selector: &Selector) -> ProbeResult<Vec<ElementInfo>>;

    /// Replace the value of an input and fire `input`/`change`
    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()>;

    /// Click the element
    async fn click(&mut self, selector: &Selector) -> ProbeResult<()>;

    /// Move focus away from the element, firing `blur`
    async fn blur(&mut self, selector: &Selector) -> ProbeResult<()>;
}

/// Source of fresh, isolated pages. One page per test case.
#[async_trait]
pub trait PageFactory: Send + Sync {
    /// Page type handed out by this factory
    type Page: PageDriver + 'static;

    /// Open a fresh page in its own browsing context
    async fn open(&self) -> ProbeResult<Self::Page>;

    /// Tear the page and its context down
    async fn close(&self, page: Self::Page) -> ProbeResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_info_constructors() {
        let shown = ElementInfo::visible("p", "Nevalidní e-mail");
        assert!(shown.visible);
        assert_eq!(shown.tag, "p");

        let hidden = ElementInfo::hidden("p", "");
        assert!(!hidden.visible);
    }

    #[test]
    fn test_element_info_deserializes_without_text() {
        let info: ElementInfo = serde_json::from_str(r#"{"tag":"input","visible":true}"#).unwrap();
        assert_eq!(info.text, "");
    }
}
