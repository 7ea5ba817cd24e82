//! Locator abstraction for element selection and interaction.
//!
//! # Design Philosophy
//!
//! - **Auto-Waiting**: actions wait for the element to attach and become visible
//! - **Strict Selection**: fails if multiple elements match
//! - **Semantic Selectors**: text, label, placeholder and ARIA role, the way a
//!   user finds things on the page
//!
//! Text matching is case-insensitive and whitespace-normalized substring
//! matching unless the selector is marked `exact`. The same rule runs in the
//! page (as generated JavaScript) and in Rust (for the in-memory page).

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

use crate::driver::PageDriver;
use crate::result::{ProbeError, ProbeResult};

/// Default timeout for auto-waiting (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for auto-waiting (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Helpers injected ahead of every generated query.
const JS_HELPERS: &str = r#"
const __norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const __match = (candidate, wanted, exact) => exact
  ? __norm(candidate) === __norm(wanted)
  : __norm(candidate).toLowerCase().includes(__norm(wanted).toLowerCase());
const __skip = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE', 'HEAD', 'TITLE']);
const __byCss = (css) => Array.from(document.querySelectorAll(css));
const __byText = (wanted, exact) => Array.from(document.querySelectorAll('body *'))
  .filter((el) => !__skip.has(el.tagName))
  .filter((el) => __match(el.textContent, wanted, exact))
  .filter((el) => !Array.from(el.children).some((c) => __match(c.textContent, wanted, exact)));
const __labelTexts = (el) => {
  const parts = [];
  const aria = el.getAttribute('aria-label');
  if (aria) parts.push(aria);
  for (const id of (el.getAttribute('aria-labelledby') || '').split(/\s+/).filter(Boolean)) {
    const ref = document.getElementById(id);
    if (ref) parts.push(ref.textContent);
  }
  if (el.labels) for (const l of el.labels) parts.push(l.textContent);
  return parts;
};
const __byLabel = (wanted, exact) => Array.from(
  document.querySelectorAll('input, textarea, select, button, [aria-label], [aria-labelledby]'))
  .filter((el) => __labelTexts(el).some((t) => __match(t, wanted, exact)));
const __byPlaceholder = (wanted, exact) => Array.from(document.querySelectorAll('[placeholder]'))
  .filter((el) => __match(el.getAttribute('placeholder'), wanted, exact));
const __implicitRoles = {
  button: 'button, input[type=button], input[type=submit], input[type=reset], [role=button]',
  textbox: 'input:not([type]), input[type=text], input[type=email], input[type=tel], input[type=url], input[type=search], textarea, [role=textbox]',
  link: 'a[href], [role=link]',
  checkbox: 'input[type=checkbox], [role=checkbox]',
  heading: 'h1, h2, h3, h4, h5, h6, [role=heading]',
};
const __accessibleName = (el) => {
  const labelled = __labelTexts(el);
  if (labelled.length) return labelled.join(' ');
  if (el.tagName === 'INPUT') return el.value || el.getAttribute('title') || '';
  return el.textContent || el.getAttribute('title') || '';
};
const __byRole = (role, name, exact) => Array.from(
  document.querySelectorAll(__implicitRoles[role] || `[role="${role}"]`))
  .filter((el) => name === null || __match(__accessibleName(el), name, exact));
const __describe = (el) => {
  const r = el.getBoundingClientRect();
  const s = window.getComputedStyle(el);
  return {
    tag: el.tagName.toLowerCase(),
    visible: r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none',
    text: (el.innerText || el.value || '').trim().slice(0, 200),
  };
};
"#;

/// Encode a Rust string as a JavaScript string literal
pub(crate) fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Whitespace-normalized, optionally case-insensitive substring match.
#[must_use]
pub fn text_matches(candidate: &str, wanted: &str, exact: bool) -> bool {
    let candidate = normalize(candidate);
    let wanted = normalize(wanted);
    if exact {
        candidate == wanted
    } else {
        candidate.to_lowercase().contains(&wanted.to_lowercase())
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Innermost element whose text contains the given text
    Text {
        /// Text to find
        text: String,
        /// Require the whole normalized text to be equal
        exact: bool,
    },
    /// Form control associated with a label (`<label for>`, nesting, ARIA)
    Label {
        /// Label text
        text: String,
        /// Require an exact label
        exact: bool,
    },
    /// Input by its placeholder attribute
    Placeholder {
        /// Placeholder text
        text: String,
        /// Require an exact placeholder
        exact: bool,
    },
    /// Element by ARIA role, optionally filtered by accessible name
    Role {
        /// ARIA role (e.g., "button")
        role: String,
        /// Accessible name filter
        name: Option<String>,
        /// Require an exact accessible name
        exact: bool,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    /// Create a label selector
    #[must_use]
    pub fn label(text: impl Into<String>) -> Self {
        Self::Label {
            text: text.into(),
            exact: false,
        }
    }

    /// Create a placeholder selector
    #[must_use]
    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder {
            text: text.into(),
            exact: false,
        }
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
            exact: false,
        }
    }

    /// Create a role selector filtered by accessible name
    #[must_use]
    pub fn role_with_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
            exact: false,
        }
    }

    /// Switch text matching to exact mode (no-op for CSS)
    #[must_use]
    pub fn exact(self) -> Self {
        match self {
            Self::Css(css) => Self::Css(css),
            Self::Text { text, .. } => Self::Text { text, exact: true },
            Self::Label { text, .. } => Self::Label { text, exact: true },
            Self::Placeholder { text, .. } => Self::Placeholder { text, exact: true },
            Self::Role { role, name, .. } => Self::Role {
                role,
                name,
                exact: true,
            },
        }
    }

    /// JavaScript call producing the array of matching elements
    fn call_expr(&self) -> String {
        match self {
            Self::Css(css) => format!("__byCss({})", js_string(css)),
            Self::Text { text, exact } => format!("__byText({}, {exact})", js_string(text)),
            Self::Label { text, exact } => format!("__byLabel({}, {exact})", js_string(text)),
            Self::Placeholder { text, exact } => {
                format!("__byPlaceholder({}, {exact})", js_string(text))
            }
            Self::Role { role, name, exact } => {
                let name = name.as_deref().map_or_else(|| "null".to_string(), js_string);
                format!("__byRole({}, {name}, {exact})", js_string(role))
            }
        }
    }

    /// Expression evaluating to an array of element snapshots
    #[must_use]
    pub fn to_describe_query(&self) -> String {
        format!(
            "(() => {{ {JS_HELPERS} return {}.map(__describe); }})()",
            self.call_expr()
        )
    }

    /// Wrap `body` so it runs with `el` bound to the single matching element.
    /// Throws inside the page when the match is not unique.
    #[must_use]
    pub fn to_action_script(&self, body: &str) -> String {
        let desc = js_string(&self.to_string());
        format!(
            "(() => {{ {JS_HELPERS} const __els = {}; \
             if (__els.length !== 1) {{ throw new Error('expected exactly one element for ' + {desc} + ', found ' + __els.length); }} \
             const el = __els[0]; {body} return true; }})()",
            self.call_expr()
        )
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = |exact: bool| if exact { "s" } else { "i" };
        match self {
            Self::Css(css) => write!(f, "css={css}"),
            Self::Text { text, exact } => write!(f, "text={text:?}{}", suffix(*exact)),
            Self::Label { text, exact } => write!(f, "label={text:?}{}", suffix(*exact)),
            Self::Placeholder { text, exact } => {
                write!(f, "placeholder={text:?}{}", suffix(*exact))
            }
            Self::Role {
                role,
                name: Some(name),
                exact,
            } => write!(f, "role={role}[name={name:?}{}]", suffix(*exact)),
            Self::Role {
                role, name: None, ..
            } => write!(f, "role={role}"),
        }
    }
}

/// Locator options for customizing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for auto-waiting
    pub timeout: Duration,
    /// Polling interval for auto-waiting
    pub poll_interval: Duration,
    /// Whether to require strict single-element match
    pub strict: bool,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            strict: true,
        }
    }
}

/// A locator for finding and interacting with elements.
///
/// Locators are lazy: nothing touches the page until an action or query
/// runs, and every run resolves the selector again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    options: LocatorOptions,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            options: LocatorOptions::default(),
        }
    }

    /// Locate by visible text
    #[must_use]
    pub fn by_text(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::text(text))
    }

    /// Locate a form control by its label
    #[must_use]
    pub fn by_label(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::label(text))
    }

    /// Locate an input by placeholder
    #[must_use]
    pub fn by_placeholder(text: impl Into<String>) -> Self {
        Self::from_selector(Selector::placeholder(text))
    }

    /// Locate by ARIA role
    #[must_use]
    pub fn by_role(role: impl Into<String>) -> Self {
        Self::from_selector(Selector::role(role))
    }

    /// Locate by ARIA role and accessible name
    #[must_use]
    pub fn by_role_with_name(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::from_selector(Selector::role_with_name(role, name))
    }

    /// Require exact text matching
    #[must_use]
    pub fn exact(self) -> Self {
        Self {
            selector: self.selector.exact(),
            options: self.options,
        }
    }

    /// Set a custom timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Set a custom polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.options.poll_interval = poll_interval;
        self
    }

    /// Disable strict mode (allow multiple matches)
    #[must_use]
    pub const fn with_strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// Get the selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Whether the element is visible right now (no waiting).
    ///
    /// Zero matches count as not visible. More than one match is a strict
    /// mode violation.
    pub async fn is_visible<D: PageDriver + ?Sized>(&self, page: &D) -> ProbeResult<bool> {
        let matches = page.resolve(&self.selector).await?;
        if self.options.strict && matches.len() > 1 {
            return Err(self.strict_violation(matches.len()));
        }
        Ok(matches.iter().any(|m| m.visible))
    }

    /// Fill the located input with text
    pub async fn fill<D: PageDriver + ?Sized>(&self, page: &mut D, text: &str) -> ProbeResult<()> {
        self.wait_actionable(&*page).await?;
        tracing::debug!(selector = %self.selector, len = text.chars().count(), "fill");
        page.fill(&self.selector, text).await
    }

    /// Click the located element
    pub async fn click<D: PageDriver + ?Sized>(&self, page: &mut D) -> ProbeResult<()> {
        self.wait_actionable(&*page).await?;
        tracing::debug!(selector = %self.selector, "click");
        page.click(&self.selector).await
    }

    /// Remove focus from the located element
    pub async fn blur<D: PageDriver + ?Sized>(&self, page: &mut D) -> ProbeResult<()> {
        self.wait_actionable(&*page).await?;
        tracing::debug!(selector = %self.selector, "blur");
        page.blur(&self.selector).await
    }

    /// Poll until exactly one visible element matches.
    async fn wait_actionable<D: PageDriver + ?Sized>(&self, page: &D) -> ProbeResult<()> {
        let deadline = Instant::now() + self.options.timeout;
        loop {
            let matches = page.resolve(&self.selector).await?;
            match matches.as_slice() {
                [only] if only.visible => return Ok(()),
                [_, _, ..] if self.options.strict => {
                    return Err(self.strict_violation(matches.len()));
                }
                [_, _, ..] if matches.iter().any(|m| m.visible) => return Ok(()),
                _ => {}
            }
            if Instant::now() >= deadline {
                return Err(if matches.is_empty() {
                    ProbeError::ElementNotFound {
                        selector: self.selector.to_string(),
                        timeout_ms: self.options.timeout.as_millis() as u64,
                    }
                } else {
                    ProbeError::NotActionable {
                        selector: self.selector.to_string(),
                        message: "element is not visible".to_string(),
                    }
                });
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn strict_violation(&self, count: usize) -> ProbeError {
        ProbeError::StrictModeViolation {
            selector: self.selector.to_string(),
            count,
        }
    }
}
