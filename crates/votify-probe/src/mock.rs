//! In-memory double of the Votify sign-up page.
//!
//! [`MockSignUpPage`] renders the same controls and messages as the live
//! form and applies its client-side rules:
//!
//! - leaving the password field runs the length check
//! - submitting runs the email-format and confirmation checks
//! - a fully valid submission redirects to `successful-sign-up` after a delay
//!
//! [`MockFaults`] switches individual rules off (or breaks the markup) so the
//! suite can be shown to catch each regression.

use crate::driver::{ElementInfo, PageDriver, PageFactory};
use crate::email::is_email;
use crate::form::{
    ValidationMessage, CONFIRMATION_LABEL, EMAIL_LABEL, EMAIL_PLACEHOLDER, MIN_PASSWORD_LEN,
    PASSWORD_LABEL, SUBMIT_NAME, SUCCESS_EMAIL_PARAM, SUCCESS_PATH_MARKER,
};
use crate::locator::{text_matches, Selector};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Default delay between a valid submit and the redirect
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 150;

/// Behaviour switches for the in-memory page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFaults {
    /// Delay before the success redirect lands
    pub redirect_delay: Duration,
    /// Never redirect after a valid submit
    pub skip_redirect: bool,
    /// Never show the length message on blur
    pub skip_length_check: bool,
    /// Treat every address as well-formed
    pub accept_all_emails: bool,
    /// Render the mismatch message after every submit
    pub always_show_mismatch: bool,
    /// Render a second "Heslo" label and input
    pub duplicate_password_label: bool,
}

impl Default for MockFaults {
    fn default() -> Self {
        Self {
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            skip_redirect: false,
            skip_length_check: false,
            accept_all_emails: false,
            always_show_mismatch: false,
            duplicate_password_label: false,
        }
    }
}

impl MockFaults {
    /// A page that behaves like the live form
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the redirect delay
    #[must_use]
    pub const fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    /// Disable the success redirect
    #[must_use]
    pub const fn without_redirect(mut self) -> Self {
        self.skip_redirect = true;
        self
    }

    /// Disable the blur length check
    #[must_use]
    pub const fn without_length_check(mut self) -> Self {
        self.skip_length_check = true;
        self
    }

    /// Accept malformed addresses
    #[must_use]
    pub const fn accepting_all_emails(mut self) -> Self {
        self.accept_all_emails = true;
        self
    }

    /// Always render the mismatch message on submit
    #[must_use]
    pub const fn with_sticky_mismatch(mut self) -> Self {
        self.always_show_mismatch = true;
        self
    }

    /// Duplicate the password label and input
    #[must_use]
    pub const fn with_duplicate_password_label(mut self) -> Self {
        self.duplicate_password_label = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Email,
    Password,
    Confirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Static,
    Field(Field),
    Submit,
}

#[derive(Debug, Clone)]
struct MockElement {
    tag: &'static str,
    text: String,
    role: Option<&'static str>,
    labels: Vec<String>,
    attrs: Vec<(&'static str, String)>,
    target: Target,
}

impl MockElement {
    fn new(tag: &'static str, text: impl Into<String>) -> Self {
        Self {
            tag,
            text: text.into(),
            role: None,
            labels: Vec::new(),
            attrs: Vec::new(),
            target: Target::Static,
        }
    }

    fn input(field: Field, kind: &'static str, label: &str) -> Self {
        Self {
            tag: "input",
            text: String::new(),
            role: (kind == "email").then_some("textbox"),
            labels: vec![label.to_string()],
            attrs: vec![("type", kind.to_string())],
            target: Target::Field(field),
        }
    }

    fn with_attr(mut self, name: &'static str, value: &str) -> Self {
        self.attrs.push((name, value.to_string()));
        self
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    fn accessible_name(&self) -> String {
        if self.labels.is_empty() {
            self.text.clone()
        } else {
            self.labels.join(" ")
        }
    }

    fn matches(&self, selector: &Selector) -> ProbeResult<bool> {
        Ok(match selector {
            Selector::Css(css) => CssQuery::parse(css)?.matches(self),
            Selector::Text { text, exact } => {
                self.tag != "input" && text_matches(&self.text, text, *exact)
            }
            Selector::Label { text, exact } => {
                self.labels.iter().any(|l| text_matches(l, text, *exact))
            }
            Selector::Placeholder { text, exact } => self
                .attr("placeholder")
                .is_some_and(|p| text_matches(p, text, *exact)),
            Selector::Role { role, name, exact } => {
                self.role == Some(role.as_str())
                    && name
                        .as_deref()
                        .map_or(true, |n| text_matches(&self.accessible_name(), n, *exact))
            }
        })
    }

    fn info(&self) -> ElementInfo {
        ElementInfo::visible(self.tag, self.text.clone())
    }
}

/// The subset of CSS the in-memory page understands: an optional tag name
/// followed by attribute tests, e.g. `input[type="email"]` or `[placeholder]`.
#[derive(Debug, PartialEq, Eq)]
struct CssQuery {
    tag: Option<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl CssQuery {
    fn parse(css: &str) -> ProbeResult<Self> {
        let unsupported = || ProbeError::page(format!("unsupported selector in mock page: {css}"));
        let css = css.trim();
        let tag_end = css.find('[').unwrap_or(css.len());
        let tag = &css[..tag_end];
        if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '*') {
            return Err(unsupported());
        }
        let mut attrs = Vec::new();
        let mut rest = &css[tag_end..];
        while let Some(body) = rest.strip_prefix('[') {
            let close = body.find(']').ok_or_else(unsupported)?;
            let (inner, tail) = (&body[..close], &body[close + 1..]);
            match inner.split_once('=') {
                Some((name, value)) => {
                    let value = value.trim();
                    let value = value
                        .strip_prefix('"')
                        .and_then(|v| v.strip_suffix('"'))
                        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                        .unwrap_or(value);
                    attrs.push((name.trim().to_string(), Some(value.to_string())));
                }
                None => attrs.push((inner.trim().to_string(), None)),
            }
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(unsupported());
        }
        Ok(Self {
            tag: (!tag.is_empty() && tag != "*").then(|| tag.to_ascii_lowercase()),
            attrs,
        })
    }

    fn matches(&self, element: &MockElement) -> bool {
        self.tag.as_deref().map_or(true, |t| t == element.tag)
            && self.attrs.iter().all(|(name, value)| match value {
                Some(v) => element.attr(name) == Some(v.as_str()),
                None => element.attr(name).is_some(),
            })
    }
}

#[derive(Debug, Clone)]
struct PendingRedirect {
    at: Instant,
    url: String,
}

/// In-memory sign-up page
#[derive(Debug)]
pub struct MockSignUpPage {
    faults: MockFaults,
    url: String,
    on_sign_up: bool,
    email: String,
    password: String,
    confirmation: String,
    focused: Option<Field>,
    messages: BTreeSet<ValidationMessage>,
    redirect: Option<PendingRedirect>,
}

impl MockSignUpPage {
    /// Create a blank page (`about:blank`)
    #[must_use]
    pub fn new(faults: MockFaults) -> Self {
        Self {
            faults,
            url: "about:blank".to_string(),
            on_sign_up: false,
            email: String::new(),
            password: String::new(),
            confirmation: String::new(),
            focused: None,
            messages: BTreeSet::new(),
            redirect: None,
        }
    }

    /// Messages currently rendered
    #[must_use]
    pub fn visible_messages(&self) -> Vec<ValidationMessage> {
        if self.redirected() {
            return Vec::new();
        }
        self.messages.iter().copied().collect()
    }

    fn redirected(&self) -> bool {
        self.redirect
            .as_ref()
            .is_some_and(|r| Instant::now() >= r.at)
    }

    fn effective_url(&self) -> &str {
        match &self.redirect {
            Some(r) if Instant::now() >= r.at => &r.url,
            _ => &self.url,
        }
    }

    fn elements(&self) -> Vec<MockElement> {
        if self.redirected() {
            return vec![MockElement::new("h1", "Registrace proběhla úspěšně")];
        }
        if !self.on_sign_up {
            return Vec::new();
        }

        let mut elements = vec![
            MockElement::new("h1", "Vytvořit účet"),
            MockElement::new("label", EMAIL_LABEL),
            MockElement::input(Field::Email, "email", EMAIL_LABEL)
                .with_attr("placeholder", EMAIL_PLACEHOLDER)
                .with_attr("name", "email"),
            MockElement::new("label", PASSWORD_LABEL),
            MockElement::input(Field::Password, "password", PASSWORD_LABEL)
                .with_attr("name", "password"),
        ];
        if self.faults.duplicate_password_label {
            elements.push(MockElement::new("label", PASSWORD_LABEL));
            elements.push(
                MockElement::input(Field::Password, "password", PASSWORD_LABEL)
                    .with_attr("name", "password-again"),
            );
        }
        elements.push(MockElement::new("label", CONFIRMATION_LABEL));
        elements.push(
            MockElement::input(Field::Confirmation, "password", CONFIRMATION_LABEL)
                .with_attr("name", "confirmPassword"),
        );
        elements.push(MockElement {
            role: Some("button"),
            target: Target::Submit,
            attrs: vec![("type", "submit".to_string())],
            ..MockElement::new("button", SUBMIT_NAME)
        });
        elements.extend(
            self.messages
                .iter()
                .map(|m| MockElement::new("p", m.text())),
        );
        elements
    }

    fn single_target(&self, selector: &Selector) -> ProbeResult<Target> {
        let mut matched = Vec::new();
        for element in self.elements() {
            if element.matches(selector)? {
                matched.push(element.target);
            }
        }
        match matched.as_slice() {
            [target] => Ok(*target),
            [] => Err(ProbeError::ElementNotFound {
                selector: selector.to_string(),
                timeout_ms: 0,
            }),
            _ => Err(ProbeError::StrictModeViolation {
                selector: selector.to_string(),
                count: matched.len(),
            }),
        }
    }

    fn focus(&mut self, field: Option<Field>) {
        if self.focused != field {
            if let Some(previous) = self.focused.take() {
                self.on_blur(previous);
            }
            self.focused = field;
        }
    }

    fn on_blur(&mut self, field: Field) {
        if field != Field::Password || self.faults.skip_length_check {
            return;
        }
        let len = self.password.chars().count();
        self.toggle(
            ValidationMessage::PasswordTooShort,
            len > 0 && len < MIN_PASSWORD_LEN,
        );
    }

    fn toggle(&mut self, message: ValidationMessage, shown: bool) {
        if shown {
            self.messages.insert(message);
        } else {
            self.messages.remove(&message);
        }
    }

    fn on_submit(&mut self) -> ProbeResult<()> {
        self.focus(None);

        let email_ok = self.faults.accept_all_emails || is_email(&self.email);
        let passwords_match = self.password == self.confirmation;
        let long_enough = self.password.chars().count() >= MIN_PASSWORD_LEN;

        self.toggle(ValidationMessage::InvalidEmail, !email_ok);
        self.toggle(
            ValidationMessage::PasswordMismatch,
            !passwords_match || self.faults.always_show_mismatch,
        );
        tracing::trace!(email_ok, passwords_match, long_enough, "mock submit");

        if email_ok && passwords_match && long_enough && !self.faults.skip_redirect {
            let target = self.success_url()?;
            self.redirect = Some(PendingRedirect {
                at: Instant::now() + self.faults.redirect_delay,
                url: target,
            });
        }
        Ok(())
    }

    fn success_url(&self) -> ProbeResult<String> {
        let mut next = Url::parse(&self.url).map_err(|e| ProbeError::page(e.to_string()))?;
        let prefix = next
            .path()
            .strip_suffix("sign-up")
            .unwrap_or("/")
            .to_string();
        next.set_path(&format!("{prefix}{SUCCESS_PATH_MARKER}"));
        next.set_query(None);
        next.query_pairs_mut()
            .append_pair(SUCCESS_EMAIL_PARAM, &self.email);
        Ok(next.to_string())
    }

    fn ensure_loaded(&self) -> ProbeResult<()> {
        if self.redirected() || !self.on_sign_up {
            return Err(ProbeError::page(format!(
                "no sign-up form on {}",
                self.effective_url()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for MockSignUpPage {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        let parsed = Url::parse(url).map_err(|e| ProbeError::NavigationError {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let is_sign_up = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .is_some_and(|last| last == "sign-up");
        if !is_sign_up {
            return Err(ProbeError::NavigationError {
                url: url.to_string(),
                message: "mock page only serves the sign-up form".to_string(),
            });
        }
        let faults = self.faults;
        *self = Self::new(faults);
        self.url = url.to_string();
        self.on_sign_up = true;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self.effective_url().to_string())
    }

    async fn resolve(&self, selector: &Selector) -> ProbeResult<Vec<ElementInfo>> {
        let mut found = Vec::new();
        for element in self.elements() {
            if element.matches(selector)? {
                found.push(element.info());
            }
        }
        Ok(found)
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()> {
        self.ensure_loaded()?;
        let Target::Field(field) = self.single_target(selector)? else {
            return Err(ProbeError::NotActionable {
                selector: selector.to_string(),
                message: "element is not an input".to_string(),
            });
        };
        self.focus(Some(field));
        let slot = match field {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
            Field::Confirmation => &mut self.confirmation,
        };
        value.clone_into(slot);
        Ok(())
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.ensure_loaded()?;
        match self.single_target(selector)? {
            Target::Submit => self.on_submit(),
            Target::Field(field) => {
                self.focus(Some(field));
                Ok(())
            }
            Target::Static => {
                self.focus(None);
                Ok(())
            }
        }
    }

    async fn blur(&mut self, selector: &Selector) -> ProbeResult<()> {
        self.ensure_loaded()?;
        if let Target::Field(field) = self.single_target(selector)? {
            if self.focused == Some(field) {
                self.focus(None);
            }
        }
        Ok(())
    }
}

/// Hands out fresh [`MockSignUpPage`]s
#[derive(Debug, Clone, Default)]
pub struct MockPageFactory {
    faults: MockFaults,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MockPageFactory {
    /// Factory for pages with the given faults
    #[must_use]
    pub fn new(faults: MockFaults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }

    /// Number of pages opened so far
    #[must_use]
    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of pages closed so far
    #[must_use]
    pub fn pages_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFactory for MockPageFactory {
    type Page = MockSignUpPage;

    async fn open(&self) -> ProbeResult<Self::Page> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSignUpPage::new(self.faults))
    }

    async fn close(&self, page: Self::Page) -> ProbeResult<()> {
        drop(page);
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
