//! Page object for the Votify sign-up form.
//!
//! Locators are built once with the action timeout from [`Timeouts`] and
//! re-resolved on every use.

use crate::config::Timeouts;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder of the email input
pub const EMAIL_PLACEHOLDER: &str = "name@gmail.com";

/// Visible text of the email label
pub const EMAIL_LABEL: &str = "E-mail";

/// Label of the password input
pub const PASSWORD_LABEL: &str = "Heslo";

/// Label of the confirmation input
pub const CONFIRMATION_LABEL: &str = "Potvrzení hesla";

/// Accessible name of the submit button
pub const SUBMIT_NAME: &str = "Registrace";

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LEN: usize = 8;

/// URL glob of the page reached after a successful registration
pub const SUCCESS_URL_GLOB: &str = "**/successful-sign-up?email=*";

/// Path segment of the success page
pub const SUCCESS_PATH_MARKER: &str = "successful-sign-up";

/// Query parameter carrying the registered address
pub const SUCCESS_EMAIL_PARAM: &str = "email";

/// Client-side validation messages rendered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationMessage {
    /// Email failed the format check (on submit)
    InvalidEmail,
    /// Confirmation differs from the password (on submit)
    PasswordMismatch,
    /// Password shorter than [`MIN_PASSWORD_LEN`] (on blur)
    PasswordTooShort,
}

impl ValidationMessage {
    /// Localized text as rendered on the page
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::InvalidEmail => "Nevalidní e-mail",
            Self::PasswordMismatch => "Kontrola hesla se neshoduje",
            Self::PasswordTooShort => "Musí obsahovat alespoň 8 znaků",
        }
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// The registration form
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    email_input: Locator,
    password_input: Locator,
    confirmation_input: Locator,
    submit_button: Locator,
    timeouts: Timeouts,
}

impl Default for RegistrationForm {
    fn default() -> Self {
        Self::new(&Timeouts::default())
    }
}

impl RegistrationForm {
    /// Build the form's locators with the given action timeout
    #[must_use]
    pub fn new(timeouts: &Timeouts) -> Self {
        let tune = |l: Locator| {
            l.with_timeout(timeouts.action())
                .with_poll_interval(timeouts.poll())
        };
        Self {
            email_input: tune(Locator::new(format!(
                "[placeholder={}]",
                crate::locator::js_string(EMAIL_PLACEHOLDER)
            ))),
            password_input: tune(Locator::by_label(PASSWORD_LABEL)),
            confirmation_input: tune(Locator::by_label(CONFIRMATION_LABEL)),
            submit_button: tune(Locator::by_role_with_name("button", SUBMIT_NAME)),
            timeouts: *timeouts,
        }
    }

    /// Email input (by placeholder attribute)
    #[must_use]
    pub const fn email_input(&self) -> &Locator {
        &self.email_input
    }

    /// Password input (by label)
    #[must_use]
    pub const fn password_input(&self) -> &Locator {
        &self.password_input
    }

    /// Confirmation input (by label)
    #[must_use]
    pub const fn confirmation_input(&self) -> &Locator {
        &self.confirmation_input
    }

    /// Submit button (by role and name)
    #[must_use]
    pub const fn submit_button(&self) -> &Locator {
        &self.submit_button
    }

    /// Email input found the way a user reads it, by placeholder text
    #[must_use]
    pub fn email_by_placeholder(&self) -> Locator {
        self.tuned(Locator::by_placeholder(EMAIL_PLACEHOLDER))
    }

    /// Visible label text
    #[must_use]
    pub fn label_text(&self, text: &str) -> Locator {
        self.tuned(Locator::by_text(text))
    }

    /// Locator for a validation message
    #[must_use]
    pub fn message(&self, message: ValidationMessage) -> Locator {
        self.tuned(Locator::by_text(message.text()))
    }

    /// Timeouts the form was built with
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Fill all three fields, in page order
    pub async fn fill<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        email: &str,
        password: &str,
        confirmation: &str,
    ) -> ProbeResult<()> {
        self.email_input.fill(page, email).await?;
        self.password_input.fill(page, password).await?;
        self.confirmation_input.fill(page, confirmation).await?;
        tracing::debug!(email, "registration form filled");
        Ok(())
    }

    /// Fill only the password field
    pub async fn fill_password<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        password: &str,
    ) -> ProbeResult<()> {
        self.password_input.fill(page, password).await
    }

    /// Click the submit button
    pub async fn submit<D: PageDriver + ?Sized>(&self, page: &mut D) -> ProbeResult<()> {
        self.submit_button.click(page).await
    }

    /// Move focus off the password field
    pub async fn blur_password<D: PageDriver + ?Sized>(&self, page: &mut D) -> ProbeResult<()> {
        self.password_input.blur(page).await
    }

    fn tuned(&self, locator: Locator) -> Locator {
        locator
            .with_timeout(self.timeouts.action())
            .with_poll_interval(self.timeouts.poll())
    }
}
