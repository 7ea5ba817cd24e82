//! The registration scenarios.
//!
//! Every case is independent: it gets a freshly loaded sign-up page and
//! shares nothing with its siblings. Expected outcomes are computed from the
//! case's own inputs ([`is_email`] for addresses, [`MIN_PASSWORD_LEN`] for
//! passwords), never stored next to the fixture.

use crate::config::{SuiteConfig, Timeouts};
use crate::driver::PageDriver;
use crate::email::{is_email, random_email};
use crate::expect::{expect, expect_url, LocatorExpect};
use crate::form::{
    RegistrationForm, ValidationMessage, CONFIRMATION_LABEL, EMAIL_LABEL, MIN_PASSWORD_LEN,
    PASSWORD_LABEL, SUCCESS_EMAIL_PARAM, SUCCESS_PATH_MARKER, SUCCESS_URL_GLOB,
};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{wait_for_url, UrlPattern, WaitOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level name of the suite
pub const SUITE_NAME: &str = "User Registration Form";

/// Address fixtures for the format matrix, in run order
pub const EMAIL_FIXTURES: [&str; 9] = [
    "valid@example.com",
    "invalid-email",
    "invalid@",
    "invalid@domain",
    "invalid@domain.",
    "invalid@domain..com",
    "invalid@domain,com",
    "invalid@ domain.com",
    "invalid@domain@domain.com",
];

/// Password used when both fields should agree
pub const MATCHING_PASSWORD: &str = "TestPassword123";

/// Confirmation that differs from [`MATCHING_PASSWORD`]
pub const MISMATCHED_PASSWORD: &str = "DifferentPassword123";

/// Password long enough to pass the blur check (and to register with)
pub const VALID_PASSWORD: &str = "ValidPass123";

/// Password too short for the blur check
pub const SHORT_PASSWORD: &str = "Short1";

/// Concern a scenario belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    /// Labels, inputs and button are rendered
    FieldPresence,
    /// Format message after submit
    EmailValidation,
    /// Confirmation match and length checks
    PasswordValidation,
    /// Redirect after a valid registration
    FormSubmission,
}

impl Group {
    /// Heading used in case names
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FieldPresence => "Field Presence and Visibility",
            Self::EmailValidation => "Email Validation",
            Self::PasswordValidation => "Password Validation",
            Self::FormSubmission => "Form Submission",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One registration scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scenario {
    /// Every label, input and the submit button are visible
    FieldPresence,
    /// Submit `email` with empty passwords and check the format message
    EmailFormat {
        /// Address under test
        email: String,
    },
    /// Equal passwords never show the mismatch message
    MatchingPasswords,
    /// Different passwords always show the mismatch message
    MismatchedPasswords,
    /// Fill the password, leave the field, check the length message
    PasswordLengthOnBlur {
        /// Password under test
        password: String,
    },
    /// A valid registration lands on the success page
    SuccessfulRegistration,
}

impl Scenario {
    /// The full catalog, in run order
    #[must_use]
    pub fn catalog() -> Vec<Self> {
        let mut all = vec![Self::FieldPresence];
        all.extend(EMAIL_FIXTURES.iter().map(|email| Self::EmailFormat {
            email: (*email).to_string(),
        }));
        all.extend([
            Self::MatchingPasswords,
            Self::MismatchedPasswords,
            Self::PasswordLengthOnBlur {
                password: VALID_PASSWORD.to_string(),
            },
            Self::PasswordLengthOnBlur {
                password: SHORT_PASSWORD.to_string(),
            },
            Self::SuccessfulRegistration,
        ]);
        all
    }

    /// Catalog entries whose full name contains `filter` (case-insensitive)
    #[must_use]
    pub fn select(filter: Option<&str>) -> Vec<Self> {
        Self::catalog()
            .into_iter()
            .filter(|s| filter.map_or(true, |f| s.matches_filter(f)))
            .collect()
    }

    /// Group this scenario belongs to
    #[must_use]
    pub const fn group(&self) -> Group {
        match self {
            Self::FieldPresence => Group::FieldPresence,
            Self::EmailFormat { .. } => Group::EmailValidation,
            Self::MatchingPasswords
            | Self::MismatchedPasswords
            | Self::PasswordLengthOnBlur { .. } => Group::PasswordValidation,
            Self::SuccessfulRegistration => Group::FormSubmission,
        }
    }

    /// Case title within its group
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::FieldPresence => {
                "should check presence and visibility of fields and labels".to_string()
            }
            Self::EmailFormat { email } => format!("should validate email format for {email}"),
            Self::MatchingPasswords => "should accept matching passwords".to_string(),
            Self::MismatchedPasswords => "should show error for non-matching passwords".to_string(),
            Self::PasswordLengthOnBlur { password } if long_enough(password) => {
                format!("should accept passwords of at least {MIN_PASSWORD_LEN} characters on blur")
            }
            Self::PasswordLengthOnBlur { .. } => {
                format!("should reject passwords shorter than {MIN_PASSWORD_LEN} characters on blur")
            }
            Self::SuccessfulRegistration => {
                "should navigate to the correct page after registration".to_string()
            }
        }
    }

    /// `User Registration Form > <group> > <title>`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{SUITE_NAME} > {} > {}", self.group(), self.title())
    }

    /// Case-insensitive substring match on the full name
    #[must_use]
    pub fn matches_filter(&self, filter: &str) -> bool {
        self.full_name()
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }

    /// Message this case checks and whether it should be visible afterwards
    #[must_use]
    pub fn expected_message(&self) -> Option<(ValidationMessage, bool)> {
        match self {
            Self::EmailFormat { email } => Some((ValidationMessage::InvalidEmail, !is_email(email))),
            Self::MatchingPasswords => Some((ValidationMessage::PasswordMismatch, false)),
            Self::MismatchedPasswords => Some((ValidationMessage::PasswordMismatch, true)),
            Self::PasswordLengthOnBlur { password } => {
                Some((ValidationMessage::PasswordTooShort, !long_enough(password)))
            }
            Self::FieldPresence | Self::SuccessfulRegistration => None,
        }
    }

    /// Drive `page` (already on the sign-up form) through the case
    pub async fn run<D: PageDriver + ?Sized>(
        &self,
        page: &mut D,
        ctx: &ScenarioContext,
    ) -> ProbeResult<()> {
        let form = &ctx.form;
        match self {
            Self::FieldPresence => {
                let checks = [
                    form.label_text(EMAIL_LABEL),
                    form.email_by_placeholder(),
                    form.label_text(PASSWORD_LABEL),
                    form.password_input().clone(),
                    form.label_text(CONFIRMATION_LABEL),
                    form.confirmation_input().clone(),
                    form.submit_button().clone(),
                ];
                for locator in &checks {
                    ctx.expect(locator).to_be_visible(&*page).await?;
                }
            }
            Self::EmailFormat { email } => {
                form.fill(page, email, "", "").await?;
                form.submit(page).await?;
                self.check_message(page, ctx).await?;
            }
            Self::MatchingPasswords => {
                let email = random_email();
                form.fill(page, &email, MATCHING_PASSWORD, MATCHING_PASSWORD)
                    .await?;
                form.submit(page).await?;
                self.check_message(page, ctx).await?;
            }
            Self::MismatchedPasswords => {
                let email = random_email();
                form.fill(page, &email, MATCHING_PASSWORD, MISMATCHED_PASSWORD)
                    .await?;
                form.submit(page).await?;
                self.check_message(page, ctx).await?;
            }
            Self::PasswordLengthOnBlur { password } => {
                form.fill_password(page, password).await?;
                form.blur_password(page).await?;
                self.check_message(page, ctx).await?;
            }
            Self::SuccessfulRegistration => {
                let email = random_email();
                form.fill(page, &email, VALID_PASSWORD, VALID_PASSWORD).await?;
                form.submit(page).await?;

                let pattern = UrlPattern::Glob(SUCCESS_URL_GLOB.to_string());
                let options = WaitOptions::new()
                    .with_timeout(ctx.timeouts.navigation_ms)
                    .with_poll_interval(ctx.timeouts.poll_ms);
                let current_url = wait_for_url(&*page, &pattern, &options).await?;
                tracing::info!(url = %current_url, "landed after registration");

                expect_url(&*page)
                    .with_timeout(ctx.timeouts.expect())
                    .to_contain(SUCCESS_PATH_MARKER)
                    .await?;
                check_registered_email(&current_url, &email)?;
            }
        }
        Ok(())
    }

    async fn check_message<D: PageDriver + ?Sized>(
        &self,
        page: &D,
        ctx: &ScenarioContext,
    ) -> ProbeResult<()> {
        let Some((message, visible)) = self.expected_message() else {
            return Ok(());
        };
        let locator = ctx.form.message(message);
        ctx.expect(&locator).to_have_visibility(page, visible).await
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

fn long_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// The `email` query parameter of `url` must decode to `expected`
fn check_registered_email(url: &str, expected: &str) -> ProbeResult<()> {
    let parsed = url::Url::parse(url)
        .map_err(|e| ProbeError::assertion(format!("success url {url} is not a URL: {e}")))?;
    let registered = parsed
        .query_pairs()
        .find(|(key, _)| key == SUCCESS_EMAIL_PARAM)
        .map(|(_, value)| value.into_owned());
    match registered {
        Some(ref value) if value == expected => Ok(()),
        Some(value) => Err(ProbeError::assertion(format!(
            "success url carries {SUCCESS_EMAIL_PARAM}={value}, expected {expected}"
        ))),
        None => Err(ProbeError::assertion(format!(
            "success url {url} has no {SUCCESS_EMAIL_PARAM} parameter"
        ))),
    }
}

/// Per-run state shared by every case
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Page object with tuned locators
    pub form: RegistrationForm,
    /// Timeouts for waits and expectations
    pub timeouts: Timeouts,
}

impl ScenarioContext {
    /// Build the context for a suite configuration
    #[must_use]
    pub fn new(config: &SuiteConfig) -> Self {
        Self {
            form: RegistrationForm::new(&config.timeouts),
            timeouts: config.timeouts,
        }
    }

    /// Expectation using the configured expect timeout
    #[must_use]
    pub fn expect<'a>(&self, locator: &'a Locator) -> LocatorExpect<'a> {
        expect(locator)
            .with_timeout(self.timeouts.expect())
            .with_poll_interval(self.timeouts.poll())
    }
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self::new(&SuiteConfig::default())
    }
}
