//! votify-probe: end-to-end checks for the Votify sign-up form.
//!
//! The suite drives the registration page the way a user would and checks
//! what the page says back:
//!
//! - every label, input and the submit button are rendered
//! - malformed addresses get `Nevalidní e-mail` after submit
//! - differing passwords get `Kontrola hesla se neshoduje` after submit
//! - short passwords get `Musí obsahovat alespoň 8 znaků` when the field loses focus
//! - a valid registration lands on `successful-sign-up?email=...`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────────────────┐
//! │ SuiteRunner  │──►│ Scenario     │──►│ PageDriver              │
//! │ (jobs,       │   │ (form page   │   │  ├─ BrowserPage (CDP)   │
//! │  retries,    │   │  object,     │   │  └─ MockSignUpPage      │
//! │  timeouts)   │   │  expect)     │   │                         │
//! └──────────────┘   └──────────────┘   └─────────────────────────┘
//! ```
//!
//! Real Chromium control sits behind the `browser` feature. Without it the
//! suite still runs end to end against [`MockSignUpPage`].

#![warn(missing_docs)]

#[cfg(feature = "browser")]
pub mod browser;
pub mod config;
pub mod driver;
pub mod email;
pub mod expect;
pub mod form;
pub mod harness;
pub mod locator;
pub mod mock;
pub mod reporter;
mod result;
pub mod suite;
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::{Browser, BrowserPage};
pub use config::{BrowserSettings, SuiteConfig, Timeouts};
pub use driver::{ElementInfo, PageDriver, PageFactory};
pub use email::{is_email, random_email};
pub use expect::{expect, expect_url, LocatorExpect, RetryConfig, UrlExpect};
pub use form::{RegistrationForm, ValidationMessage};
pub use harness::{FailureKind, SuiteResults, SuiteRunner, TestOutcome, TestResult};
pub use locator::{Locator, LocatorOptions, Selector};
pub use mock::{MockFaults, MockPageFactory, MockSignUpPage};
pub use reporter::ReportFormat;
pub use result::{ProbeError, ProbeResult};
pub use suite::{Group, Scenario, ScenarioContext};
pub use wait::{poll_until, wait_for_url, wait_until, UrlPattern, WaitOptions, WaitResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::{
        expect, expect_url, is_email, random_email, Locator, MockFaults, MockPageFactory,
        MockSignUpPage, PageDriver, PageFactory, ProbeError, ProbeResult, RegistrationForm,
        Scenario, SuiteConfig, SuiteRunner, UrlPattern, ValidationMessage,
    };
    #[cfg(feature = "browser")]
    pub use super::Browser;
}
