//! Auto-retrying expectations.
//!
//! `expect(&locator).to_be_visible(&page)` re-checks the page until the
//! condition holds or the timeout runs out, so validation messages that
//! render a few frames after the triggering event do not cause flakes.

use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::UrlPattern;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Default expectation timeout (5 seconds)
pub const DEFAULT_EXPECT_TIMEOUT_MS: u64 = 5_000;

/// Result of a single expectation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionCheckResult {
    /// Assertion passed
    Pass,
    /// Assertion failed with message
    Fail(String),
}

impl AssertionCheckResult {
    /// Check if the result is a pass
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total timeout duration
    pub timeout: Duration,
    /// Interval between retry attempts
    pub poll_interval: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_EXPECT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: Duration::from_millis(100),
        }
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Outcome of a passing retried assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryResult {
    /// Number of attempts before success
    pub attempts: usize,
    /// Total duration of all attempts
    pub duration: Duration,
}

/// Run `check` until it passes or `config.timeout` elapses.
///
/// Page errors and strict mode violations end the loop at once; only
/// [`AssertionCheckResult::Fail`] is retried.
pub async fn retry<F, Fut>(
    config: &RetryConfig,
    description: &str,
    mut check: F,
) -> ProbeResult<RetryResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<AssertionCheckResult>>,
{
    let start = Instant::now();
    let mut attempts = 0;
    loop {
        attempts += 1;
        let last = match check().await? {
            AssertionCheckResult::Pass => {
                return Ok(RetryResult {
                    attempts,
                    duration: start.elapsed(),
                });
            }
            AssertionCheckResult::Fail(msg) => msg,
        };

        if start.elapsed() >= config.timeout {
            return Err(ProbeError::assertion(format!(
                "{description}: assertion failed after {attempts} attempt(s) ({:.2}s): {last}",
                start.elapsed().as_secs_f64()
            )));
        }
        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Create expectations about a locator
#[must_use]
pub fn expect(locator: &Locator) -> LocatorExpect<'_> {
    LocatorExpect {
        locator,
        config: RetryConfig::default(),
    }
}

/// Create expectations about the page URL
#[must_use]
pub fn expect_url<D: PageDriver + ?Sized>(page: &D) -> UrlExpect<'_, D> {
    UrlExpect {
        page,
        config: RetryConfig::default(),
    }
}

/// Expectations bound to one locator
#[derive(Debug, Clone, Copy)]
pub struct LocatorExpect<'a> {
    locator: &'a Locator,
    config: RetryConfig,
}

impl LocatorExpect<'_> {
    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Expect exactly one matching element, and that it is visible
    pub async fn to_be_visible<D: PageDriver + ?Sized>(&self, page: &D) -> ProbeResult<()> {
        self.to_have_visibility(page, true).await
    }

    /// Expect no visible match. Zero matching elements also passes.
    pub async fn to_be_hidden<D: PageDriver + ?Sized>(&self, page: &D) -> ProbeResult<()> {
        self.to_have_visibility(page, false).await
    }

    /// Expect the visibility to settle on `visible`
    pub async fn to_have_visibility<D: PageDriver + ?Sized>(
        &self,
        page: &D,
        visible: bool,
    ) -> ProbeResult<()> {
        let selector = self.locator.selector().to_string();
        let description = if visible {
            format!("expect({selector}).to_be_visible()")
        } else {
            format!("expect({selector}).to_be_hidden()")
        };
        let locator = self.locator;
        let selector = &selector;
        let result = retry(&self.config, &description, || async move {
            let actual = locator.is_visible(page).await?;
            Ok(if actual == visible {
                AssertionCheckResult::Pass
            } else if visible {
                AssertionCheckResult::Fail(format!("{selector} is not visible"))
            } else {
                AssertionCheckResult::Fail(format!("{selector} is visible"))
            })
        })
        .await?;
        tracing::trace!(attempts = result.attempts, "{description} passed");
        Ok(())
    }
}

/// Expectations about the current page URL
#[derive(Debug)]
pub struct UrlExpect<'a, D: ?Sized> {
    page: &'a D,
    config: RetryConfig,
}

impl<D: PageDriver + ?Sized> UrlExpect<'_, D> {
    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Expect the URL to contain `needle`
    pub async fn to_contain(&self, needle: &str) -> ProbeResult<()> {
        self.to_match(&UrlPattern::Contains(needle.to_string())).await
    }

    /// Expect the URL to match `pattern`
    pub async fn to_match(&self, pattern: &UrlPattern) -> ProbeResult<()> {
        pattern.validate()?;
        let description = format!("expect(url).to_match({pattern})");
        let page = self.page;
        retry(&self.config, &description, || async move {
            let url = page.current_url().await?;
            Ok(if pattern.matches(&url) {
                AssertionCheckResult::Pass
            } else {
                AssertionCheckResult::Fail(format!("url was {url}"))
            })
        })
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mod retry_tests {
        use super::*;

        #[test]
        fn test_retry_config_default() {
            let config = RetryConfig::default();
            assert_eq!(config.timeout, Duration::from_secs(5));
            assert_eq!(config.poll_interval, Duration::from_millis(100));
        }

        #[tokio::test]
        async fn test_passes_after_some_attempts() {
            let counter = AtomicUsize::new(0);
            let config = RetryConfig::new(Duration::from_secs(1))
                .with_poll_interval(Duration::from_millis(1));
            let result = retry(&config, "counter", || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(if n >= 3 {
                        AssertionCheckResult::Pass
                    } else {
                        AssertionCheckResult::Fail(format!("n = {n}"))
                    })
                }
            })
            .await
            .unwrap();
            assert_eq!(result.attempts, 3);
        }

        #[tokio::test]
        async fn test_failure_message_carries_last_reason() {
            let config = RetryConfig::new(Duration::from_millis(20))
                .with_poll_interval(Duration::from_millis(5));
            let err = retry(&config, "never", || async {
                Ok(AssertionCheckResult::Fail("still hidden".to_string()))
            })
            .await
            .unwrap_err();
            let message = err.to_string();
            assert!(message.starts_with("Assertion failed: never: assertion failed after"));
            assert!(message.ends_with("still hidden"));
        }

        #[tokio::test]
        async fn test_errors_are_not_retried() {
            let counter = AtomicUsize::new(0);
            let config = RetryConfig::new(Duration::from_secs(1));
            let err = retry(&config, "strict", || {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ProbeError::StrictModeViolation {
                        selector: "label=\"Heslo\"i".to_string(),
                        count: 2,
                    })
                }
            })
            .await
            .unwrap_err();
            assert!(matches!(err, ProbeError::StrictModeViolation { count: 2, .. }));
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_expect_builder() {
            let locator = Locator::by_text("Nevalidní e-mail");
            let e = expect(&locator)
                .with_timeout(Duration::from_millis(250))
                .with_poll_interval(Duration::from_millis(10));
            assert_eq!(e.config.timeout, Duration::from_millis(250));
            assert_eq!(e.config.poll_interval, Duration::from_millis(10));
        }
    }
}
