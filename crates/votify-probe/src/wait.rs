//! Wait Mechanisms
//!
//! Polling waits for URLs and arbitrary async conditions.
//!
//! URL globs follow the usual browser-test conventions: `**` matches any
//! run of characters, `*` matches anything except `/`, and every other
//! character (including `?`) is literal. The whole URL must match.

use crate::driver::PageDriver;
use crate::result::{ProbeError, ProbeResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// URL PATTERN
// =============================================================================

/// Pattern for matching page URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Contains substring
    Contains(String),
    /// Glob pattern (e.g., "**/successful-sign-up?email=*")
    Glob(String),
    /// Regex match (unanchored)
    Regex(String),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Check if a URL matches this pattern.
    ///
    /// A pattern that does not compile matches nothing.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::Glob(pattern) => glob_to_regex(pattern).is_ok_and(|re| re.is_match(url)),
            Self::Regex(pattern) => Regex::new(pattern).is_ok_and(|re| re.is_match(url)),
            Self::Any => true,
        }
    }

    /// Check that the pattern compiles
    pub fn validate(&self) -> ProbeResult<()> {
        let compiled = match self {
            Self::Glob(pattern) => glob_to_regex(pattern).map(|_| ()),
            Self::Regex(pattern) => Regex::new(pattern).map(|_| ()),
            _ => Ok(()),
        };
        compiled.map_err(|e| ProbeError::ConfigError {
            message: format!("invalid URL pattern {self}: {e}"),
        })
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "url == {p:?}"),
            Self::Contains(p) => write!(f, "url contains {p:?}"),
            Self::Glob(p) => write!(f, "url glob {p:?}"),
            Self::Regex(p) => write!(f, "url regex /{p}/"),
            Self::Any => write!(f, "any url"),
        }
    }
}

/// Translate a URL glob into an anchored regex
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::with_capacity(glob.len() * 2 + 2);
    pattern.push('^');
    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                pattern.push_str(".*");
            } else {
                pattern.push_str("[^/]*");
            }
        } else {
            let mut buf = [0u8; 4];
            pattern.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the condition was evaluated
    pub polls: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// POLLING
// =============================================================================

/// Evaluate `check` until it yields `true` or the timeout expires.
///
/// The condition is always evaluated at least once, even with a zero
/// timeout. Errors from `check` abort the wait immediately.
pub async fn poll_until<F, Fut>(
    options: &WaitOptions,
    description: &str,
    mut check: F,
) -> ProbeResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<bool>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let mut polls = 0u32;
    loop {
        polls += 1;
        if check().await? {
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                polls,
                waited_for: description.to_string(),
            });
        }
        if Instant::now() >= deadline {
            return Err(ProbeError::Timeout {
                ms: options.timeout_ms,
                waited_for: description.to_string(),
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Wait until the page URL matches `pattern`, returning the matching URL.
pub async fn wait_for_url<D: PageDriver + ?Sized>(
    page: &D,
    pattern: &UrlPattern,
    options: &WaitOptions,
) -> ProbeResult<String> {
    pattern.validate()?;
    let deadline = Instant::now() + options.timeout();
    loop {
        let url = page.current_url().await?;
        if pattern.matches(&url) {
            tracing::debug!(%url, "url matched {pattern}");
            return Ok(url);
        }
        if Instant::now() >= deadline {
            return Err(ProbeError::Timeout {
                ms: options.timeout_ms,
                waited_for: format!("{pattern} (last url: {url})"),
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Wait until an async predicate holds.
///
/// Infallible counterpart of [`poll_until`]; a timeout is the only error.
pub async fn wait_until<F, Fut>(options: &WaitOptions, mut predicate: F) -> ProbeResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    poll_until(options, "predicate", || {
        let pending = predicate();
        async move { Ok(pending.await) }
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    mod url_pattern_tests {
        use super::*;

        const SUCCESS: &str =
            "https://auth.votify.app/cs/successful-sign-up?email=test.abc%40example.com";

        #[test]
        fn test_success_glob_matches_redirect() {
            let pattern = UrlPattern::Glob("**/successful-sign-up?email=*".to_string());
            assert!(pattern.matches(SUCCESS));
        }

        #[test]
        fn test_glob_question_mark_is_literal() {
            let pattern = UrlPattern::Glob("**/successful-sign-up?email=*".to_string());
            assert!(!pattern.matches("https://auth.votify.app/cs/successful-sign-upXemail=a"));
        }

        #[test]
        fn test_glob_is_anchored() {
            let pattern = UrlPattern::Glob("**/sign-up".to_string());
            assert!(pattern.matches("https://auth.votify.app/cs/sign-up"));
            assert!(!pattern.matches("https://auth.votify.app/cs/sign-up?"));
        }

        #[test]
        fn test_single_star_stops_at_slash() {
            let pattern = UrlPattern::Glob("https://*/sign-up".to_string());
            assert!(pattern.matches("https://host/sign-up"));
            assert!(!pattern.matches("https://host/cs/sign-up"));
        }

        #[test]
        fn test_sign_up_page_does_not_match_success_glob() {
            let pattern = UrlPattern::Glob("**/successful-sign-up?email=*".to_string());
            assert!(!pattern.matches("https://auth.votify.app/cs/sign-up?"));
        }

        #[test]
        fn test_regex_metacharacters_in_glob_are_literal() {
            let pattern = UrlPattern::Glob("**/a.b+c".to_string());
            assert!(pattern.matches("http://x/a.b+c"));
            assert!(!pattern.matches("http://x/aXbbc"));
        }

        #[test]
        fn test_contains_and_exact() {
            assert!(UrlPattern::Contains("successful-sign-up".into()).matches(SUCCESS));
            assert!(UrlPattern::Exact(SUCCESS.into()).matches(SUCCESS));
            assert!(!UrlPattern::Exact("https://auth.votify.app".into()).matches(SUCCESS));
            assert!(UrlPattern::Any.matches(""));
        }

        #[test]
        fn test_bad_regex_matches_nothing_and_fails_validation() {
            let pattern = UrlPattern::Regex("(".to_string());
            assert!(!pattern.matches("anything"));
            assert!(pattern.validate().is_err());
        }
    }

    mod poll_tests {
        use super::*;
        use std::sync::atomic::{AtomicU32, Ordering};

        #[tokio::test]
        async fn test_poll_until_counts_attempts() {
            let calls = AtomicU32::new(0);
            let options = WaitOptions::new().with_timeout(1_000).with_poll_interval(1);
            let result = poll_until(&options, "third call", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n >= 3) }
            })
            .await
            .unwrap();
            assert_eq!(result.polls, 3);
            assert_eq!(result.waited_for, "third call");
        }

        #[tokio::test]
        async fn test_poll_until_times_out() {
            let options = WaitOptions::new().with_timeout(20).with_poll_interval(5);
            let err = poll_until(&options, "never", || async { Ok(false) })
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { ms: 20, ref waited_for } if waited_for == "never"));
        }

        #[tokio::test]
        async fn test_zero_timeout_still_checks_once() {
            let options = WaitOptions::new().with_timeout(0);
            assert!(poll_until(&options, "now", || async { Ok(true) }).await.is_ok());
        }

        #[tokio::test]
        async fn test_check_error_aborts() {
            let options = WaitOptions::new().with_timeout(1_000);
            let err = poll_until(&options, "boom", || async { Err(ProbeError::page("closed")) })
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::PageError { .. }));
        }

        #[tokio::test]
        async fn test_wait_until_predicate() {
            let options = WaitOptions::new().with_timeout(10).with_poll_interval(1);
            assert!(wait_until(&options, || async { true }).await.is_ok());
            let err = wait_until(&options, || async { false }).await.unwrap_err();
            assert!(matches!(err, ProbeError::Timeout { ms: 10, .. }));
        }

        #[tokio::test]
        async fn test_wait_until_awaits_async_state() {
            let flag = std::sync::Arc::new(tokio::sync::Mutex::new(0u32));
            let options = WaitOptions::new().with_timeout(1_000).with_poll_interval(1);
            let result = wait_until(&options, || {
                let flag = std::sync::Arc::clone(&flag);
                async move {
                    let mut seen = flag.lock().await;
                    *seen += 1;
                    *seen >= 3
                }
            })
            .await
            .unwrap();
            assert_eq!(result.polls, 3);
        }
    }
}
