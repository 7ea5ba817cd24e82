//! Suite configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables, then whatever the caller sets with the `with_*`
//! builders (the CLI maps its flags onto those).

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default origin of the application under test
pub const DEFAULT_BASE_URL: &str = "https://auth.votify.app";

/// Localized sign-up path
pub const DEFAULT_SIGN_UP_PATH: &str = "/cs/sign-up?";

/// Environment variable overriding the origin
pub const ENV_BASE_URL: &str = "VOTIFY_BASE_URL";

/// Environment variable pointing at a Chromium binary
pub const ENV_CHROMIUM_PATH: &str = "CHROMIUM_PATH";

/// Environment variable toggling headless mode (`0`/`false` shows the window)
pub const ENV_HEADLESS: &str = "VOTIFY_HEADLESS";

/// Environment variable overriding the number of parallel jobs
pub const ENV_JOBS: &str = "VOTIFY_JOBS";

/// Upper bound on parallel jobs
pub const MAX_JOBS: usize = 256;

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Run in headless mode
    pub headless: bool,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Timeouts, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Auto-wait budget for fill/click/blur
    pub action_ms: u64,
    /// Retry budget for visibility expectations
    pub expect_ms: u64,
    /// Budget for page loads and URL waits
    pub navigation_ms: u64,
    /// Budget for one whole test case
    pub test_ms: u64,
    /// Polling interval shared by waits and expectations
    pub poll_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 5_000,
            expect_ms: 5_000,
            navigation_ms: 30_000,
            test_ms: 60_000,
            poll_ms: 100,
        }
    }
}

impl Timeouts {
    /// Action timeout as Duration
    #[must_use]
    pub const fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    /// Expectation timeout as Duration
    #[must_use]
    pub const fn expect(&self) -> Duration {
        Duration::from_millis(self.expect_ms)
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation(&self) -> Duration {
        Duration::from_millis(self.navigation_ms)
    }

    /// Per-test timeout as Duration
    #[must_use]
    pub const fn test(&self) -> Duration {
        Duration::from_millis(self.test_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

/// Configuration for a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Origin of the application under test
    pub base_url: String,
    /// Path of the sign-up page, appended to `base_url`
    pub sign_up_path: String,
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Timeouts
    pub timeouts: Timeouts,
    /// Maximum number of cases running at once
    pub jobs: usize,
    /// Extra attempts for a failing case
    pub retries: u32,
    /// Stop scheduling new cases after the first failure
    pub fail_fast: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            sign_up_path: DEFAULT_SIGN_UP_PATH.to_string(),
            browser: BrowserSettings::default(),
            timeouts: Timeouts::default(),
            jobs: 4,
            retries: 0,
            fail_fast: false,
        }
    }
}

impl SuiteConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from a YAML file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded suite config");
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    #[must_use]
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(path) = lookup(ENV_CHROMIUM_PATH).filter(|v| !v.trim().is_empty()) {
            self.browser.chromium_path = Some(path);
        }
        if let Some(flag) = lookup(ENV_HEADLESS) {
            self.browser.headless = !matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Some(jobs) = lookup(ENV_JOBS).and_then(|v| v.trim().parse::<usize>().ok()) {
            self.jobs = jobs;
        }
        self
    }

    /// Set the origin of the application under test
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.browser.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.browser.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.browser.sandbox = false;
        self
    }

    /// Set the number of parallel jobs
    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set the number of retries for failing cases
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Enable or disable fail-fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Replace all timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Full URL of the sign-up page
    #[must_use]
    pub fn sign_up_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.sign_up_path.starts_with('/') {
            format!("{base}{}", self.sign_up_path)
        } else {
            format!("{base}/{}", self.sign_up_path)
        }
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> ProbeResult<()> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ProbeError::ConfigError {
            message: format!("invalid base_url {:?}: {e}", self.base_url),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProbeError::ConfigError {
                message: format!("base_url must be http(s), got {}", parsed.scheme()),
            });
        }
        if self.jobs == 0 {
            return Err(ProbeError::ConfigError {
                message: "jobs must be at least 1".to_string(),
            });
        }
        if self.jobs > MAX_JOBS {
            return Err(ProbeError::ConfigError {
                message: format!("jobs must be at most {MAX_JOBS}, got {}", self.jobs),
            });
        }
        if self.timeouts.test_ms <= self.timeouts.navigation_ms {
            return Err(ProbeError::ConfigError {
                message: format!(
                    "timeouts.test_ms ({}) must be greater than timeouts.navigation_ms ({})",
                    self.timeouts.test_ms, self.timeouts.navigation_ms
                ),
            });
        }
        if self.timeouts.poll_ms == 0 {
            return Err(ProbeError::ConfigError {
                message: "timeouts.poll_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    mod default_tests {
        use super::*;

        #[test]
        fn test_default_points_at_czech_sign_up() {
            let config = SuiteConfig::default();
            assert_eq!(config.sign_up_url(), "https://auth.votify.app/cs/sign-up?");
            assert!(config.browser.headless);
            assert_eq!(config.retries, 0);
        }

        #[test]
        fn test_default_timeouts() {
            let t = Timeouts::default();
            assert_eq!(t.action(), Duration::from_secs(5));
            assert_eq!(t.navigation(), Duration::from_secs(30));
            assert!(t.test() > t.navigation());
            assert_eq!(t.poll(), Duration::from_millis(100));
        }

        #[test]
        fn test_default_validates() {
            assert!(SuiteConfig::default().validate().is_ok());
        }
    }

    mod url_tests {
        use super::*;

        #[test]
        fn test_trailing_slash_on_base_is_dropped() {
            let config = SuiteConfig::new().with_base_url("http://localhost:3000/");
            assert_eq!(config.sign_up_url(), "http://localhost:3000/cs/sign-up?");
        }

        #[test]
        fn test_relative_path_gets_separator() {
            let mut config = SuiteConfig::new().with_base_url("http://localhost:3000");
            config.sign_up_path = "en/sign-up".to_string();
            assert_eq!(config.sign_up_url(), "http://localhost:3000/en/sign-up");
        }
    }

    mod env_tests {
        use super::*;

        fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            move |key| map.get(key).cloned()
        }

        #[test]
        fn test_env_overrides() {
            let config = SuiteConfig::new().with_env_from(lookup(&[
                (ENV_BASE_URL, "http://staging.local"),
                (ENV_CHROMIUM_PATH, "/usr/bin/chromium"),
                (ENV_HEADLESS, "false"),
                (ENV_JOBS, "2"),
            ]));
            assert_eq!(config.base_url, "http://staging.local");
            assert_eq!(config.browser.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert!(!config.browser.headless);
            assert_eq!(config.jobs, 2);
        }

        #[test]
        fn test_blank_and_garbage_values_are_ignored() {
            let config = SuiteConfig::new().with_env_from(lookup(&[
                (ENV_BASE_URL, "  "),
                (ENV_JOBS, "many"),
            ]));
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert_eq!(config.jobs, 4);
        }

        #[test]
        fn test_headless_stays_on_for_truthy_values() {
            let config = SuiteConfig::new().with_env_from(lookup(&[(ENV_HEADLESS, "1")]));
            assert!(config.browser.headless);
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                "base_url: http://localhost:8080\nretries: 2\ntimeouts:\n  expect_ms: 750\n"
            )
            .unwrap();

            let config = SuiteConfig::from_file(file.path()).unwrap();
            assert_eq!(config.base_url, "http://localhost:8080");
            assert_eq!(config.retries, 2);
            assert_eq!(config.timeouts.expect_ms, 750);
            assert_eq!(config.timeouts.action_ms, 5_000);
            assert_eq!(config.sign_up_path, DEFAULT_SIGN_UP_PATH);
        }

        #[test]
        fn test_invalid_base_url_is_rejected() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "base_url: not a url").unwrap();
            let err = SuiteConfig::from_file(file.path()).unwrap_err();
            assert!(matches!(err, ProbeError::ConfigError { .. }));
        }

        #[test]
        fn test_zero_jobs_is_rejected() {
            let config = SuiteConfig::new().with_jobs(0);
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_huge_job_count_is_rejected() {
            assert!(SuiteConfig::new().with_jobs(MAX_JOBS).validate().is_ok());
            let err = SuiteConfig::new().with_jobs(usize::MAX).validate().unwrap_err();
            assert!(matches!(err, ProbeError::ConfigError { .. }));
        }

        #[test]
        fn test_huge_job_count_in_yaml_is_rejected() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "jobs: 18446744073709551615").unwrap();
            let err = SuiteConfig::from_file(file.path()).unwrap_err();
            assert!(matches!(err, ProbeError::ConfigError { .. }));
        }

        #[test]
        fn test_case_budget_must_exceed_navigation_budget() {
            let mut config = SuiteConfig::new();
            config.timeouts.test_ms = config.timeouts.navigation_ms;
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("navigation_ms"), "{err}");
        }

        #[test]
        fn test_missing_file_is_io_error() {
            let err = SuiteConfig::from_file("/definitely/not/here.yaml").unwrap_err();
            assert!(matches!(err, ProbeError::Io(_)));
        }
    }
}
