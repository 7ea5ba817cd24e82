//! Suite runner.
//!
//! Each case gets its own page from the [`PageFactory`], is navigated to the
//! sign-up URL, runs under the per-case timeout, and is closed again. At most
//! `jobs` cases run at once.

use crate::config::SuiteConfig;
use crate::driver::{PageDriver, PageFactory};
use crate::result::{ProbeError, ProbeResult};
use crate::suite::{Group, Scenario, ScenarioContext, SUITE_NAME};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Final state of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Not run because an earlier case failed under fail-fast
    Skipped,
}

/// Kind of error behind a failed case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// An expectation did not hold
    Assertion,
    /// An element could not be found or acted on, or a wait ran out
    LocatorOrTimeout,
    /// Anything else (navigation, page, browser)
    Error,
}

impl FailureKind {
    /// Classify an error
    #[must_use]
    pub const fn of(error: &ProbeError) -> Self {
        if error.is_locator_or_timeout() {
            Self::LocatorOrTimeout
        } else if matches!(error, ProbeError::AssertionFailed { .. }) {
            Self::Assertion
        } else {
            Self::Error
        }
    }

    /// Short label used in reports
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Assertion => "assertion",
            Self::LocatorOrTimeout => "locator/timeout",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of running a single case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Full case name
    pub name: String,
    /// Group the case belongs to
    pub group: Group,
    /// Outcome
    pub outcome: TestOutcome,
    /// Error of the last attempt, if it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Kind of that error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Attempts made (0 when skipped)
    pub attempts: u32,
    /// Wall time of all attempts
    pub duration_ms: u64,
}

impl TestResult {
    /// Create a passing result
    #[must_use]
    pub fn pass(scenario: &Scenario, attempts: u32, duration: Duration) -> Self {
        Self {
            name: scenario.full_name(),
            group: scenario.group(),
            outcome: TestOutcome::Passed,
            error: None,
            failure: None,
            attempts,
            duration_ms: millis(duration),
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(
        scenario: &Scenario,
        error: &ProbeError,
        attempts: u32,
        duration: Duration,
    ) -> Self {
        Self {
            name: scenario.full_name(),
            group: scenario.group(),
            outcome: TestOutcome::Failed,
            error: Some(error.to_string()),
            failure: Some(FailureKind::of(error)),
            attempts,
            duration_ms: millis(duration),
        }
    }

    /// Create a skipped result
    #[must_use]
    pub fn skipped(scenario: &Scenario) -> Self {
        Self {
            name: scenario.full_name(),
            group: scenario.group(),
            outcome: TestOutcome::Skipped,
            error: None,
            failure: None,
            attempts: 0,
            duration_ms: 0,
        }
    }

    /// Whether the case passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == TestOutcome::Passed
    }
}

/// Results from running the suite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Individual results, in catalog order
    pub results: Vec<TestResult>,
    /// Total wall time
    pub duration_ms: u64,
}

impl SuiteResults {
    /// Every selected case passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(TestResult::passed)
    }

    /// Count passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestOutcome::Passed)
    }

    /// Count failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestOutcome::Failed)
    }

    /// Count skipped tests
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(TestOutcome::Skipped)
    }

    /// Get total test count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == TestOutcome::Failed)
            .collect()
    }

    fn count(&self, outcome: TestOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Runs scenarios against pages from a factory
#[derive(Debug)]
pub struct SuiteRunner<F> {
    factory: Arc<F>,
    config: SuiteConfig,
    filter: Option<String>,
}

impl<F> SuiteRunner<F>
where
    F: PageFactory + 'static,
{
    /// Create a runner
    #[must_use]
    pub fn new(factory: F, config: SuiteConfig) -> Self {
        Self::with_shared_factory(Arc::new(factory), config)
    }

    /// Create a runner around a factory the caller keeps a handle to
    #[must_use]
    pub fn with_shared_factory(factory: Arc<F>, config: SuiteConfig) -> Self {
        Self {
            factory,
            config,
            filter: None,
        }
    }

    /// Only run cases whose full name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Cases that [`run`](Self::run) would execute
    #[must_use]
    pub fn selected(&self) -> Vec<Scenario> {
        Scenario::select(self.filter.as_deref())
    }

    /// Run the selected cases
    pub async fn run(&self) -> ProbeResult<SuiteResults> {
        self.config.validate()?;
        let scenarios = self.selected();
        let start = Instant::now();
        tracing::info!(
            cases = scenarios.len(),
            jobs = self.config.jobs,
            retries = self.config.retries,
            url = %self.config.sign_up_url(),
            "starting suite"
        );

        let ctx = Arc::new(ScenarioContext::new(&self.config));
        let permits = Arc::new(Semaphore::new(self.config.jobs));
        let stop = Arc::new(AtomicBool::new(false));
        let url: Arc<str> = Arc::from(self.config.sign_up_url());
        let mut tasks = JoinSet::new();

        for (index, scenario) in scenarios.iter().cloned().enumerate() {
            let factory = Arc::clone(&self.factory);
            let ctx = Arc::clone(&ctx);
            let permits = Arc::clone(&permits);
            let stop = Arc::clone(&stop);
            let url = Arc::clone(&url);
            let retries = self.config.retries;
            let budget = self.config.timeouts.test();
            let fail_fast = self.config.fail_fast;
            let span = tracing::info_span!("case", name = %scenario.full_name());

            tasks.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return (index, TestResult::skipped(&scenario));
                    };
                    if stop.load(Ordering::SeqCst) {
                        tracing::debug!("skipped after earlier failure");
                        return (index, TestResult::skipped(&scenario));
                    }
                    let result =
                        run_case(factory.as_ref(), &scenario, &ctx, &url, retries, budget).await;
                    if fail_fast && !result.passed() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    (index, result)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<TestResult>> = vec![None; scenarios.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => tracing::error!(error = %e, "case task aborted"),
            }
        }

        let results: Vec<TestResult> = slots
            .into_iter()
            .zip(&scenarios)
            .map(|(slot, scenario)| {
                slot.unwrap_or_else(|| {
                    TestResult::fail(
                        scenario,
                        &ProbeError::page("case task aborted"),
                        0,
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        let summary = SuiteResults {
            suite_name: SUITE_NAME.to_string(),
            results,
            duration_ms: millis(start.elapsed()),
        };
        tracing::info!(
            passed = summary.passed_count(),
            failed = summary.failed_count(),
            skipped = summary.skipped_count(),
            duration_ms = summary.duration_ms,
            "suite finished"
        );
        Ok(summary)
    }
}

async fn run_case<F: PageFactory>(
    factory: &F,
    scenario: &Scenario,
    ctx: &ScenarioContext,
    url: &str,
    retries: u32,
    budget: Duration,
) -> TestResult {
    let start = Instant::now();
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = run_once(factory, scenario, ctx, url, budget).await;
        match outcome {
            Ok(()) => {
                tracing::info!(attempts, "passed");
                return TestResult::pass(scenario, attempts, start.elapsed());
            }
            Err(e) if attempts <= retries => {
                tracing::warn!(attempt = attempts, error = %e, "attempt failed, retrying");
            }
            Err(e) => {
                tracing::warn!(attempts, error = %e, "failed");
                return TestResult::fail(scenario, &e, attempts, start.elapsed());
            }
        }
    }
}

async fn run_once<F: PageFactory>(
    factory: &F,
    scenario: &Scenario,
    ctx: &ScenarioContext,
    url: &str,
    budget: Duration,
) -> ProbeResult<()> {
    let mut page = factory.open().await?;
    let steps = async {
        page.goto(url).await?;
        scenario.run(&mut page, ctx).await
    };
    // the page is closed on every path, including an expired budget
    let result = match tokio::time::timeout(budget, steps).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout {
            ms: millis(budget),
            waited_for: "test case".to_string(),
        }),
    };
    if let Err(e) = factory.close(page).await {
        tracing::warn!(error = %e, "failed to close page");
    }
    result
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::driver::ElementInfo;
    use crate::locator::Selector;
    use crate::mock::{MockFaults, MockPageFactory};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    fn fast_config() -> SuiteConfig {
        SuiteConfig::default()
            .with_base_url("http://votify.test")
            .with_timeouts(Timeouts {
                action_ms: 200,
                expect_ms: 200,
                navigation_ms: 1_000,
                test_ms: 3_000,
                poll_ms: 10,
            })
    }

    fn healthy() -> MockFaults {
        MockFaults::none().with_redirect_delay(Duration::from_millis(20))
    }

    /// Pages whose navigation never finishes
    #[derive(Debug, Default)]
    struct StallingFactory {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    #[derive(Debug)]
    struct StallingPage;

    #[async_trait]
    impl PageDriver for StallingPage {
        async fn goto(&mut self, _url: &str) -> ProbeResult<()> {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
            Ok(())
        }

        async fn current_url(&self) -> ProbeResult<String> {
            Ok("about:blank".to_string())
        }

        async fn resolve(&self, _selector: &Selector) -> ProbeResult<Vec<ElementInfo>> {
            Ok(Vec::new())
        }

        async fn fill(&mut self, _selector: &Selector, _value: &str) -> ProbeResult<()> {
            Ok(())
        }

        async fn click(&mut self, _selector: &Selector) -> ProbeResult<()> {
            Ok(())
        }

        async fn blur(&mut self, _selector: &Selector) -> ProbeResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl PageFactory for StallingFactory {
        type Page = StallingPage;

        async fn open(&self) -> ProbeResult<Self::Page> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(StallingPage)
        }

        async fn close(&self, _page: Self::Page) -> ProbeResult<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    mod result_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let s = Scenario::FieldPresence;
            let results = SuiteResults {
                suite_name: SUITE_NAME.to_string(),
                results: vec![
                    TestResult::pass(&s, 1, Duration::from_millis(5)),
                    TestResult::fail(&s, &ProbeError::assertion("boom"), 2, Duration::from_millis(5)),
                    TestResult::skipped(&s),
                ],
                duration_ms: 10,
            };
            assert_eq!(results.passed_count(), 1);
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.skipped_count(), 1);
            assert_eq!(results.failures().len(), 1);
            assert!(!results.all_passed());
        }

        #[test]
        fn test_failure_kind_classification() {
            let timeout = ProbeError::Timeout {
                ms: 5,
                waited_for: "url".to_string(),
            };
            assert_eq!(FailureKind::of(&timeout), FailureKind::LocatorOrTimeout);
            assert_eq!(
                FailureKind::of(&ProbeError::assertion("hidden")),
                FailureKind::Assertion
            );
            assert_eq!(FailureKind::of(&ProbeError::page("closed")), FailureKind::Error);

            let result =
                TestResult::fail(&Scenario::FieldPresence, &timeout, 1, Duration::ZERO);
            assert_eq!(result.failure, Some(FailureKind::LocatorOrTimeout));
            let json = serde_json::to_string(&result).unwrap();
            assert!(json.contains("\"failure\":\"locator_or_timeout\""), "{json}");
        }

        #[test]
        fn test_outcome_serializes_lowercase() {
            let json = serde_json::to_string(&TestOutcome::Skipped).unwrap();
            assert_eq!(json, "\"skipped\"");
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_full_catalog_passes_on_healthy_page() {
            let factory = Arc::new(MockPageFactory::new(healthy()));
            let runner = SuiteRunner::with_shared_factory(Arc::clone(&factory), fast_config());
            let results = runner.run().await.unwrap();
            assert!(results.all_passed(), "{:?}", results.failures());
            assert_eq!(results.total(), 15);
            assert_eq!(factory.pages_opened(), 15);
            assert_eq!(factory.pages_closed(), 15);
        }

        #[tokio::test]
        async fn test_results_keep_catalog_order() {
            let runner = SuiteRunner::new(MockPageFactory::new(healthy()), fast_config().with_jobs(8));
            let results = runner.run().await.unwrap();
            let names: Vec<String> = Scenario::catalog().iter().map(Scenario::full_name).collect();
            let got: Vec<String> = results.results.iter().map(|r| r.name.clone()).collect();
            assert_eq!(got, names);
        }

        #[tokio::test]
        async fn test_filter_limits_cases() {
            let runner = SuiteRunner::new(MockPageFactory::new(healthy()), fast_config())
                .with_filter("Password Validation");
            let results = runner.run().await.unwrap();
            assert_eq!(results.total(), 4);
        }

        #[tokio::test]
        async fn test_retries_are_counted() {
            let factory = Arc::new(MockPageFactory::new(healthy().without_redirect()));
            let runner = SuiteRunner::with_shared_factory(
                Arc::clone(&factory),
                fast_config().with_retries(1),
            )
            .with_filter("Form Submission");
            let results = runner.run().await.unwrap();
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.results[0].attempts, 2);
            assert_eq!(factory.pages_opened(), 2);
        }

        #[tokio::test]
        async fn test_fail_fast_skips_remaining() {
            let runner = SuiteRunner::new(
                MockPageFactory::new(healthy().with_duplicate_password_label()),
                fast_config().with_jobs(1).with_fail_fast(true),
            );
            let results = runner.run().await.unwrap();
            assert_eq!(results.passed_count(), 0);
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.skipped_count(), 14);
        }

        #[tokio::test]
        async fn test_case_timeout_fails_case() {
            let mut config = fast_config().with_jobs(1);
            config.timeouts.navigation_ms = 50;
            config.timeouts.test_ms = 100;
            let factory = Arc::new(StallingFactory::default());
            let runner = SuiteRunner::with_shared_factory(Arc::clone(&factory), config)
                .with_filter("Field Presence");
            let results = runner.run().await.unwrap();
            let error = results.results[0].error.clone().unwrap();
            assert!(error.contains("test case"), "{error}");
            assert_eq!(results.results[0].failure, Some(FailureKind::LocatorOrTimeout));
        }

        #[tokio::test]
        async fn test_timed_out_attempts_still_close_their_pages() {
            let mut config = fast_config().with_retries(2);
            config.timeouts.navigation_ms = 50;
            config.timeouts.test_ms = 100;
            let factory = Arc::new(StallingFactory::default());
            let runner = SuiteRunner::with_shared_factory(Arc::clone(&factory), config)
                .with_filter("Form Submission");
            let results = runner.run().await.unwrap();
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.results[0].attempts, 3);
            assert_eq!(factory.opened.load(Ordering::SeqCst), 3);
            assert_eq!(factory.closed.load(Ordering::SeqCst), 3);
        }

        #[tokio::test]
        async fn test_missing_redirect_reports_last_url() {
            let factory = Arc::new(MockPageFactory::new(healthy().without_redirect()));
            let runner = SuiteRunner::with_shared_factory(Arc::clone(&factory), fast_config())
                .with_filter("Form Submission");
            let results = runner.run().await.unwrap();
            let error = results.results[0].error.clone().unwrap();
            assert!(error.contains("last url: http://votify.test/cs/sign-up"), "{error}");
            assert!(!error.contains("test case"), "{error}");
            assert_eq!(factory.pages_opened(), factory.pages_closed());
        }

        #[tokio::test]
        async fn test_invalid_config_is_rejected_before_running() {
            let runner = SuiteRunner::new(MockPageFactory::default(), fast_config().with_jobs(0));
            assert!(runner.run().await.is_err());
        }
    }
}
