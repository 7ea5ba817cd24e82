//! The whole registration suite against the in-memory sign-up page.
//!
//! A healthy page must pass every case; each injected fault must fail
//! exactly the cases that guard the broken behaviour.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;
use votify_probe::prelude::*;
use votify_probe::{Group, SuiteResults, TestOutcome, Timeouts};

fn fast_config() -> SuiteConfig {
    SuiteConfig::default()
        .with_base_url("http://votify.test")
        .with_jobs(8)
        .with_timeouts(Timeouts {
            action_ms: 300,
            expect_ms: 300,
            navigation_ms: 800,
            test_ms: 5_000,
            poll_ms: 10,
        })
}

async fn run(faults: MockFaults) -> SuiteResults {
    let faults = faults.with_redirect_delay(Duration::from_millis(30));
    SuiteRunner::new(MockPageFactory::new(faults), fast_config())
        .run()
        .await
        .expect("suite should run")
}

fn failed_names(results: &SuiteResults) -> Vec<String> {
    results.failures().iter().map(|r| r.name.clone()).collect()
}

// ============================================================================
// Healthy page
// ============================================================================

#[tokio::test]
async fn test_healthy_page_passes_everything() {
    let results = run(MockFaults::none()).await;
    assert!(results.all_passed(), "{:#?}", results.failures());
    assert_eq!(results.total(), 15);
    assert!(results.results.iter().all(|r| r.attempts == 1));
}

#[tokio::test]
async fn test_every_group_is_represented() {
    let results = run(MockFaults::none()).await;
    for group in [
        Group::FieldPresence,
        Group::EmailValidation,
        Group::PasswordValidation,
        Group::FormSubmission,
    ] {
        assert!(results.results.iter().any(|r| r.group == group), "{group}");
    }
}

// ============================================================================
// Injected regressions
// ============================================================================

#[tokio::test]
async fn test_accepting_bad_emails_fails_the_eight_invalid_fixtures() {
    let results = run(MockFaults::none().accepting_all_emails()).await;
    let failed = failed_names(&results);
    assert_eq!(failed.len(), 8, "{failed:#?}");
    assert!(failed.iter().all(|n| n.contains("Email Validation")));
    assert!(!failed.iter().any(|n| n.ends_with("for valid@example.com")));
}

#[tokio::test]
async fn test_missing_length_check_fails_only_the_short_password_case() {
    let results = run(MockFaults::none().without_length_check()).await;
    assert_eq!(
        failed_names(&results),
        vec![
            "User Registration Form > Password Validation > should reject passwords shorter than 8 characters on blur"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_sticky_mismatch_fails_the_matching_case() {
    let results = run(MockFaults::none().with_sticky_mismatch()).await;
    let failed = failed_names(&results);
    assert_eq!(failed.len(), 1, "{failed:#?}");
    assert!(failed[0].ends_with("should accept matching passwords"));
}

#[tokio::test]
async fn test_missing_redirect_fails_the_submission_case() {
    let results = run(MockFaults::none().without_redirect()).await;
    let failed = results.failures();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].group, Group::FormSubmission);
    let error = failed[0].error.as_deref().unwrap();
    assert!(error.contains("successful-sign-up"), "{error}");
}

#[tokio::test]
async fn test_duplicate_label_fails_every_case_touching_the_password() {
    let results = run(MockFaults::none().with_duplicate_password_label()).await;
    assert_eq!(results.failed_count(), 15);
    assert!(results
        .failures()
        .iter()
        .all(|r| r.error.as_deref().unwrap().contains("Strict mode violation")));
}

// ============================================================================
// Runner controls
// ============================================================================

#[tokio::test]
async fn test_fail_fast_with_one_job_stops_after_first_failure() {
    let results = SuiteRunner::new(
        MockPageFactory::new(MockFaults::none().with_duplicate_password_label()),
        fast_config().with_jobs(1).with_fail_fast(true),
    )
    .run()
    .await
    .unwrap();
    assert_eq!(results.failed_count(), 1);
    assert_eq!(results.skipped_count(), 14);
    assert_eq!(results.results[1].outcome, TestOutcome::Skipped);
}

#[tokio::test]
async fn test_filter_runs_single_fixture() {
    let results = SuiteRunner::new(MockPageFactory::new(MockFaults::none()), fast_config())
        .with_filter("invalid@domain..com")
        .run()
        .await
        .unwrap();
    assert_eq!(results.total(), 1);
    assert!(results.all_passed());
}
