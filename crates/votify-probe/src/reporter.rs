//! Rendering of [`SuiteResults`] as text, JSON, or JUnit XML.

use crate::harness::{FailureKind, SuiteResults, TestOutcome};
use crate::result::ProbeResult;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Output format for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// One line per case plus failure details
    #[default]
    Text,
    /// Machine-readable JSON document
    Json,
    /// JUnit XML for CI dashboards
    Junit,
}

/// Render results in the requested format
pub fn render(results: &SuiteResults, format: ReportFormat) -> ProbeResult<String> {
    Ok(match format {
        ReportFormat::Text => render_text(results),
        ReportFormat::Json => render_json(results)?,
        ReportFormat::Junit => render_junit(results),
    })
}

/// Render and write results to a file
pub fn write_report(
    results: &SuiteResults,
    format: ReportFormat,
    path: impl AsRef<Path>,
) -> ProbeResult<()> {
    std::fs::write(path, render(results, format)?)?;
    Ok(())
}

/// One-line summary
#[must_use]
pub fn summary(results: &SuiteResults) -> String {
    let total = results.total();
    let rate = if total == 0 {
        0.0
    } else {
        results.passed_count() as f64 / total as f64 * 100.0
    };
    format!(
        "{}: {}/{} passed ({rate:.1}%), {} failed, {} skipped in {:.2}s",
        results.suite_name,
        results.passed_count(),
        total,
        results.failed_count(),
        results.skipped_count(),
        results.duration_ms as f64 / 1000.0
    )
}

/// Plain-text report
#[must_use]
pub fn render_text(results: &SuiteResults) -> String {
    let mut out = String::new();
    for result in &results.results {
        let mark = match result.outcome {
            TestOutcome::Passed => "ok",
            TestOutcome::Failed => "FAIL",
            TestOutcome::Skipped => "skip",
        };
        let _ = write!(out, "{mark:>4}  {}", result.name);
        if result.outcome != TestOutcome::Skipped {
            let _ = write!(out, " ({}ms", result.duration_ms);
            if result.attempts > 1 {
                let _ = write!(out, ", {} attempts", result.attempts);
            }
            out.push(')');
        }
        out.push('\n');
    }

    let failures = results.failures();
    if !failures.is_empty() {
        out.push_str("\nfailures:\n");
        for failure in failures {
            let _ = write!(out, "\n  {}", failure.name);
            if let Some(kind) = failure.failure {
                let _ = write!(out, " [{kind}]");
            }
            out.push('\n');
            if let Some(error) = &failure.error {
                for line in error.lines() {
                    let _ = writeln!(out, "    {line}");
                }
            }
        }
    }

    out.push('\n');
    out.push_str(&summary(results));
    out.push('\n');
    out
}

/// JSON report
pub fn render_json(results: &SuiteResults) -> ProbeResult<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// JUnit XML report
#[must_use]
pub fn render_junit(results: &SuiteResults) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    let _ = writeln!(
        xml,
        r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
        escape_xml(&results.suite_name),
        results.total(),
        results.failed_count(),
        results.skipped_count(),
        results.duration_ms as f64 / 1000.0
    );
    for result in &results.results {
        let _ = writeln!(
            xml,
            r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
            escape_xml(result.group.title()),
            escape_xml(&result.name),
            result.duration_ms as f64 / 1000.0
        );
        match result.outcome {
            TestOutcome::Failed => {
                let error = escape_xml(result.error.as_deref().unwrap_or_default());
                let kind = result.failure.map_or("error", FailureKind::label);
                let _ = writeln!(
                    xml,
                    r#"    <failure type="{}" message="{error}">{error}</failure>"#,
                    escape_xml(kind)
                );
            }
            TestOutcome::Skipped => xml.push_str("    <skipped/>\n"),
            TestOutcome::Passed => {}
        }
        xml.push_str("  </testcase>\n");
    }
    xml.push_str("</testsuite>\n");
    xml
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::harness::TestResult;
    use crate::result::ProbeError;
    use crate::suite::Scenario;
    use std::time::Duration;

    fn sample() -> SuiteResults {
        let email = Scenario::EmailFormat {
            email: "invalid@".to_string(),
        };
        SuiteResults {
            suite_name: "User Registration Form".to_string(),
            results: vec![
                TestResult::pass(&Scenario::FieldPresence, 1, Duration::from_millis(120)),
                TestResult::fail(
                    &email,
                    &ProbeError::assertion("expect(text=\"Nevalidní e-mail\"i).to_be_visible()"),
                    2,
                    Duration::from_millis(900),
                ),
                TestResult::skipped(&Scenario::SuccessfulRegistration),
            ],
            duration_ms: 1_500,
        }
    }

    #[test]
    fn test_summary_line() {
        assert_eq!(
            summary(&sample()),
            "User Registration Form: 1/3 passed (33.3%), 1 failed, 1 skipped in 1.50s"
        );
    }

    #[test]
    fn test_text_report_lists_failures() {
        let text = render_text(&sample());
        assert!(text.contains("  ok  User Registration Form > Field Presence and Visibility"));
        assert!(text.contains("FAIL  User Registration Form > Email Validation > should validate email format for invalid@ (900ms, 2 attempts)"));
        assert!(text.contains("skip  User Registration Form > Form Submission"));
        assert!(text.contains("failures:"));
        assert!(text.contains("for invalid@ [assertion]"));
        assert!(text.contains("    Assertion failed"));
    }

    #[test]
    fn test_json_report_parses_back() {
        let json = render_json(&sample()).unwrap();
        let back: SuiteResults = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
        assert!(json.contains("\"outcome\": \"failed\""));
    }

    #[test]
    fn test_junit_escapes_and_marks() {
        let xml = render_junit(&sample());
        assert!(xml.contains(r#"tests="3" failures="1" skipped="1""#));
        assert!(xml.contains("&quot;Nevalidní e-mail&quot;"));
        assert!(xml.contains("<skipped/>"));
        assert!(xml.contains(r#"<failure type="assertion" message="Assertion failed: "#));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&sample(), ReportFormat::Json, &path).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("invalid@"));
    }
}
