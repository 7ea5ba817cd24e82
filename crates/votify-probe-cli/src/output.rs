//! Terminal output and log setup

use console::{style, Term};
use tracing_subscriber::EnvFilter;
use votify_probe::{Scenario, SuiteResults, TestOutcome};

/// Install the global tracing subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise the level follows `-v` and `-q`.
pub fn init_logging(verbosity: u8, quiet: bool, json: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("votify_probe={default_level},{default_level}")));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1);

    // a second init (tests, embedding) keeps the first subscriber
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

/// Writes case lines, summaries and listings to stdout
#[derive(Debug)]
pub struct Printer {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Printer {
    /// Create a printer
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn prefix(&self, outcome: TestOutcome) -> String {
        match (outcome, self.use_color) {
            (TestOutcome::Passed, true) => style("✓").green().bold().to_string(),
            (TestOutcome::Failed, true) => style("✗").red().bold().to_string(),
            (TestOutcome::Skipped, true) => style("-").yellow().to_string(),
            (TestOutcome::Passed, false) => "PASS".to_string(),
            (TestOutcome::Failed, false) => "FAIL".to_string(),
            (TestOutcome::Skipped, false) => "SKIP".to_string(),
        }
    }

    /// Print every case, then failure details and the summary line
    pub fn results(&self, results: &SuiteResults) {
        for result in &results.results {
            // failures always print, even in quiet mode
            if self.quiet && result.outcome != TestOutcome::Failed {
                continue;
            }
            let mut line = format!("{} {}", self.prefix(result.outcome), result.name);
            if result.outcome != TestOutcome::Skipped {
                let timing = if result.attempts > 1 {
                    format!(" ({}ms, {} attempts)", result.duration_ms, result.attempts)
                } else {
                    format!(" ({}ms)", result.duration_ms)
                };
                line.push_str(&self.dim(&timing));
            }
            let _ = self.term.write_line(&line);
        }

        let failures = results.failures();
        if !failures.is_empty() {
            let _ = self.term.write_line("");
            let _ = self.term.write_line(&self.bold("Failures:"));
            for failure in failures {
                let kind = failure
                    .failure
                    .map(|kind| self.dim(&format!(" [{kind}]")))
                    .unwrap_or_default();
                let _ = self.term.write_line(&format!("\n  {}{kind}", failure.name));
                if let Some(error) = &failure.error {
                    for line in error.lines() {
                        let _ = self.term.write_line(&format!("    {line}"));
                    }
                }
            }
        }

        self.summary(results);
    }

    /// Print the summary line
    pub fn summary(&self, results: &SuiteResults) {
        let line = votify_probe::reporter::summary(results);
        let line = if !self.use_color {
            line
        } else if results.all_passed() {
            style(line).green().to_string()
        } else {
            style(line).red().bold().to_string()
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&line);
    }

    /// Print case names grouped as they run
    pub fn list(&self, scenarios: &[Scenario]) {
        let mut current = None;
        for scenario in scenarios {
            if current != Some(scenario.group()) {
                current = Some(scenario.group());
                let _ = self.term.write_line(&self.bold(scenario.group().title()));
            }
            let _ = self.term.write_line(&format!("  {}", scenario.full_name()));
        }
        if !self.quiet {
            let _ = self
                .term
                .write_line(&self.dim(&format!("\n{} test case(s)", scenarios.len())));
        }
    }

    /// Print raw report text (json/junit)
    pub fn raw(&self, text: &str) {
        let _ = self.term.write_str(text);
        if !text.ends_with('\n') {
            let _ = self.term.write_line("");
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.use_color {
            style(text).bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.use_color {
            style(text).dim().to_string()
        } else {
            text.to_string()
        }
    }
}
