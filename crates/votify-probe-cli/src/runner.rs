//! Run and list commands

use crate::commands::{ListArgs, RunArgs};
use crate::error::{CliError, CliResult};
use crate::output::Printer;
use std::sync::Arc;
use votify_probe::reporter::{self, ReportFormat};
use votify_probe::{
    MockFaults, MockPageFactory, PageFactory, Scenario, SuiteConfig, SuiteResults, SuiteRunner,
};

/// Layer the config file, the environment and the flags, in that order
pub fn build_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut config = match &args.config {
        Some(path) => SuiteConfig::from_file(path)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?,
        None => SuiteConfig::default(),
    }
    .with_env();

    if let Some(url) = &args.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            return Err(CliError::invalid_argument("--jobs must be at least 1"));
        }
        config = config.with_jobs(jobs);
    }
    if let Some(retries) = args.retries {
        config = config.with_retries(retries);
    }
    let mut timeouts = config.timeouts;
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err(CliError::invalid_argument("--timeout must be greater than zero"));
        }
        timeouts.test_ms = timeout;
    }
    if let Some(timeout) = args.navigation_timeout {
        if timeout == 0 {
            return Err(CliError::invalid_argument(
                "--navigation-timeout must be greater than zero",
            ));
        }
        timeouts.navigation_ms = timeout;
    }
    config = config.with_timeouts(timeouts);
    if args.headed {
        config = config.with_headless(false);
    }
    if let Some(path) = &args.chromium_path {
        config = config.with_chromium_path(path.clone());
    }
    if args.no_sandbox {
        config = config.with_no_sandbox();
    }
    if args.fail_fast {
        config = config.with_fail_fast(true);
    }

    config.validate()?;
    Ok(config)
}

/// Faults requested with `--fault`
#[must_use]
pub fn mock_faults(args: &RunArgs) -> MockFaults {
    args.fault
        .iter()
        .fold(MockFaults::none(), |faults, fault| fault.apply(faults))
}

/// Cases matching `filter`, or an error when nothing matches
pub fn select(filter: Option<&str>) -> CliResult<Vec<Scenario>> {
    let selected = Scenario::select(filter);
    if selected.is_empty() {
        return Err(CliError::NoTestsSelected {
            filter: filter.unwrap_or_default().to_string(),
        });
    }
    Ok(selected)
}

async fn run_with<F>(
    factory: Arc<F>,
    config: SuiteConfig,
    filter: Option<&str>,
) -> CliResult<SuiteResults>
where
    F: PageFactory + 'static,
{
    let mut runner = SuiteRunner::with_shared_factory(factory, config);
    if let Some(filter) = filter {
        runner = runner.with_filter(filter);
    }
    Ok(runner.run().await?)
}

/// Execute the selected cases against the in-memory page or Chromium
pub async fn run_suite(config: SuiteConfig, args: &RunArgs) -> CliResult<SuiteResults> {
    let selected = select(args.filter.as_deref())?;
    tracing::info!(
        cases = selected.len(),
        offline = args.offline,
        url = %config.sign_up_url(),
        "starting run"
    );

    if args.offline {
        let factory = Arc::new(MockPageFactory::new(mock_faults(args)));
        return run_with(factory, config, args.filter.as_deref()).await;
    }
    run_in_browser(config, args).await
}

#[cfg(feature = "browser")]
async fn run_in_browser(config: SuiteConfig, args: &RunArgs) -> CliResult<SuiteResults> {
    let browser = Arc::new(votify_probe::Browser::launch(&config).await?);
    let results = run_with(Arc::clone(&browser), config, args.filter.as_deref()).await;
    match Arc::try_unwrap(browser) {
        Ok(browser) => {
            if let Err(e) = browser.shutdown().await {
                tracing::warn!(error = %e, "browser did not shut down cleanly");
            }
        }
        Err(_) => tracing::warn!("browser still referenced after run, leaving it to drop"),
    }
    results
}

#[cfg(not(feature = "browser"))]
async fn run_in_browser(_config: SuiteConfig, _args: &RunArgs) -> CliResult<SuiteResults> {
    Err(CliError::BrowserUnavailable)
}

/// Print the results in the chosen format and write the report file if asked
pub fn report(results: &SuiteResults, args: &RunArgs, printer: &Printer) -> CliResult<()> {
    let format = ReportFormat::from(args.format);
    match format {
        ReportFormat::Text => printer.results(results),
        ReportFormat::Json | ReportFormat::Junit => {
            printer.raw(&reporter::render(results, format)?);
        }
    }
    if let Some(path) = &args.output {
        reporter::write_report(results, format, path)?;
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}

/// `run` command; returns whether every case passed
pub async fn run(args: &RunArgs, printer: &Printer) -> CliResult<bool> {
    let config = build_config(args)?;
    let results = run_suite(config, args).await?;
    report(&results, args, printer)?;
    Ok(results.all_passed())
}

/// `list` command
pub fn list(args: &ListArgs, printer: &Printer) -> CliResult<()> {
    let selected = select(args.filter.as_deref())?;
    printer.list(&selected);
    Ok(())
}
