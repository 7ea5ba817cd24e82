//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use votify_probe::{MockFaults, ReportFormat};

/// votify-probe: end-to-end checks for the Votify sign-up form
#[derive(Parser, Debug)]
#[command(name = "votify-probe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the registration checks
    Run(RunArgs),

    /// List the test cases without running them
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// YAML config file (CLI flags win over file and environment)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Origin of the application under test
    #[arg(long)]
    pub base_url: Option<String>,

    /// Only run cases whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Number of cases running at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Extra attempts for a failing case
    #[arg(long)]
    pub retries: Option<u32>,

    /// Per-case timeout in milliseconds (must exceed the navigation timeout)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Budget for page loads and the post-registration redirect, in milliseconds
    #[arg(long)]
    pub navigation_timeout: Option<u64>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Path to a Chromium binary
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Stop scheduling cases after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Report format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,

    /// Also write the report to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run against the in-memory sign-up page instead of Chromium
    #[arg(long)]
    pub offline: bool,

    /// Break the in-memory page on purpose (requires --offline)
    #[arg(long, value_enum, requires = "offline")]
    pub fault: Vec<FaultArg>,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Only list cases whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Report format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
    /// JUnit XML
    Junit,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
            FormatArg::Junit => Self::Junit,
        }
    }
}

/// Faults for the in-memory page
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultArg {
    /// Never redirect after a valid submit
    NoRedirect,
    /// Never show the length message on blur
    NoLengthCheck,
    /// Accept malformed addresses
    AcceptAllEmails,
    /// Always show the mismatch message
    StickyMismatch,
    /// Render the password label twice
    DuplicateLabel,
}

impl FaultArg {
    /// Apply this fault to `faults`
    #[must_use]
    pub const fn apply(self, faults: MockFaults) -> MockFaults {
        match self {
            Self::NoRedirect => faults.without_redirect(),
            Self::NoLengthCheck => faults.without_length_check(),
            Self::AcceptAllEmails => faults.accepting_all_emails(),
            Self::StickyMismatch => faults.with_sticky_mismatch(),
            Self::DuplicateLabel => faults.with_duplicate_password_label(),
        }
    }
}

/// Color choice argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Color when stdout is a terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

impl ColorArg {
    /// Resolve against the terminal
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}
