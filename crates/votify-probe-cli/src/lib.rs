//! votify-probe CLI library
//!
//! ```bash
//! votify-probe list                         # show the 15 cases
//! votify-probe run                          # run against auth.votify.app in Chromium
//! votify-probe run --filter "Email"         # only the email-format cases
//! votify-probe run --offline --format junit # in-memory page, JUnit XML on stdout
//! ```

#![warn(missing_docs)]

pub mod commands;
pub mod error;
pub mod output;
pub mod runner;

pub use commands::{Cli, ColorArg, Commands, FaultArg, FormatArg, ListArgs, RunArgs};
pub use error::{CliError, CliResult};
pub use output::{init_logging, Printer};
