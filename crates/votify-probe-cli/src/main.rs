//! votify-probe: end-to-end checks for the Votify sign-up form
//!
//! Exit status is 0 when every selected case passed, 1 when any failed and
//! 2 when the run could not happen at all.

use clap::Parser;
use std::process::ExitCode;
use votify_probe_cli::{init_logging, runner, Cli, CliResult, Commands, Printer};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet, cli.log_json);

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> CliResult<bool> {
    let printer = Printer::new(cli.color.should_color(), cli.quiet);

    match cli.command {
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(runner::run(&args, &printer))
        }
        Commands::List(args) => {
            runner::list(&args, &printer)?;
            Ok(true)
        }
    }
}
