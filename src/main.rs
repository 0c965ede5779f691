//! `textclass` - configuration tooling for the text-classification service

use clap::Parser;

use textclass::cli::args::Cli;
use textclass::cli::commands;
use textclass::error::ExitCode;
use textclass::observability::init_logging;

fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    match commands::dispatch(cli) {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
