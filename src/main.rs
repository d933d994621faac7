//! qibuild CLI
//!
//! Entry point for the qibuild command-line application.

use anyhow::Result;
use clap::Parser;

use qibuild::cli::output::display_error;
use qibuild::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays parseable
    let output_config = cli.global.output();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(output_config.log_level().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.run() {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
