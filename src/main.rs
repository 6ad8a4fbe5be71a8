//! CLI entry point for the group mask, time series and similarity analyses

use clap::Parser;
use neuroconn::io::cli::{Cli, StudyProcessor};
use neuroconn::io::logger;

fn main() -> neuroconn::Result<()> {
    let cli = Cli::parse();
    logger::init_cli_logger(cli.verbose, cli.quiet);
    let mut processor = StudyProcessor::new(cli)?;
    processor.process()
}
