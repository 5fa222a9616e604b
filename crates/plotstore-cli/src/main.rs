//! Plotstore CLI - run plot producers over text logs

mod cli;
mod colorizer;
mod report;

use clap::Parser;
use plotstore::core::logging::init_logging;

fn main() {
    let cli_args = cli::Cli::parse();

    // Explicit flags win over PLOTSTORE_LOG_LEVEL / PLOTSTORE_LOG_FORMAT
    let level = cli_args.log_level.map(|l| l.as_str());
    let format = cli_args.log_format.map(|f| f.as_str());
    if let Err(e) = init_logging(level, format) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let mut app = cli::PlotstoreApp::new();

    if let Err(e) = app.run(cli_args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
