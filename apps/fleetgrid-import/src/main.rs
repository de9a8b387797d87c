//! Group import reconciliation tool for the fleetgrid platform.

use clap::Parser;

use fleetgrid_import::cli::Cli;
use fleetgrid_import::import;
use fleetgrid_import::logging::Logger;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let logger = match Logger::new(args.verbose, args.log_file.as_deref()) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("unable to open log file: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = import::execute(args, &logger).await {
        e.print();
        std::process::exit(e.exit_code());
    }
}
