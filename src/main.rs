use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tsh::{config::USAGE, Config, Shell, Startup};

fn main() -> ExitCode {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Startup::Run(config)) => config,
        Ok(Startup::Help) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            println!("tsh: {}", e);
            println!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.verbose { "tsh=debug" } else { "warn" })
    });
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match Shell::new(config).run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("tsh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
