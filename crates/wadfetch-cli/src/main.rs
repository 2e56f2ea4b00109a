use std::process::ExitCode;
use wadfetch_core::logging;

mod cli;

fn main() -> ExitCode {
    // Initialize logging as early as possible; fall back to stderr if the
    // state dir is unusable so the CLI still runs.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    match cli::run_from_args() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            if !cli::exit::is_silent(&err) {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::from(cli::exit::exit_code(&err))
        }
    }
}
