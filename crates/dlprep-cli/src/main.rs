use dlprep_core::logging;

mod cli;

fn main() {
    // Initialize logging as early as possible; fall back to stderr if the
    // state dir is unwritable.
    if logging::init_logging().is_err() {
        logging::init_logging_stderr();
    }

    if let Err(err) = cli::run_from_args() {
        eprintln!("dlprep error: {:#}", err);
        std::process::exit(1);
    }
}
