use std::process::ExitCode;

fn main() -> ExitCode {
    let _guard = match signpost::logging::init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:#}");
            None
        }
    };

    match signpost::cli::run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
