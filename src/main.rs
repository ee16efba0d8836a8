use std::process::ExitCode;

fn main() -> ExitCode {
    match medipatient_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("medipatient: {e}");
            ExitCode::FAILURE
        }
    }
}
