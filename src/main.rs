use std::process::ExitCode;

fn main() -> ExitCode {
    medscan_lib::init_tracing();

    match medscan_lib::run(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Batch run failed");
            eprintln!("medscan: {e}");
            ExitCode::FAILURE
        }
    }
}
