use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match examgu_rust::run_worker().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("examgu-worker: {err:#}");
            ExitCode::FAILURE
        }
    }
}
