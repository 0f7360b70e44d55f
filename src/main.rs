use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match examgu_rust::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("examgu-rust: {err:#}");
            ExitCode::FAILURE
        }
    }
}
