use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match healthbell_lib::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("HealthBell failed to start: {e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
