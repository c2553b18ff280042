//! Fill the API keys into the front-end config file.
//!
//! Usage: `GEMINI_API_KEY=... NEWS_API_KEY=... generate-config`

use std::process::ExitCode;

use healthbell_lib::config_template;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let lookup = |key: &str| std::env::var(key).ok();
    let path = config_template::config_file_path(lookup);
    match config_template::generate(&path, lookup) {
        Ok(()) => {
            println!("Config file generated successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
