pub mod config;
pub mod downloader;
pub mod prompt;
pub mod session;

use std::process::ExitCode;

use config::AppConfig;
use downloader::Downloader;
use prompt::{default_terminal, Prompter};
use session::Session;

/// Set up logging and run the interactive session until the user quits
pub async fn run() -> ExitCode {
    let config = AppConfig::from_env();

    let _log_guard = match config::init_logging(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let engine = config.engine();
    match engine.version() {
        Some(version) => tracing::info!(binary = %engine.path().display(), %version, "using yt-dlp"),
        None => tracing::warn!(binary = %engine.path().display(), "yt-dlp did not report a version; downloads will likely fail"),
    }

    let terminal = match default_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            tracing::error!(error = %e, "cannot start interactive session");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let prompter = Prompter::new(terminal, config.default_download_dir.clone());
    let mut session = Session::new(prompter, Downloader::new(engine));

    match session.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session aborted");
            ExitCode::FAILURE
        }
    }
}
