// Interactive session loop: menu → inputs → download → report → repeat

use console::{measure_text_width, style};
use std::path::Path;
use thiserror::Error;

use crate::downloader::{DownloadError, Downloader, MediaEngine, QualityPreset};
use crate::prompt::{PromptError, Prompter, Terminal};

const TITLE: &str = "YouTube Downloader";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    SingleVideo,
    Playlist,
}

impl DownloadMode {
    fn from_choice(choice: &str) -> Self {
        if choice == "2" {
            Self::Playlist
        } else {
            Self::SingleVideo
        }
    }
}

/// Failure of one iteration
#[derive(Debug, Error)]
enum IterationError {
    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Download(#[from] DownloadError),
}

pub struct Session<T: Terminal, E: MediaEngine> {
    prompter: Prompter<T>,
    downloader: Downloader<E>,
}

impl<T: Terminal, E: MediaEngine> Session<T, E> {
    pub fn new(prompter: Prompter<T>, downloader: Downloader<E>) -> Self {
        Self {
            prompter,
            downloader,
        }
    }

    pub fn into_parts(self) -> (Prompter<T>, Downloader<E>) {
        (self.prompter, self.downloader)
    }

    /// Loop until the user quits. `Ok` means a requested exit.
    pub async fn run(&mut self) -> Result<(), PromptError> {
        loop {
            match self.run_once().await {
                Ok(()) => {}
                Err(PromptError::Exit) => {
                    self.say_goodbye();
                    return Ok(());
                }
                Err(e) => return Err(e),
            }

            let again = match self
                .prompter
                .prompt_yes_no(&style("Download something else?").yellow().bold().to_string(), "n")
            {
                Ok(again) => again,
                Err(PromptError::Exit) => false,
                Err(e) => return Err(e),
            };

            if !again {
                self.say_goodbye();
                return Ok(());
            }
        }
    }

    /// One pass through the menu. Download failures are reported here.
    async fn run_once(&mut self) -> Result<(), PromptError> {
        let result = self.collect_and_dispatch().await;
        let outcome = match result {
            Ok(()) => {
                self.print("");
                self.print(&style("Download completed successfully!").green().bold().to_string());
                Ok(())
            }
            Err(IterationError::Download(e)) => {
                self.print("");
                self.print(&format!("{} {}", style("Error:").red().bold(), e));
                tracing::error!(error = %e, "Unexpected error");
                Ok(())
            }
            Err(IterationError::Prompt(e)) => Err(e),
        };

        tracing::info!("Downloader session ended.");
        outcome
    }

    async fn collect_and_dispatch(&mut self) -> Result<(), IterationError> {
        self.prompter.terminal().clear_screen();
        self.render_panel(TITLE);

        self.print("");
        self.print(&style("Download Mode:").cyan().bold().to_string());
        self.print(&format!("{}: Single Video", style("1").green().bold()));
        self.print(&format!("{}: Playlist", style("2").green().bold()));
        self.print("");

        let mode = self.prompter.prompt_choice(
            &style("Select download mode").yellow().bold().to_string(),
            &["1", "2"],
            "1",
        )?;
        let mode = DownloadMode::from_choice(&mode);

        let download_dir = self.prompter.prompt_directory()?;
        self.print(&format!(
            "{} {}",
            style("Download directory:").yellow().bold(),
            style(download_dir.display()).cyan().bold()
        ));
        self.print("");

        let url = self
            .prompter
            .prompt_url(&style("Enter YouTube URL").green().bold().to_string())?;

        self.print("");
        self.print(&style("Available Quality Options:").cyan().bold().to_string());
        for preset in QualityPreset::ALL {
            self.print(&format!("{}: {}", style(preset.label()).green().bold(), preset));
        }
        self.print("");

        let quality = self.prompter.prompt_choice(
            &style("Choose video quality").yellow().bold().to_string(),
            &QualityPreset::labels(),
            QualityPreset::Best.label(),
        )?;
        let preset = QualityPreset::from_label(&quality).unwrap_or(QualityPreset::Best);

        tracing::info!(?mode, url = %url, dir = %download_dir.display(), quality = %preset, "starting download");
        self.dispatch(mode, &url, preset.format_selector(), &download_dir)
            .await
    }

    async fn dispatch(
        &mut self,
        mode: DownloadMode,
        url: &str,
        format_selector: &str,
        download_dir: &Path,
    ) -> Result<(), IterationError> {
        match mode {
            DownloadMode::SingleVideo => {
                self.print(&style("Downloading single video...").cyan().bold().to_string());
                self.downloader
                    .download_video(url, format_selector, download_dir)
                    .await?;
            }
            DownloadMode::Playlist => {
                let entries = self.downloader.fetch_playlist_entries(url).await?;
                if self.prompter.prompt_yes_no("Download entire playlist?", "y")? {
                    self.print(&style("Downloading entire playlist...").cyan().bold().to_string());
                    self.downloader
                        .download_many(&entries, format_selector, download_dir)
                        .await?;
                } else {
                    let selected = self.prompter.prompt_video_selection(&entries)?;
                    self.print(&style("Downloading selected videos...").cyan().bold().to_string());
                    self.downloader
                        .download_many(&selected, format_selector, download_dir)
                        .await?;
                }
            }
        }
        Ok(())
    }

    fn render_panel(&mut self, title: &str) {
        let width = measure_text_width(title) + 2;
        let bar = "═".repeat(width);
        self.print(&format!("╔{}╗", bar));
        self.print(&format!("║ {} ║", style(title).cyan().bold()));
        self.print(&format!("╚{}╝", bar));
    }

    fn say_goodbye(&mut self) {
        self.print("");
        self.print(&style("Goodbye!").blue().bold().to_string());
    }

    fn print(&mut self, line: &str) {
        self.prompter.terminal().println(line);
    }
}
