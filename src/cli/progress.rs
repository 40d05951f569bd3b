//! Transfer progress display
//!
//! Renders [`TransferEvent`]s either as an indicatif bar (stderr is a
//! terminal) or as plain `N %` lines for logs and pipes.
//!
//! # Examples
//!
//! ```rust,no_run
//! use flightlog_fetcher::app::{TransferEvent, TransferReporter};
//! use flightlog_fetcher::cli::progress::{ProgressConfig, ProgressDisplay};
//!
//! let mut display = ProgressDisplay::new(ProgressConfig::default());
//! display.report(TransferEvent::Started { remote_path: "/fs/microsd/log/a.ulg".into() });
//! display.report(TransferEvent::Progress { percent: 50 });
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::app::session::remote_file_name;
use crate::app::transfer::{TransferEvent, TransferReporter};

const BAR_TEMPLATE: &str = "{spinner:.green} {msg:<20} [{bar:40.cyan/blue}] {pos:>3} %";

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Use a progress bar when stderr is a terminal
    pub enable_progress_bars: bool,
    /// Suppress percentage output entirely
    pub quiet: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            quiet: false,
        }
    }
}

/// Progress reporter for the CLI
pub struct ProgressDisplay {
    config: ProgressConfig,
    bar: Option<ProgressBar>,
    is_terminal: bool,
}

impl ProgressDisplay {
    /// Create a new progress display with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);

        Self {
            config,
            bar: None,
            is_terminal,
        }
    }

    fn use_bar(&self) -> bool {
        self.config.enable_progress_bars && self.is_terminal && !self.config.quiet
    }

    fn start_bar(&mut self, remote_path: &str) {
        let bar = ProgressBar::new(100);
        match ProgressStyle::default_bar().template(BAR_TEMPLATE) {
            Ok(style) => bar.set_style(style.progress_chars("##-")),
            Err(e) => debug!("Progress bar template error: {}", e),
        }
        bar.set_message(remote_file_name(remote_path).to_string());
        self.bar = Some(bar);
    }
}

impl TransferReporter for ProgressDisplay {
    fn report(&mut self, event: TransferEvent) {
        if self.use_bar() {
            match &event {
                TransferEvent::Started { remote_path } => self.start_bar(remote_path),
                TransferEvent::Progress { percent } => {
                    if let Some(bar) = &self.bar {
                        bar.set_position(u64::from(*percent));
                    }
                }
                TransferEvent::Completed { .. } => {
                    if let Some(bar) = self.bar.take() {
                        bar.finish_and_clear();
                    }
                }
            }
        } else if !self.config.quiet {
            if let Some(line) = text_line(&event) {
                eprintln!("{}", line);
            }
        }

        if let TransferEvent::Completed { output } = &event {
            let name = output
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| output.display().to_string());
            println!("file: {}", name);
        }
    }
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}

/// Plain-text rendering used when no bar is shown
pub fn text_line(event: &TransferEvent) -> Option<String> {
    match event {
        TransferEvent::Started { remote_path } => Some(format!("Downloading {}", remote_path)),
        TransferEvent::Progress { percent } => Some(format!("{} %", percent)),
        TransferEvent::Completed { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_text_lines() {
        assert_eq!(
            text_line(&TransferEvent::Progress { percent: 42 }),
            Some("42 %".to_string())
        );
        assert_eq!(
            text_line(&TransferEvent::Started {
                remote_path: "/fs/microsd/log/2024-05-01/14_03_22.ulg".to_string()
            }),
            Some("Downloading /fs/microsd/log/2024-05-01/14_03_22.ulg".to_string())
        );
        assert_eq!(
            text_line(&TransferEvent::Completed {
                output: PathBuf::from("log.ulg")
            }),
            None
        );
    }

    #[test]
    fn test_text_mode_fallback() {
        let mut display = ProgressDisplay::new(ProgressConfig {
            enable_progress_bars: false,
            quiet: false,
        });
        assert!(!display.use_bar());

        display.report(TransferEvent::Started {
            remote_path: "/a.ulg".to_string(),
        });
        display.report(TransferEvent::Progress { percent: 100 });
        assert!(display.bar.is_none());
    }

    #[test]
    fn test_quiet_never_uses_bar() {
        let display = ProgressDisplay::new(ProgressConfig {
            enable_progress_bars: true,
            quiet: true,
        });
        assert!(!display.use_bar());
    }
}
