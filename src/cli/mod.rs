//! Command-line interface components
//!
//! This module contains CLI-specific code for the Flightlog Fetcher
//! application, including argument parsing, progress display, and operator
//! prompts.

pub mod args;
pub mod commands;
pub mod progress;
pub mod prompt;

pub use args::{Cli, Commands, ConfigAction, ConfigArgs, FetchArgs, GlobalArgs, ListArgs};
pub use commands::{
    fetch_device_config, fetch_log, handle_config, handle_fetch, handle_list, list_logs,
    remove_device_config,
};
pub use progress::{ProgressConfig, ProgressDisplay};
pub use prompt::{confirm, Prompt, ScriptedPrompt, TerminalPrompt};
