//! Choosing one catalog entry
//!
//! Selection logic is pure: the terminal prompt lives in the CLI layer and
//! hands the raw input line to [`select_interactive`].

use crate::app::catalog::LogEntry;
use crate::constants::display;
use crate::errors::{SelectionError, SelectionResult};

/// Most recent downloadable entry by (date, time)
///
/// Relies on the zero-padded `YYYY-MM-DD` / `HH_MM_SS` forms sorting
/// lexically. Entries with only a key file are passed over. On ties the
/// earlier discovered entry wins.
pub fn select_latest(entries: &[LogEntry]) -> SelectionResult<&LogEntry> {
    let mut entries = entries.iter().filter(|entry| entry.data_path.is_some());
    let first = entries.next().ok_or(SelectionError::NoEntries)?;

    Ok(entries.fold(first, |best, candidate| {
        let newer = candidate.date > best.date
            || (candidate.date == best.date && candidate.time > best.time);
        if newer {
            candidate
        } else {
            best
        }
    }))
}

/// Index of the entry chosen by the operator's raw input
///
/// Empty input cancels. Anything else must be plain digits naming an index
/// in `0..len`; a leading `-` is read as an out-of-range index.
pub fn select_interactive(entries: &[LogEntry], input: &str) -> SelectionResult<usize> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SelectionError::Cancelled);
    }

    let not_a_number = || SelectionError::NotANumber {
        input: input.to_string(),
    };
    let digits = input.strip_prefix('-').unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(not_a_number());
    }
    let index: i64 = input.parse().map_err(|_| not_a_number())?;

    match usize::try_from(index) {
        Ok(position) if position < entries.len() => Ok(position),
        _ => Err(SelectionError::OutOfRange {
            index,
            len: entries.len(),
        }),
    }
}

/// One line of the numbered listing
pub fn render_entry(index: usize, entry: &LogEntry) -> String {
    let mut line = format!(
        "{:>index_width$}: {:<name_width$} {}",
        index,
        entry.display_name(),
        entry.size_label.as_deref().unwrap_or(""),
        index_width = display::INDEX_WIDTH,
        name_width = display::NAME_WIDTH,
    );
    if entry.encrypted {
        line.push_str(display::ENCRYPTED_SUFFIX);
        if entry.key_path.is_none() {
            line.push_str(display::KEY_MISSING_SUFFIX);
        }
    }
    line
}

/// Numbered listing of every entry in display order
pub fn render_listing(entries: &[LogEntry]) -> Vec<String> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| render_entry(index, entry))
        .collect()
}
