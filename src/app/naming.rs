//! Output file naming

use crate::constants::files;

/// Local file name for a downloaded log file
///
/// `("2024-05-01", "14_03_22", "ulg")` becomes
/// `log-2024-05-01T14-03-22Z.ulg`.
pub fn output_file_name(date: &str, time: &str, extension: &str) -> String {
    format!(
        "{}{}T{}Z.{}",
        files::OUTPUT_PREFIX,
        date,
        time.replace('_', "-"),
        extension
    )
}
