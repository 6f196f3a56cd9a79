//! Terminal output helpers for CLI progress lines.
//!
//! Everything here writes to stderr; stdout belongs to the container.

use std::time::Duration;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const CYAN: &str = "\x1b[36m";
pub const RESET: &str = "\x1b[0m";

/// Formats a byte count with binary units (e.g. "7.4 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

/// Formats an elapsed time as seconds with one decimal.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

/// Prints the banner shown before a run.
pub fn print_header() {
    eprintln!();
    eprintln!(
        "  {BOLD}{}{RESET} {DIM}v{}{RESET}",
        runlet_common::constants::APP_NAME,
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();
}

/// Prints one progress step.
pub fn step(message: &str) {
    eprintln!("  {CYAN}=>{RESET} {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sizes_stay_in_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
    }

    #[test]
    fn sizes_scale_to_binary_units() {
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(7_759_462), "7.4 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn elapsed_has_one_decimal() {
        assert_eq!(format_elapsed(Duration::from_millis(1300)), "1.3s");
    }
}
