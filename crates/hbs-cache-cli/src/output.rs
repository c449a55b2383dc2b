//! Terminal status output for the hbs-cache CLI.
//!
//! Everything here goes to stderr so that `hbs-cache render` can be piped: the
//! rendered document is the only thing written to stdout.

use std::time::Duration;

use console::style;
use hbs_cache_core::profiler::Profile;

/// Bold cyan title line with a dimmed underline.
pub fn header(text: &str) {
    eprintln!("\n{}", style(text).bold().cyan());
    eprintln!("{}", style("-".repeat(text.chars().count())).dim());
}

/// `[OK] text`
pub fn success(text: &str) {
    eprintln!("{} {}", style("[OK]").green().bold(), text);
}

/// `[WARN] text`
pub fn warning(text: &str) {
    eprintln!("{} {}", style("[WARN]").yellow().bold(), text);
}

/// `[ERROR] text`
pub fn error(text: &str) {
    eprintln!("{} {}", style("[ERROR]").red().bold(), text);
}

/// `[2/3] text`
pub fn step(step: u32, total: u32, text: &str) {
    eprintln!("{} {}", style(format!("[{step}/{total}]")).dim(), text);
}

/// Indented `key: value` with the key dimmed.
pub fn key_value(key: &str, value: &str) {
    eprintln!("  {}: {}", style(key).dim(), value);
}

/// One line per completed profile span, slowest first.
pub fn profile_table(spans: &[(Profile, Duration)]) {
    let mut sorted: Vec<_> = spans.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    for (profile, elapsed) in sorted {
        eprintln!(
            "  {:<10} {:<32} {:>10}",
            style(profile.kind.to_string()).dim(),
            profile.name,
            format_duration(*elapsed)
        );
    }
}

pub fn format_duration(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    if micros < 1_000 {
        format!("{micros} µs")
    } else if micros < 1_000_000 {
        format!("{:.2} ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2} s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_micros(250)), "250 µs");
        assert_eq!(format_duration(Duration::from_micros(1_500)), "1.50 ms");
        assert_eq!(format_duration(Duration::from_millis(2_500)), "2.50 s");
    }
}
