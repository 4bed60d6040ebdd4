//! Display formatting for log and notification text

use std::time::Duration;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Format a duration as `Ns`, `Mmin Ss` or `Hh Mmin Ss`
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}min {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}min {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Convert bytes to GiB
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

/// Format a byte count as GiB with one decimal (`12.3 GB`)
pub fn format_gib(bytes: u64) -> String {
    format!("{:.1} GB", bytes_to_gib(bytes))
}

/// Format a count with `,` thousands separators
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}
