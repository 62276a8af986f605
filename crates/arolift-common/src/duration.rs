//! Duration-string parsing for timeout flags.
//!
//! Accepts an integer followed by `s`/`m`/`h`; a bare integer is taken as
//! seconds. `"90m"` parses to 5400 seconds.

use std::time::Duration;

use crate::{Error, Result};

/// Parse a duration string (`"30s"`, `"90m"`, `"2h"`, or bare seconds).
pub fn parse_duration(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("empty duration string"));
    }

    let (digits, unit) = match trimmed.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => trimmed.split_at(idx),
        None => (trimmed, ""),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| Error::validation(format!("invalid duration '{trimmed}'")))?;

    let seconds = match unit {
        "" | "s" | "S" => value,
        "m" | "M" => value * 60,
        "h" | "H" => value * 60 * 60,
        other => {
            return Err(Error::validation(format!(
                "invalid duration unit '{other}' in '{trimmed}' (expected s, m, or h)"
            )))
        }
    };

    Ok(Duration::from_secs(seconds))
}
