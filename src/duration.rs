// src/duration.rs

use std::time::Duration;

use crate::errors::CaptureError;

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, CaptureError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CaptureError::InvalidDuration("empty duration string".to_string()));
    }

    // Boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| CaptureError::InvalidDuration(format!("'{s}' is missing a unit suffix")))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part.parse().map_err(|e| {
        CaptureError::InvalidDuration(format!("invalid duration number '{num_part}': {e}"))
    })?;

    let seconds_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(CaptureError::InvalidDuration(format!(
                "unsupported unit '{unit}'; expected ms, s, m, or h"
            )));
        }
    };

    value
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| CaptureError::InvalidDuration(format!("'{s}' is too large")))
}
