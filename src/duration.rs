//! Human durations: `30m` style parsing for timed moderation, and compact elapsed-time formatting
//! for AFK notices.

use crate::error::BotError;
use std::{sync::LazyLock, time::Duration};

static DURATION_SHAPE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^(\d+)([smhd])$").expect("valid duration regex"));

const UNITS: [(u64, &str); 4] = [(86400, "d"), (3600, "h"), (60, "m"), (1, "s")];

/// Parse a duration such as `10s`, `30m`, `1h` or `2d`.
pub fn parse_duration(input: &str) -> Result<Duration, BotError> {
    let invalid = || BotError::InvalidDuration(input.to_owned());

    let captures = DURATION_SHAPE.captures(input).ok_or_else(invalid)?;
    let amount: u64 = captures[1].parse().map_err(|_| invalid())?;
    let multiplier = match &captures[2] {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(invalid()),
    };

    let seconds = amount.checked_mul(multiplier).ok_or_else(invalid)?;
    if seconds == 0 {
        return Err(invalid());
    }
    Ok(Duration::from_secs(seconds))
}

/// Format elapsed time largest unit first, omitting zero units, e.g. `1d 3h 5s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut remaining = elapsed.as_secs();
    let mut parts = Vec::new();
    for (unit_seconds, suffix) in UNITS {
        let amount = remaining / unit_seconds;
        remaining %= unit_seconds;
        if amount > 0 {
            parts.push(format!("{}{}", amount, suffix));
        }
    }

    if parts.is_empty() {
        "0s".to_owned()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("30m"), Ok(Duration::from_secs(1800)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("2d"), Ok(Duration::from_secs(172800)));
    }

    #[test]
    fn zero_is_invalid() {
        assert_eq!(
            parse_duration("0s"),
            Err(BotError::InvalidDuration("0s".into()))
        );
    }

    #[test]
    fn malformed_shapes_are_invalid() {
        for input in ["abc", "", "10", "m10", "10x", "1.5h", "-5m", "10 m", "10M"] {
            assert_eq!(
                parse_duration(input),
                Err(BotError::InvalidDuration(input.into())),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn overflow_is_invalid() {
        assert!(parse_duration("99999999999999999999d").is_err());
        assert!(parse_duration("999999999999999999d").is_err());
    }

    #[test]
    fn formats_largest_unit_first() {
        assert_eq!(format_elapsed(Duration::from_secs(90061)), "1d 1h 1m 1s");
        assert_eq!(format_elapsed(Duration::from_secs(3600 + 5)), "1h 5s");
        assert_eq!(format_elapsed(Duration::from_secs(120)), "2m");
    }

    #[test]
    fn sub_second_is_zero_seconds() {
        assert_eq!(format_elapsed(Duration::from_millis(400)), "0s");
        assert_eq!(format_elapsed(Duration::ZERO), "0s");
    }
}
