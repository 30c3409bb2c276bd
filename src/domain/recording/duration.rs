//! Recording time limit value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Safety limit applied when no explicit duration is given (10 minutes)
pub const DEFAULT_MAX_DURATION_SECS: u64 = 600;

/// A positive recording time limit with second granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Safety limit for open-ended recordings
    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }

    /// Render elapsed milliseconds as `mm:ss` for status lines
    pub fn clock(elapsed_ms: u64) -> String {
        let secs = elapsed_ms / 1000;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Accepts `90s`, `2m`, `1h`, and combinations in h/m/s order such as `1h30m` or `2m30s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationParseError {
            input: s.to_string(),
        };
        let input = s.trim().to_lowercase();

        let mut total_secs: u64 = 0;
        let mut digits = String::new();
        // Units must appear at most once and in h, m, s order.
        let mut last_rank = 0u8;

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            let (rank, factor) = match ch {
                'h' => (1, 3600),
                'm' => (2, 60),
                's' => (3, 1),
                _ => return Err(invalid()),
            };
            if digits.is_empty() || rank <= last_rank {
                return Err(invalid());
            }
            let value: u64 = digits.parse().map_err(|_| invalid())?;
            total_secs = value
                .checked_mul(factor)
                .and_then(|v| total_secs.checked_add(v))
                .ok_or_else(invalid)?;
            digits.clear();
            last_rank = rank;
        }

        if !digits.is_empty() || last_rank == 0 || total_secs == 0 {
            return Err(invalid());
        }

        Ok(Self::from_secs(total_secs))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.as_secs();
        let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        if seconds > 0 || total == 0 {
            write!(f, "{}s", seconds)?;
        }
        Ok(())
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_max_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_only() {
        let d: Duration = "30s".parse().unwrap();
        assert_eq!(d.as_secs(), 30);
        assert_eq!(d.as_millis(), 30_000);
    }

    #[test]
    fn parse_combined_units() {
        assert_eq!("2m30s".parse::<Duration>().unwrap().as_secs(), 150);
        assert_eq!("1h30m".parse::<Duration>().unwrap().as_secs(), 5400);
        assert_eq!("1H0M5S".parse::<Duration>().unwrap().as_secs(), 3605);
    }

    #[test]
    fn parse_rejects_out_of_order_or_repeated_units() {
        assert!("30s2m".parse::<Duration>().is_err());
        assert!("1m1m".parse::<Duration>().is_err());
    }

    #[test]
    fn parse_rejects_invalid_input() {
        assert!("".parse::<Duration>().is_err());
        assert!("0s".parse::<Duration>().is_err());
        assert!("30".parse::<Duration>().is_err());
        assert!("abc".parse::<Duration>().is_err());
        assert!("m".parse::<Duration>().is_err());
    }

    #[test]
    fn display_round_trips_common_values() {
        assert_eq!(Duration::from_secs(30).to_string(), "30s");
        assert_eq!(Duration::from_secs(120).to_string(), "2m");
        assert_eq!(Duration::from_secs(150).to_string(), "2m30s");
        assert_eq!(Duration::from_secs(3660).to_string(), "1h1m");
    }

    #[test]
    fn clock_format() {
        assert_eq!(Duration::clock(0), "00:00");
        assert_eq!(Duration::clock(61_500), "01:01");
    }

    #[test]
    fn default_is_safety_limit() {
        assert_eq!(Duration::default().as_secs(), DEFAULT_MAX_DURATION_SECS);
        assert_eq!(Duration::from_secs(5).as_std(), StdDuration::from_secs(5));
    }
}
