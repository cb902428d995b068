//! Signed duration with Go-style text encoding
//!
//! Timeouts travel as strings such as `"1h30m"`, `"250ms"` or `"-1s"`.
//! Negative values are representable on purpose: they deserialize fine and
//! are rejected by validation with a field-level error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Errors produced when parsing a duration string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("invalid duration {0:?}")]
    Invalid(String),

    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },

    #[error("duration {0:?} is out of range")]
    Overflow(String),
}

/// Signed duration with nanosecond precision
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Duration(i64);

impl Duration {
    pub const ZERO: Duration = Duration(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(NANOS_PER_MILLI as i64))
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SECOND as i64))
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Self::from_secs(minutes.saturating_mul(60))
    }

    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Sum of two durations, clamped to the representable range
    pub const fn saturating_add(self, other: Duration) -> Duration {
        Duration(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_str("-")?;
        }
        let nanos = self.0.unsigned_abs();

        if nanos < NANOS_PER_SECOND {
            let (unit, scale, digits) = if nanos < NANOS_PER_MICRO {
                ("ns", 1, 0)
            } else if nanos < NANOS_PER_MILLI {
                ("µs", NANOS_PER_MICRO, 3)
            } else {
                ("ms", NANOS_PER_MILLI, 6)
            };
            return write!(
                f,
                "{}{}",
                format_fraction(nanos / scale, nanos % scale, digits),
                unit
            );
        }

        let secs = nanos / NANOS_PER_SECOND;
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        write!(
            f,
            "{}s",
            format_fraction(secs % 60, nanos % NANOS_PER_SECOND, 9)
        )
    }
}

fn format_fraction(whole: u64, frac: u64, digits: usize) -> String {
    if frac == 0 || digits == 0 {
        return whole.to_string();
    }
    let padded = format!("{:0width$}", frac, width = digits);
    format!("{}.{}", whole, padded.trim_end_matches('0'))
}

impl FromStr for Duration {
    type Err = DurationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationParseError::Invalid(input.to_string());
        let overflow = || DurationParseError::Overflow(input.to_string());

        let (negative, mut rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        if rest == "0" {
            return Ok(Duration::ZERO);
        }
        if rest.is_empty() {
            return Err(invalid());
        }

        // The negative range reaches one further than the positive one.
        let limit = if negative {
            i64::MAX as i128 + 1
        } else {
            i64::MAX as i128
        };
        let mut total: i128 = 0;
        while !rest.is_empty() {
            let number_end = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            let (number, tail) = rest.split_at(number_end);
            let unit_end = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_end);
            rest = tail;

            let scale: i128 = match unit {
                "ns" => 1,
                "us" | "µs" | "μs" => NANOS_PER_MICRO as i128,
                "ms" => NANOS_PER_MILLI as i128,
                "s" => NANOS_PER_SECOND as i128,
                "m" => 60 * NANOS_PER_SECOND as i128,
                "h" => 3600 * NANOS_PER_SECOND as i128,
                "" => return Err(DurationParseError::MissingUnit(input.to_string())),
                other => {
                    return Err(DurationParseError::UnknownUnit {
                        unit: other.to_string(),
                        input: input.to_string(),
                    });
                }
            };

            let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
            if whole.is_empty() && frac.is_empty() {
                return Err(invalid());
            }
            if frac.contains('.') {
                return Err(invalid());
            }

            if !whole.is_empty() {
                let value: i128 = whole.parse().map_err(|_| overflow())?;
                let scaled = value.checked_mul(scale).ok_or_else(overflow)?;
                total = total.checked_add(scaled).ok_or_else(overflow)?;
            }

            // Digits beyond nanosecond precision are dropped.
            let mut frac_value: i128 = 0;
            let mut divisor: i128 = 1;
            for digit in frac.bytes().take(18) {
                frac_value = frac_value * 10 + i128::from(digit - b'0');
                divisor *= 10;
            }
            total += frac_value * scale / divisor;

            if total > limit {
                return Err(overflow());
            }
        }

        let signed = if negative { -total } else { total };
        i64::try_from(signed).map(Duration).map_err(|_| overflow())
    }
}

impl TryFrom<String> for Duration {
    type Error = DurationParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Duration> for String {
    fn from(duration: Duration) -> Self {
        duration.to_string()
    }
}
