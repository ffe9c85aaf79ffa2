use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount in **minor units** (cents).
///
/// The engine stores every amount and balance as a plain `i64`; this type is
/// the conversion boundary for human input and output.
///
/// ```rust
/// use ledger::MoneyCents;
///
/// assert_eq!("12,5".parse::<MoneyCents>().unwrap().cents(), 1250);
/// assert_eq!(MoneyCents::new(-705).to_string(), "-7.05");
/// assert!("1.999".parse::<MoneyCents>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl FromStr for MoneyCents {
    type Err = EngineError;

    /// Parses major units with `.` or `,` as decimal separator, an optional
    /// sign and at most two fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidAmount(format!("{reason}: \"{s}\""));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if digits.is_empty() {
            return Err(invalid("empty amount"));
        }

        let normalized = digits.replace(',', ".");
        let (major, minor) = normalized
            .split_once('.')
            .unwrap_or((normalized.as_str(), ""));

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if major.is_empty() || !all_digits(major) || !all_digits(minor) {
            return Err(invalid("invalid amount"));
        }
        if minor.len() > 2 {
            return Err(invalid("too many decimals"));
        }

        let major: i64 = major.parse().map_err(|_| invalid("amount too large"))?;
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| invalid("invalid amount"))? * 10,
            _ => minor.parse().map_err(|_| invalid("invalid amount"))?,
        };

        let total = major
            .checked_mul(100)
            .and_then(|v| v.checked_add(minor))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(MoneyCents(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(MoneyCents::default().to_string(), "0.00");
        assert_eq!(MoneyCents::new(7).to_string(), "0.07");
        assert_eq!(MoneyCents::new(100_000).to_string(), "1000.00");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_major_units() {
        assert_eq!("3".parse::<MoneyCents>().unwrap().cents(), 300);
        assert_eq!("3.".parse::<MoneyCents>().unwrap().cents(), 300);
        assert_eq!("0,5".parse::<MoneyCents>().unwrap().cents(), 50);
        assert_eq!(" 12.34 ".parse::<MoneyCents>().unwrap().cents(), 1234);
        assert_eq!("-0.01".parse::<MoneyCents>().unwrap().cents(), -1);
        assert_eq!("+2".parse::<MoneyCents>().unwrap().cents(), 200);
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["", "-", "abc", "1.2.3", ".50", "1.234", "1e3", "99999999999999999999"] {
            assert!(input.parse::<MoneyCents>().is_err(), "{input}");
        }
    }
}
