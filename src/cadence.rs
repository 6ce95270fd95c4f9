//! # Cadence and compact interval parsing.
//!
//! A [`Cadence`] is the fixed delay between two ticks of one task. It is
//! usually written by a human in a settings form as a compact string:
//!
//! ```text
//! 1w2d3h4m5s   = 1 week + 2 days + 3 hours + 4 minutes + 5 seconds
//! 5m           = 5 minutes
//! 1d12h        = 36 hours
//! ```
//!
//! ## Rules
//! - Components are `w`, `d`, `h`, `m`, `s`, **in that order**; any subset may be omitted.
//! - Each value is a non-negative decimal integer.
//! - At least one component must be present.
//! - A cadence is strictly positive: `0s` parses as a duration but is not a cadence.
//!
//! Invalid text is an explicit [`ParseError`], never a default cadence.

use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde::de::{self, Deserializer, Visitor};

use crate::error::ParseError;

static INTERVAL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([0-9]+)w)?(?:([0-9]+)d)?(?:([0-9]+)h)?(?:([0-9]+)m)?(?:([0-9]+)s)?$")
        .expect("interval pattern is a valid regex")
});

/// Seconds per unit, in grammar order (w, d, h, m, s).
const UNIT_SECS: [u64; 5] = [7 * 86_400, 86_400, 3_600, 60, 1];
const UNIT_NAMES: [char; 5] = ['w', 'd', 'h', 'm', 's'];

/// Parses a compact interval string into a [`Cadence`].
///
/// ```
/// use std::time::Duration;
///
/// let c = pollvisor::parse("1h30m").unwrap();
/// assert_eq!(c.as_duration(), Duration::from_secs(5_400));
///
/// assert!(pollvisor::parse("abc").is_err());
/// assert!(pollvisor::parse("0s").is_err());
/// ```
pub fn parse(text: &str) -> Result<Cadence, ParseError> {
    let secs = parse_secs(text)?;
    if secs == 0 {
        return Err(ParseError::Zero {
            input: text.to_string(),
        });
    }
    Ok(Cadence(secs))
}

/// Parses a compact interval string into a [`Duration`]; zero is allowed.
///
/// Used for configuration knobs where `0s` means "disabled".
pub fn parse_duration(text: &str) -> Result<Duration, ParseError> {
    parse_secs(text).map(Duration::from_secs)
}

fn parse_secs(text: &str) -> Result<u64, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let malformed = || ParseError::Malformed {
        input: text.to_string(),
    };
    let overflow = || ParseError::Overflow {
        input: text.to_string(),
    };

    let caps = INTERVAL_PATTERN.captures(trimmed).ok_or_else(malformed)?;

    let mut total: u64 = 0;
    let mut seen = false;
    for (idx, unit) in UNIT_SECS.iter().enumerate() {
        let Some(m) = caps.get(idx + 1) else { continue };
        seen = true;
        let value = m.as_str().parse::<u64>().map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow => overflow(),
            _ => malformed(),
        })?;
        let part = value.checked_mul(*unit).ok_or_else(overflow)?;
        total = total.checked_add(part).ok_or_else(overflow)?;
    }

    if !seen {
        return Err(malformed());
    }
    Ok(total)
}

/// Strictly positive delay between two ticks, with seconds granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cadence(u64);

impl Cadence {
    /// Creates a cadence of `secs` seconds; `None` if `secs == 0`.
    pub const fn from_secs(secs: u64) -> Option<Self> {
        if secs == 0 { None } else { Some(Self(secs)) }
    }

    /// Length of the cadence in whole seconds (always `> 0`).
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Length of the cadence as a [`Duration`].
    pub const fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl From<Cadence> for Duration {
    fn from(c: Cadence) -> Self {
        c.as_duration()
    }
}

impl FromStr for Cadence {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl fmt::Display for Cadence {
    /// Renders the canonical compact form (`90` seconds → `1m30s`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.0;
        for (unit, name) in UNIT_SECS.iter().zip(UNIT_NAMES) {
            let n = rest / unit;
            rest %= unit;
            if n > 0 {
                write!(f, "{n}{name}")?;
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Cadence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CadenceVisitor;

        impl Visitor<'_> for CadenceVisitor {
            type Value = Cadence;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a positive number of seconds or an interval like '1d2h3m4s'")
            }

            fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Self::Value, E> {
                Cadence::from_secs(secs)
                    .ok_or_else(|| E::custom("interval must be greater than zero"))
            }

            fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Self::Value, E> {
                let secs =
                    u64::try_from(secs).map_err(|_| E::custom("interval must not be negative"))?;
                self.visit_u64(secs)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CadenceVisitor)
    }
}

/// Serde helper for [`Duration`] fields written as seconds or compact intervals.
///
/// Zero is accepted here; the field's owner decides what it means.
pub mod serde_duration {
    use super::*;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number of seconds or an interval like '1h30m'")
            }

            fn visit_u64<E: de::Error>(self, secs: u64) -> Result<Self::Value, E> {
                Ok(Duration::from_secs(secs))
            }

            fn visit_i64<E: de::Error>(self, secs: i64) -> Result<Self::Value, E> {
                u64::try_from(secs)
                    .map(Duration::from_secs)
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                parse_duration(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}
