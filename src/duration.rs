//! Human-readable durations such as "10m" or "1h" for refresh periods.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer};

const UNITS: [(char, u64); 4] = [('d', 24 * 60 * 60), ('h', 60 * 60), ('m', 60), ('s', 1)];

/// Parse a duration string like "10m", "2h", "1d" or "45s".
///
/// Case-insensitive, surrounding whitespace ignored. Zero is rejected since a
/// zero refresh period would spin.
///
/// ```
/// use cryptocharts::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
/// assert_eq!(parse_duration(" 2H ").unwrap(), Duration::from_secs(7200));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let unit = s.chars().last().context("Duration is empty")?;
    let (_, secs_per_unit) = UNITS
        .iter()
        .find(|(u, _)| *u == unit)
        .with_context(|| format!("Duration {s:?} must end with d, h, m, or s"))?;

    let count: u64 = s[..s.len() - 1]
        .parse()
        .with_context(|| format!("Invalid number in duration {s:?}"))?;
    if count == 0 {
        anyhow::bail!("Duration must be greater than zero");
    }

    let secs = count
        .checked_mul(*secs_per_unit)
        .context("Duration is too large")?;
    Ok(Duration::from_secs(secs))
}

/// Format a duration using the largest unit that divides it evenly.
///
/// ```
/// use cryptocharts::duration::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(600)), "10m");
/// assert_eq!(format_duration(Duration::from_secs(90)), "90s");
/// ```
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    UNITS
        .iter()
        .find(|(_, per)| secs >= *per && secs % per == 0)
        .map(|(unit, per)| format!("{}{unit}", secs / per))
        .unwrap_or_else(|| format!("{secs}s"))
}

/// Serde deserializer for duration strings.
///
/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_unit() {
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("3h").unwrap(), Duration::from_secs(3 * 3600));
        assert_eq!(parse_duration("10m").unwrap(), Duration::from_secs(600));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn ignores_case_and_whitespace() {
        assert_eq!(parse_duration("\t10M\n").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn rejects_bad_input() {
        for input in ["", "  ", "10", "m", "1w", "-1m", "1.5h", "0m"] {
            assert!(parse_duration(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(parse_duration(&format!("{}d", u64::MAX)).is_err());
        assert!(parse_duration(&format!("{}s", u64::MAX)).is_ok());
    }

    #[test]
    fn formats_with_largest_even_unit() {
        assert_eq!(format_duration(Duration::from_secs(86400)), "1d");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(600)), "10m");
        assert_eq!(format_duration(Duration::from_secs(3700)), "3700s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Refresh {
            #[serde(deserialize_with = "deserialize_duration")]
            interval: Duration,
        }

        let refresh: Refresh = toml::from_str(r#"interval = "15m""#).unwrap();
        assert_eq!(refresh.interval, Duration::from_secs(900));
    }
}
