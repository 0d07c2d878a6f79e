//! Value normalization for loosely formatted sheet cells.
//!
//! Every function here is total: unparsable input becomes `0.0`, never an
//! error and never NaN.

use regex::Regex;
use std::sync::LazyLock;

/// Values at or above this are taken to be in full units already.
pub const MILLIONS_CEILING: f64 = 100_000.0;

const MILLION: f64 = 1_000_000.0;

/// Leading float, as far as it parses ("12.5abc" -> 12.5).
static RE_LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").unwrap());

static RE_MULTIPLIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d*)?|\.\d+)x").unwrap());

/// "$M", "(M)", "in millions", "€mm" and friends.
static RE_MILLIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)million|[$€£]\s*mm?\b|\(\s*mm?\s*\)|\bin\s+mm?\b").unwrap()
});

/// How a numeric cell is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberMode {
    /// Currency or plain number
    Plain,
    /// "1.25x" style multiple
    Multiplier,
    /// Percentage, or a decimal fraction of one
    Percentage,
}

impl NumberMode {
    pub fn parse(&self, raw: &str) -> f64 {
        match self {
            Self::Plain => to_number(raw),
            Self::Multiplier => to_multiplier(raw),
            Self::Percentage => to_ownership_percent(to_number(raw)),
        }
    }
}

/// Parse a currency, percentage or plain number.
///
/// Strips currency symbols, thousands separators, percent signs and
/// whitespace, then reads the leading float.
pub fn to_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',' | '%') && !c.is_whitespace())
        .collect();
    leading_float(&cleaned)
}

/// Parse a multiple such as "1.25x" (case-insensitive), or a bare number.
pub fn to_multiplier(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if let Some(caps) = RE_MULTIPLIER.captures(&cleaned) {
        return leading_float(&caps[1]);
    }
    leading_float(&cleaned)
}

fn leading_float(s: &str) -> f64 {
    RE_LEADING_NUMBER
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

/// Check whether a header states its values in millions.
pub fn is_millions_header(header: &str) -> bool {
    RE_MILLIONS.is_match(header)
}

/// Scale a value stated in millions to full units.
///
/// Only positive values below [`MILLIONS_CEILING`] are scaled, so a cell that
/// already holds "15,000,000" under a "($M)" header is left alone.
pub fn apply_scale(value: f64, in_millions: bool) -> f64 {
    if in_millions && value > 0.0 && value < MILLIONS_CEILING {
        (value * MILLION).round()
    } else {
        value
    }
}

/// Read an ownership value as a percentage.
///
/// A positive value below 1 is taken as a decimal fraction ("0.15" -> 15).
/// This misreads a genuine sub-1% stake entered as "0.5"; the rule is kept
/// because the holdings sheets mix both conventions.
pub fn to_ownership_percent(value: f64) -> f64 {
    if value > 0.0 && value < 1.0 {
        round_to(value * 100.0, 6)
    } else {
        value
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_number() {
        assert_eq!(to_number("$1,234.50"), 1234.5);
        assert_eq!(to_number("15%"), 15.0);
        assert_eq!(to_number(""), 0.0);
        assert_eq!(to_number("garbage"), 0.0);
        assert_eq!(to_number(" € 2 500 "), 2500.0);
        assert_eq!(to_number("12.5abc"), 12.5);
        assert_eq!(to_number("-3"), -3.0);
    }

    #[test]
    fn test_to_multiplier() {
        assert_eq!(to_multiplier("1.00x"), 1.0);
        assert_eq!(to_multiplier("2"), 2.0);
        assert_eq!(to_multiplier("1.25X"), 1.25);
        assert_eq!(to_multiplier("3.1 x"), 3.1);
        assert_eq!(to_multiplier("n/a"), 0.0);
    }

    #[test]
    fn test_millions_header_detection() {
        assert!(is_millions_header("Valuation ($M)"));
        assert!(is_millions_header("Entry valuation (in millions)"));
        assert!(is_millions_header("Latest valuation €m"));
        assert!(is_millions_header("Valuation (M)"));
        assert!(!is_millions_header("Latest valuation"));
        assert!(!is_millions_header("$ Members"));
    }

    #[test]
    fn test_scale_correction() {
        let in_millions = is_millions_header("Valuation ($M)");
        assert_eq!(apply_scale(to_number("12.5"), in_millions), 12_500_000.0);
        // Ceiling guard prevents double scaling
        assert_eq!(apply_scale(to_number("15,000,000"), in_millions), 15_000_000.0);
        assert_eq!(apply_scale(0.0, true), 0.0);
        assert_eq!(apply_scale(12.5, false), 12.5);
    }

    #[test]
    fn test_ownership_percent() {
        assert_eq!(NumberMode::Percentage.parse("0.15"), 15.0);
        assert_eq!(NumberMode::Percentage.parse("42"), 42.0);
        assert_eq!(NumberMode::Percentage.parse("12.5%"), 12.5);
        assert_eq!(NumberMode::Percentage.parse("1"), 1.0);
    }

    #[test]
    fn test_sub_one_percent_is_read_as_fraction() {
        // Known ambiguity: a 0.5% stake typed as "0.5" reads as 50%.
        assert_eq!(NumberMode::Percentage.parse("0.5"), 50.0);
    }

    proptest! {
        #[test]
        fn prop_to_number_is_always_finite(raw in ".*") {
            prop_assert!(to_number(&raw).is_finite());
            prop_assert!(to_multiplier(&raw).is_finite());
        }

        #[test]
        fn prop_scale_never_rescales_large_values(value in 100_000.0f64..1e12) {
            prop_assert_eq!(apply_scale(value, true), value);
        }
    }
}
