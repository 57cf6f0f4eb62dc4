//! Statistic value normalization
//!
//! The statistics feed mixes plain numbers, comma-decimal strings, bare
//! percentages ("54%") and compound fractions ("455/524 (87%)") in the same
//! fields. [`parse_stat`] folds all of them into a [`StatValue`] so the rest
//! of the pipeline never touches display strings.

use serde_json::Value;
use std::fmt;

/// Quoted percentages within this distance of the derived ratio are trusted;
/// anything further off is replaced by the recomputed value.
const PERCENTAGE_TOLERANCE: f64 = 0.005;

/// Round to four decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Successful/total pair with an optional 0..=1 ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fraction {
    pub successful: i64,
    pub total: i64,
    pub percentage: Option<f64>,
}

impl fmt::Display for Fraction {
    /// Canonical "S/T (P%)" display form; reparsing it preserves the counts
    /// exactly
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage {
            Some(p) => write!(f, "{}/{} ({}%)", self.successful, self.total, round2(p * 100.0)),
            None => write!(f, "{}/{}", self.successful, self.total),
        }
    }
}

/// Normalized statistic value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Fraction(Fraction),
    /// Value was absent or could not be interpreted
    Unknown,
}

impl StatValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            StatValue::Int(n) => Some(*n),
            StatValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            StatValue::Int(n) => Some(*n as f64),
            StatValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_fraction(&self) -> Option<Fraction> {
        match self {
            StatValue::Fraction(f) => Some(*f),
            _ => None,
        }
    }
}

/// Parse one raw statistic value into its normalized form.
///
/// Strings with a '/' are treated as fractions, a trailing '%' as a ratio,
/// and anything else as a number with ',' accepted as the decimal separator.
/// Unparseable input becomes [`StatValue::Unknown`] rather than an error so a
/// single odd field never sinks a whole match.
pub fn parse_stat(raw: &Value) -> StatValue {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                StatValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 {
                    StatValue::Int(f as i64)
                } else {
                    StatValue::Float(f)
                }
            } else {
                StatValue::Unknown
            }
        }
        Value::String(s) => parse_stat_str(s.trim()),
        _ => StatValue::Unknown,
    }
}

fn parse_stat_str(s: &str) -> StatValue {
    if s.is_empty() {
        return StatValue::Unknown;
    }

    if s.contains('/') {
        return match parse_fraction(s) {
            Some(fraction) => StatValue::Fraction(fraction),
            None => StatValue::Unknown,
        };
    }

    if let Some(percent) = s.strip_suffix('%') {
        return match parse_number(percent) {
            Some(p) => StatValue::Float(round4(p / 100.0)),
            None => StatValue::Unknown,
        };
    }

    match parse_number(s) {
        Some(f) if f.fract() == 0.0 => StatValue::Int(f as i64),
        Some(f) => StatValue::Float(f),
        None => StatValue::Unknown,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse::<f64>().ok()
}

/// Parse "S/T (P%)" or "S/T"; any piece failing to parse yields None.
fn parse_fraction(s: &str) -> Option<Fraction> {
    let (successful_str, rest) = s.split_once('/')?;
    let successful = successful_str.trim().parse::<i64>().ok()?;

    let (total_str, quoted) = match rest.split_once('(') {
        Some((total_str, percent_part)) => {
            let percent_str = percent_part.trim().strip_suffix(')')?.trim().strip_suffix('%')?;
            let quoted = round4(parse_number(percent_str)? / 100.0);
            (total_str, Some(quoted))
        }
        None => (rest, None),
    };
    let total = total_str.trim().parse::<i64>().ok()?;

    Some(Fraction {
        successful,
        total,
        percentage: reconcile_percentage(successful, total, quoted),
    })
}

/// Resolve a fraction's ratio: with no attempts there is no ratio, a quoted
/// value close to successful/total stands, and a quoted value off by more
/// than the tolerance is replaced by the recomputed one.
pub fn reconcile_percentage(successful: i64, total: i64, quoted: Option<f64>) -> Option<f64> {
    if total <= 0 {
        return None;
    }
    let derived = round4(successful as f64 / total as f64);
    match quoted {
        Some(q) if (q - derived).abs() <= PERCENTAGE_TOLERANCE => Some(q),
        _ => Some(derived),
    }
}

/// Build a fraction from separate count fields instead of a display string
pub fn fraction_from_counts(successful: i64, total: i64) -> Fraction {
    Fraction {
        successful,
        total,
        percentage: reconcile_percentage(successful, total, None),
    }
}
