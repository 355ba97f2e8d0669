//! Rules-based parsing of the central bank rate statement
//!
//! The statements in the market data follow a fixed phrasing ("raised the
//! target ... by 25 basis points to a range of 4.50% to 4.75%"), so plain
//! patterns are enough.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"to a range of ([\d.]+)% to ([\d.]+)%").expect("Invalid regex pattern")
});

static BASIS_POINTS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)by (\d+)\s*basis points").expect("Invalid regex pattern"));

static INCREASE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(raise[sd]?|increase[sd]?|hike[sd]?)\b").expect("Invalid regex pattern"));

static DECREASE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(lower(ed|s)?|cut(s)?|decrease[sd]?|reduce[sd]?)\b").expect("Invalid regex pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateChange {
    Increase,
    Decrease,
    Hold,
}

impl fmt::Display for RateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RateChange::Increase => "increase",
            RateChange::Decrease => "decrease",
            RateChange::Hold => "hold",
        };
        f.write_str(s)
    }
}

/// Indicators pulled out of a rate statement; absent pieces stay `None`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateDecision {
    /// Midpoint of the target range, in percent
    pub nominal_rate: Option<f64>,
    pub range: Option<(f64, f64)>,
    pub range_width: Option<f64>,
    pub basis_points_change: Option<u32>,
    pub change: RateChange,
}

impl RateDecision {
    pub fn range_given(&self) -> bool {
        self.range.is_some()
    }
}

pub fn extract_rate_decision(text: &str) -> RateDecision {
    let range = RANGE_REGEX.captures(text).and_then(|caps| {
        let lower = caps[1].parse::<f64>().ok()?;
        let upper = caps[2].parse::<f64>().ok()?;
        Some((lower, upper))
    });

    let basis_points_change = BASIS_POINTS_REGEX
        .captures(text)
        .and_then(|caps| caps[1].parse::<u32>().ok());

    let change = if basis_points_change == Some(0) {
        RateChange::Hold
    } else if DECREASE_REGEX.is_match(text) {
        RateChange::Decrease
    } else if INCREASE_REGEX.is_match(text) {
        RateChange::Increase
    } else {
        RateChange::Hold
    };

    RateDecision {
        nominal_rate: range.map(|(lower, upper)| round3((lower + upper) / 2.0)),
        range,
        range_width: range.map(|(lower, upper)| round3(upper - lower)),
        basis_points_change,
        change,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl fmt::Display for RateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change: {}", self.change)?;
        if let Some(bp) = self.basis_points_change {
            write!(f, ", {bp} basis points")?;
        }
        if let (Some(rate), Some((lower, upper))) = (self.nominal_rate, self.range) {
            write!(f, ", target range {lower}% to {upper}% (midpoint {rate}%)")?;
        }
        Ok(())
    }
}
