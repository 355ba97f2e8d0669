//! Per-period market inputs and the JSON file they are loaded from

use crate::error::{ErrorCode, PipelineError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// News context for a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct News {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub headlines: Vec<String>,
}

/// Macro indicators for a period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicIndicators {
    #[serde(default)]
    pub cpi_yoy: f64,
    #[serde(default)]
    pub unemployment_rate: f64,
    #[serde(default)]
    pub fed_interest_rate_decision: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EconomicIndicators {
    /// Unemployment plus year-over-year inflation
    pub fn misery_index(&self) -> f64 {
        self.unemployment_rate + self.cpi_yoy
    }
}

/// One period of input data.
///
/// Only the fields the steps read are typed; anything else in the source
/// record is preserved untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    /// Human-friendly label, `"Month YYYY"`
    pub month: String,
    #[serde(default)]
    pub news: News,
    #[serde(default)]
    pub economic_indicators: EconomicIndicators,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarketData {
    pub fn period(&self) -> Result<Period> {
        Period::parse(&self.month)
    }
}

#[derive(Debug, Deserialize)]
struct MarketDataFile {
    market_data: Vec<MarketData>,
}

/// Calendar period derived from a `"Month YYYY"` label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn parse(label: &str) -> Result<Self> {
        let trimmed = label.trim();
        let date = NaiveDate::parse_from_str(&format!("01 {trimmed}"), "%d %B %Y").map_err(|e| {
            PipelineError::Data {
                code: ErrorCode::DATA_BAD_PERIOD_LABEL,
                message: format!("cannot parse period label '{label}'"),
                source: Some(Box::new(e)),
            }
        })?;
        Ok(Self {
            label: trimmed.to_string(),
            year: date.year(),
            month: date.month(),
        })
    }

    /// First day of this period and of the following one
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1)?;
        let end = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)?
        };
        Some((start, end))
    }
}

/// Parse the `{ "market_data": [...] }` document
pub fn parse_market_data(content: &str) -> Result<Vec<MarketData>> {
    let file: MarketDataFile = serde_json::from_str(content)?;
    if file.market_data.is_empty() {
        return Err(PipelineError::Data {
            code: ErrorCode::DATA_EMPTY,
            message: "market data contains no periods".to_string(),
            source: None,
        });
    }
    for period in &file.market_data {
        period.period()?;
    }
    Ok(file.market_data)
}

/// Load every period from a market data file
pub fn load_market_data(path: &Path) -> Result<Vec<MarketData>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::Data {
            code: ErrorCode::DATA_IO,
            message: format!("failed to read {}", path.display()),
            source: Some(Box::new(e)),
        }
    })?;
    let periods = parse_market_data(&content)?;
    debug!("Loaded {} periods from {}", periods.len(), path.display());
    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "market_data": [
            {
                "month": "January 2023",
                "news": {"summary": "Markets rally", "headlines": ["Stocks up", "Fed steady"]},
                "economic_indicators": {
                    "cpi_yoy": 6.4,
                    "unemployment_rate": 3.4,
                    "fed_interest_rate_decision": "held",
                    "gdp_growth": 2.1
                },
                "sentiment": "bullish"
            },
            {"month": "February 2023"}
        ]
    }"#;

    #[test]
    fn test_parse_period_label() {
        let period = Period::parse("March 2023").unwrap();
        assert_eq!(period.year, 2023);
        assert_eq!(period.month, 3);
        assert_eq!(period.label, "March 2023");
    }

    #[test]
    fn test_parse_period_label_rejects_garbage() {
        let err = Period::parse("2023-03").unwrap_err();
        assert_eq!(err.code(), ErrorCode::DATA_BAD_PERIOD_LABEL);
    }

    #[test]
    fn test_period_bounds_wrap_year() {
        let period = Period::parse("December 2023").unwrap();
        let (start, end) = period.bounds().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_market_data_keeps_unknown_fields() {
        let periods = parse_market_data(SAMPLE).unwrap();
        assert_eq!(periods.len(), 2);

        let first = &periods[0];
        assert_eq!(first.news.headlines.len(), 2);
        assert_eq!(first.extra["sentiment"], "bullish");
        assert_eq!(first.economic_indicators.extra["gdp_growth"], 2.1);
        assert!((first.economic_indicators.misery_index() - 9.8).abs() < 1e-9);

        let second = &periods[1];
        assert!(second.news.summary.is_empty());
    }

    #[test]
    fn test_parse_market_data_rejects_empty() {
        let err = parse_market_data(r#"{"market_data": []}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DATA_EMPTY);
    }

    #[test]
    fn test_load_market_data_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let periods = load_market_data(file.path()).unwrap();
        assert_eq!(periods[1].month, "February 2023");
    }

    #[test]
    fn test_load_market_data_missing_file() {
        let err = load_market_data(Path::new("/nonexistent/market.json")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DATA_IO);
    }
}
