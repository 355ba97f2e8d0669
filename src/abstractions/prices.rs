//! Monthly price summaries for tickers

use crate::config::PriceConfig;
use crate::error::{ErrorCode, PipelineError, Result};
use crate::state::Period;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Source of closing prices over a calendar month
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Closing values sampled across `period`, oldest first
    async fn monthly_closes(&self, symbol: &str, period: &Period) -> Result<Vec<f64>>;
}

/// Fetch closes and summarize them; no data is an error, never a guess
pub async fn summarize(source: &dyn PriceSource, symbol: &str, period: &Period) -> Result<TickerSummary> {
    let closes = source.monthly_closes(symbol, period).await?;
    TickerSummary::from_closes(symbol, &period.label, &closes)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSummary {
    pub symbol: String,
    pub period_label: String,
    pub month_end: f64,
    pub average: f64,
    pub high: f64,
    pub low: f64,
    /// Sample standard deviation; zero for a single observation
    pub stdev: f64,
}

impl TickerSummary {
    pub fn from_closes(symbol: &str, period_label: &str, closes: &[f64]) -> Result<Self> {
        let closes: Vec<f64> = closes.iter().copied().filter(|c| c.is_finite()).collect();
        let Some(&month_end) = closes.last() else {
            return Err(no_data(symbol, period_label));
        };

        let n = closes.len() as f64;
        let average = closes.iter().sum::<f64>() / n;
        let high = closes.iter().copied().fold(f64::MIN, f64::max);
        let low = closes.iter().copied().fold(f64::MAX, f64::min);
        let stdev = if closes.len() > 1 {
            let variance = closes.iter().map(|c| (c - average).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        Ok(Self {
            symbol: symbol.to_string(),
            period_label: period_label.to_string(),
            month_end,
            average,
            high,
            low,
            stdev,
        })
    }
}

impl fmt::Display for TickerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary of {} for {}:", self.symbol, self.period_label)?;
        writeln!(f, "- Month-End Value: {:.2}", self.month_end)?;
        writeln!(f, "- Monthly Average: {:.4}", self.average)?;
        writeln!(f, "- Monthly High: {:.3}", self.high)?;
        writeln!(f, "- Monthly Low: {:.3}", self.low)?;
        write!(f, "- Volatility (Standard Deviation): {:.4}", self.stdev)
    }
}

fn no_data(symbol: &str, period_label: &str) -> PipelineError {
    PipelineError::ExternalService {
        code: ErrorCode::EXTERNAL_NO_DATA,
        service: "prices".to_string(),
        message: format!("no data returned for {symbol} in {period_label}"),
        source: None,
    }
}

/// Yahoo Finance chart API
pub struct YahooPrices {
    client: Client,
    endpoint: String,
}

impl YahooPrices {
    pub fn new(config: &PriceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("stratify")
            .build()
            .map_err(|e| PipelineError::config("failed to create HTTP client").with_source(e))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for YahooPrices {
    async fn monthly_closes(&self, symbol: &str, period: &Period) -> Result<Vec<f64>> {
        let (start, end) = period
            .bounds()
            .ok_or_else(|| no_data(symbol, &period.label))?;
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let period2 = end.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp());
        let (Some(period1), Some(period2)) = (period1, period2) else {
            return Err(no_data(symbol, &period.label));
        };

        info!(symbol, period = %period.label, "fetching prices");
        let response = self
            .client
            .get(format!("{}/{}", self.endpoint, symbol))
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "5d".to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                PipelineError::external("prices", format!("request failed: {e}")).with_source(e)
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::external(
                "prices",
                format!("price API returned {} for {symbol}", response.status()),
            ));
        }

        let body: Value = response.json().await.map_err(|e| {
            PipelineError::malformed("prices", format!("unreadable response: {e}")).with_source(e)
        })?;
        Ok(closes_from_chart(&body))
    }
}

/// Non-null closes from a chart API document
pub fn closes_from_chart(body: &Value) -> Vec<f64> {
    body.pointer("/chart/result/0/indicators/quote/0/close")
        .and_then(Value::as_array)
        .map(|closes| closes.iter().filter_map(Value::as_f64).collect())
        .unwrap_or_default()
}
