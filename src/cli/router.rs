//! Command routing and execution

use crate::cli::args::{Commands, DecisionMode};
use crate::config::StratifyConfig;
use crate::decision::{AutoDecisions, ConsoleDecisions, DecisionChannel};
use crate::driver::{MonthlyDriver, PeriodOutcome, SimulationSummary};
use crate::pipeline::{allocation_engine, describe_topology, Collaborators};
use crate::state::{load_market_data, MarketData, Period};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Execute a CLI command against a loaded configuration
pub async fn execute_command(command: Commands, config: StratifyConfig) -> Result<()> {
    match command {
        Commands::Run {
            periods,
            data,
            decisions,
            out,
        } => {
            let months = load_periods(data.as_deref().unwrap_or(config.data_path.as_path()))?;
            let count = periods.unwrap_or(months.len());
            let mut driver = build_driver(&config, months, decisions)?;
            let summary = driver.run_periods(count).await?;

            println!("{}", render_summary(&summary));
            if let Some(path) = out {
                write_summary(&path, &summary).await?;
                println!("Summary written to {}", path.display());
            }
            Ok(())
        }
        Commands::Period {
            month,
            data,
            decisions,
        } => {
            let months = load_periods(data.as_deref().unwrap_or(config.data_path.as_path()))?;
            let months = starting_at(months, month.as_deref())?;
            let mut driver = build_driver(&config, months, decisions)?;
            match driver.run_period().await? {
                Some(outcome) => println!("{}", render_outcome(&outcome)),
                None => println!("No period to run."),
            }
            Ok(())
        }
        Commands::Graph => {
            print!("{}", describe_topology()?);
            Ok(())
        }
    }
}

fn load_periods(path: &Path) -> Result<Vec<MarketData>> {
    load_market_data(path).with_context(|| format!("loading market data from {}", path.display()))
}

/// Periods from `month` onwards, or all of them
fn starting_at(months: Vec<MarketData>, month: Option<&str>) -> Result<Vec<MarketData>> {
    let Some(month) = month else {
        return Ok(months);
    };
    let wanted = Period::parse(month)?;
    let index = months
        .iter()
        .position(|m| {
            m.period()
                .map(|p| p.year == wanted.year && p.month == wanted.month)
                .unwrap_or(false)
        })
        .ok_or_else(|| anyhow!("no market data for {}", wanted.label))?;
    Ok(months.into_iter().skip(index).collect())
}

fn decision_channel(mode: DecisionMode) -> Arc<dyn DecisionChannel> {
    match mode {
        DecisionMode::Console => Arc::new(ConsoleDecisions::stdio()),
        DecisionMode::Approve => Arc::new(AutoDecisions::approve_all()),
        DecisionMode::Reject => Arc::new(AutoDecisions::reject_all()),
    }
}

fn build_driver(
    config: &StratifyConfig,
    months: Vec<MarketData>,
    mode: DecisionMode,
) -> Result<MonthlyDriver> {
    let collaborators = Collaborators::from_config(config, decision_channel(mode))?;
    let engine = allocation_engine(&collaborators, config)?;
    info!(
        periods = months.len(),
        policy = ?config.rollover.policy,
        "pipeline ready"
    );
    Ok(MonthlyDriver::new(
        engine,
        months,
        config.capital,
        config.initial_allocation(),
        config.rollover.policy,
    )?)
}

async fn write_summary(path: &Path, summary: &SimulationSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing summary to {}", path.display()))
}

pub fn render_outcome(outcome: &PeriodOutcome) -> String {
    format!(
        "{}: proposed {} (previous {}), risk {}, {} -> {:?}",
        outcome.label,
        outcome.proposed,
        outcome.previous,
        outcome.verdict,
        outcome.approval,
        outcome.outcome,
    )
}

pub fn render_summary(summary: &SimulationSummary) -> String {
    let mut lines: Vec<String> = summary.periods.iter().map(render_outcome).collect();
    lines.push(format!(
        "{} of {} periods rebalanced; final baseline {}",
        summary.rebalanced(),
        summary.periods.len(),
        summary.final_allocation
    ));
    lines.join("\n")
}
