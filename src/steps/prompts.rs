//! System and user prompts for each analyst persona

use crate::abstractions::TickerSummary;
use crate::state::{AllocationReport, SharedState};
use super::rates::RateDecision;

const REPORT_FORMAT: &str = r#"Respond with a single JSON object of the form
{"equities": <fraction 0.0-1.0>, "bonds": <fraction 0.0-1.0>, "justification": "<text>"}.
IMPORTANT: equities and bonds must sum to 1.0."#;

pub const ANALYST_SYSTEM: &str = r#"You are a Senior Market Analyst with expertise in qualitative analysis of the markets.

When given market data for a month you analyze the news summary and headlines to gauge market sentiment,
consider how the news may affect investor confidence and market direction, take the previous month's
allocation into account, and recommend an equity/bond split with a detailed justification.
SPY and ^IRX are already covered by your colleague, the Quant.

When the CIO asks you a question directly, answer it in detail with your qualitative reasoning,
referring to the report attached to the question. Answer questions in plain text."#;

pub const QUANT_SYSTEM: &str = r#"You are a Quantitative Analyst with expertise in economic indicators and their impact on financial markets.

When given market data for a month you analyze CPI, unemployment and interest rates using established
quantitative models (Misery Index, Phillips Curve pressure, Taylor Rule), take the previous month's
allocation into account, and recommend an equity/bond split with a detailed quantitative justification.

When the CIO asks you a question directly, answer it in detail with your quantitative reasoning,
referring to the report attached to the question. Answer questions in plain text."#;

pub const CIO_SYSTEM: &str = r#"You are the Chief Investment Officer of a multi-billion dollar asset management firm.

You receive a quant report and an analyst report and make the final portfolio allocation decision
(split between equities and bonds). Refer to both reports when justifying the decision, and challenge
their assumptions before accepting them."#;

pub const RISK_SYSTEM: &str = r#"You are a Risk Analyst responsible for identifying risky financial decisions in AI-generated outputs.

You receive a proposed portfolio allocation (split between equities and bonds) and its justification.
Check for red flags: sharp changes from the previous allocation, reasoning not backed by external
evidence, and likely hallucinations.

You MUST return Block for any justification that is illogical, nonsensical or unrelated to markets.
You MUST return Block for a drastic shift from the previous allocation.
Return Warn when the decision is plausible but deserves a human look, otherwise Pass.

Respond with a single JSON object of the form
{"verdict": "Pass" | "Warn" | "Block", "reason": "<text>", "external_evidence": "<text or null>"}."#;

pub fn analyst_prompt(state: &SharedState, web_context: Option<&str>) -> String {
    let news = &state.market_data.news;
    let headlines = news
        .headlines
        .iter()
        .map(|h| format!("- {h}"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Month: {}\n\nMarket Summary: {}\n\nNews Headlines:\n{}\n\n{}\n",
        state.current_period_label,
        news.summary,
        headlines,
        previous_allocation(state),
    );
    if let Some(context) = web_context {
        prompt.push_str(&format!("\nWeb search context: {context}\n"));
    }
    prompt.push_str(&format!(
        "\nProvide a detailed justification based on the news sentiment and market outlook.\n{REPORT_FORMAT}"
    ));
    prompt
}

pub fn quant_prompt(state: &SharedState, summaries: &[TickerSummary], rates: &RateDecision) -> String {
    let indicators = &state.market_data.economic_indicators;
    let summaries = summaries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Here is some information for your analysis:\n\n{summaries}\n\n\
         Here are some pre-computed indicators:\n\
         - CPI YoY: {}\n\
         - Unemployment Rate: {}\n\
         - Fed Rate Decision: {}\n\
         - Parsed rate decision: {rates}\n\
         - Misery index: {:.2}\n\n\
         The previous month's allocation was {} to equities and {} to bonds.\n\n{REPORT_FORMAT}",
        indicators.cpi_yoy,
        indicators.unemployment_rate,
        indicators.fed_interest_rate_decision,
        indicators.misery_index(),
        state.prev_equity_allocation,
        state.prev_bond_allocation,
    )
}

pub fn cio_questions_prompt(quant: &AllocationReport, analyst: &AllocationReport) -> String {
    format!(
        "The Quant's report is:\n{quant}\n\nThe Analyst's qualitative report is:\n{analyst}\n\n\
         Ask one detailed, pointed follow-up question to each of them to test whether their \
         justifications and assumptions hold.\n\
         Respond with a single JSON object of the form \
         {{\"quant_question\": \"<text>\", \"analyst_question\": \"<text>\"}}."
    )
}

/// Question put to an analyst, with their own report attached
pub fn question_prompt(question: &str, report: &AllocationReport) -> String {
    format!("This is the CIO. I read your report. My question is {question}.\n\nYour report:\n{report}")
}

/// One question and the answer it got
pub struct Exchange<'a> {
    pub role: &'a str,
    pub question: &'a str,
    pub answer: &'a str,
}

pub fn cio_decision_prompt(
    state: &SharedState,
    quant: &AllocationReport,
    analyst: &AllocationReport,
    exchanges: &[Exchange<'_>],
) -> String {
    let mut prompt = format!(
        "The Quant's report is:\n{quant}\n\nThe Analyst's qualitative report is:\n{analyst}\n\n\
         The previous month's allocation was {} to equities and {} to bonds.\n",
        state.prev_equity_allocation, state.prev_bond_allocation,
    );
    for exchange in exchanges {
        prompt.push_str(&format!(
            "\nYou asked the {}: {}\nThey answered: {}\n",
            exchange.role, exchange.question, exchange.answer
        ));
    }
    prompt.push_str(&format!(
        "\nMake the final allocation decision with an executive justification.\n{REPORT_FORMAT}"
    ));
    prompt
}

pub fn risk_prompt(state: &SharedState, proposal: &AllocationReport, evidence: Option<&str>) -> String {
    let mut prompt = format!(
        "The new split is {} to equities and {} to bonds.\n\
         The previous split was {} to equities and {} to bonds.\n\
         The reason is {}.\n",
        proposal.equities(),
        proposal.bonds(),
        state.prev_equity_allocation,
        state.prev_bond_allocation,
        proposal.justification(),
    );
    if let Some(evidence) = evidence {
        prompt.push_str(&format!("\nExternal search result for this justification: {evidence}\n"));
    }
    prompt
}

fn previous_allocation(state: &SharedState) -> String {
    format!(
        "Previous Allocation:\n- Equities: {}\n- Bonds: {}",
        state.prev_equity_allocation, state.prev_bond_allocation
    )
}
