use crate::domain::inputs::UserInputs;
use crate::domain::portfolio::{PortfolioRecord, Recommendation};
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{json, CompletionRequest, LlmClient};
use crate::prompt;

/// Shown to the investor for any failure between prompt and parsed record.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Failed to generate portfolio recommendation. Please try again.";

const ALLOCATION_TOLERANCE_PCT: f64 = 1.0;
const AMOUNT_TOLERANCE_RATIO: f64 = 0.01;

pub fn completion_request(inputs: &UserInputs) -> CompletionRequest {
    CompletionRequest {
        system: prompt::SYSTEM_PROMPT.to_string(),
        user: prompt::user_prompt(inputs),
    }
}

/// One prompt, one completion, one parse. The caller decides how to surface
/// the error; nothing here retries beyond the client's own policy.
pub async fn generate_recommendation(
    llm: &dyn LlmClient,
    inputs: &UserInputs,
) -> anyhow::Result<Recommendation> {
    tracing::info!(
        provider = ?llm.provider(),
        amount = inputs.investable_amount,
        currency = %inputs.currency,
        risk = %inputs.risk_profile,
        horizon = inputs.time_horizon,
        "requesting portfolio recommendation"
    );

    let text = llm.complete(completion_request(inputs)).await?;

    let record = json::parse_portfolio(&text).map_err(|err| LlmDiagnosticsError {
        provider: llm.provider(),
        stage: "parse",
        detail: format!("{err:#}"),
        raw_output: Some(text.clone()),
        raw_response_json: None,
    })?;

    warn_on_inconsistent_totals(&record, inputs);

    Ok(Recommendation {
        inputs: inputs.clone(),
        record,
        generated_at: chrono::Utc::now(),
    })
}

// Totals are trusted as returned; inconsistencies are only logged.
fn warn_on_inconsistent_totals(record: &PortfolioRecord, inputs: &UserInputs) {
    let allocation = record.total_allocation_percentage();
    if (allocation - 100.0).abs() > ALLOCATION_TOLERANCE_PCT {
        tracing::warn!(allocation, "allocation percentages do not sum to 100");
    }

    let invested = record.total_investment_amount();
    if (invested - inputs.investable_amount).abs() > inputs.investable_amount * AMOUNT_TOLERANCE_RATIO
    {
        tracing::warn!(
            invested,
            investable = inputs.investable_amount,
            "investment amounts do not sum to the investable amount"
        );
    }
}
