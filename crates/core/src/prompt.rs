use crate::domain::inputs::UserInputs;
use serde_json::json;

pub const SYSTEM_PROMPT: &str = "You are a financial advisor specializing in ETF portfolio construction. Always respond with valid JSON.";

/// Example document the model is asked to populate. Summary fields echo the
/// investor's own choices.
pub fn example_response(inputs: &UserInputs) -> serde_json::Value {
    json!({
        "portfolio": [
            {
                "asset_name": "ETF Name",
                "ticker": "TICKER",
                "allocation_percentage": 25.0,
                "investment_amount": 10000,
                "asset_class": "Equity/Bond/Commodity/etc",
                "currency": "USD",
                "description": "Brief description of the asset",
                "link": "https://example.com",
                "buying_strategy": "Buy over next 3 months or between $X-$Y"
            }
        ],
        "portfolio_commentary": "Explanation of why this portfolio is optimal",
        "expected_annual_return": 7.5,
        "risk_level": inputs.risk_profile.as_str(),
        "max_expected_yearly_loss": inputs.max_yearly_loss
    })
}

pub fn user_prompt(inputs: &UserInputs) -> String {
    // Pretty printing a json! value cannot fail.
    let schema = serde_json::to_string_pretty(&example_response(inputs)).unwrap_or_default();

    format!(
        "Given the current financial market situation, and the financial expectations over the next 6 months, \
please propose a balanced portfolio investing in Liquid ETFs preferably with low management fees that can \
maximize the return over {horizon} years keeping the risk limited to have a maximum yearly loss of {max_loss}%. \
The portfolio can invest up to {amount} {currency}.\n\
Make sure the proposed ETFs are chosen based on the investments profile given, do not provide general ETFs \
but rather ETFs that are optimal for the given risk profile: {risk}.\n\
Also propose a time spread or a price range over which the investor can buy each asset (typically over the \
next 6 months maximum).\n\n\
For each asset proposed provide a short explanation of the asset (max 2 sentences, potentially adding an \
external link for more details).\n\n\
In addition, there must be a comment to the proposed portfolio, explaining the reason why this proposal is \
an optimal portfolio given the current market situation and the investor preferences.\n\n\
Please return the result in the following JSON format:\n{schema}",
        horizon = inputs.time_horizon,
        max_loss = inputs.max_yearly_loss,
        amount = inputs.investable_amount,
        currency = inputs.currency,
        risk = inputs.risk_profile,
    )
}
