use crate::domain::portfolio::{AssetAllocation, PortfolioRecord};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

/// Shape the model is asked to return. Summary fields are optional because the
/// results page has display defaults for them; the asset list is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmPortfolioRecord {
    pub portfolio: Vec<LlmAssetAllocation>,
    #[serde(default)]
    pub portfolio_commentary: Option<String>,
    #[serde(default)]
    pub expected_annual_return: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub max_expected_yearly_loss: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAssetAllocation {
    pub asset_name: String,
    pub ticker: String,
    pub allocation_percentage: f64,
    pub investment_amount: f64,
    pub asset_class: String,
    pub currency: String,
    pub description: String,
    #[serde(default)]
    pub link: Option<String>,
    pub buying_strategy: String,
}

impl LlmPortfolioRecord {
    pub fn validate_and_into_record(self) -> anyhow::Result<PortfolioRecord> {
        ensure!(
            !self.portfolio.is_empty(),
            "LLM output must contain at least one portfolio asset"
        );

        if let Some(ret) = self.expected_annual_return {
            ensure!(
                ret.is_finite() && (-100.0..=100.0).contains(&ret),
                "expected_annual_return must be between -100 and 100 (got {ret})"
            );
        }
        if let Some(loss) = self.max_expected_yearly_loss {
            ensure!(
                loss.is_finite() && (0.0..=100.0).contains(&loss),
                "max_expected_yearly_loss must be between 0 and 100 (got {loss})"
            );
        }

        let mut portfolio = Vec::with_capacity(self.portfolio.len());
        for (idx, asset) in self.portfolio.into_iter().enumerate() {
            let asset = asset
                .validate_and_into_asset()
                .with_context(|| format!("invalid portfolio asset at index {idx}"))?;
            portfolio.push(asset);
        }

        Ok(PortfolioRecord {
            portfolio,
            portfolio_commentary: trimmed_non_empty(self.portfolio_commentary),
            expected_annual_return: self.expected_annual_return,
            risk_level: trimmed_non_empty(self.risk_level),
            max_expected_yearly_loss: self.max_expected_yearly_loss,
        })
    }
}

impl LlmAssetAllocation {
    fn validate_and_into_asset(self) -> anyhow::Result<AssetAllocation> {
        let asset_name = self.asset_name.trim().to_string();
        ensure!(!asset_name.is_empty(), "asset_name must be non-empty");

        let ticker = self.ticker.trim().to_string();
        ensure!(!ticker.is_empty(), "ticker must be non-empty");

        let asset_class = self.asset_class.trim().to_string();
        ensure!(!asset_class.is_empty(), "asset_class must be non-empty");

        let currency = self.currency.trim().to_string();
        ensure!(!currency.is_empty(), "currency must be non-empty");

        ensure!(
            self.allocation_percentage.is_finite()
                && (0.0..=100.0).contains(&self.allocation_percentage),
            "allocation_percentage must be between 0 and 100 (got {})",
            self.allocation_percentage
        );
        ensure!(
            self.investment_amount.is_finite() && self.investment_amount >= 0.0,
            "investment_amount must be non-negative (got {})",
            self.investment_amount
        );

        Ok(AssetAllocation {
            asset_name,
            ticker,
            allocation_percentage: self.allocation_percentage,
            investment_amount: self.investment_amount,
            asset_class,
            currency,
            description: self.description.trim().to_string(),
            link: web_link(self.link),
            buying_strategy: self.buying_strategy.trim().to_string(),
        })
    }
}

fn trimmed_non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Only absolute http(s) URLs survive; anything else is dropped rather than
/// failing the whole record.
fn web_link(value: Option<String>) -> Option<String> {
    let raw = trimmed_non_empty(value)?;
    match reqwest::Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => Some(raw),
        _ => {
            tracing::debug!(link = %raw, "dropping non-web asset link");
            None
        }
    }
}
