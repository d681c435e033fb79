use crate::domain::inputs::UserInputs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRecord {
    pub portfolio: Vec<AssetAllocation>,
    pub portfolio_commentary: Option<String>,
    pub expected_annual_return: Option<f64>,
    pub risk_level: Option<String>,
    pub max_expected_yearly_loss: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub asset_name: String,
    pub ticker: String,
    pub allocation_percentage: f64,
    pub investment_amount: f64,
    pub asset_class: String,
    pub currency: String,
    pub description: String,
    pub link: Option<String>,
    pub buying_strategy: String,
}

impl PortfolioRecord {
    pub fn total_allocation_percentage(&self) -> f64 {
        self.portfolio.iter().map(|a| a.allocation_percentage).sum()
    }

    pub fn total_investment_amount(&self) -> f64 {
        self.portfolio.iter().map(|a| a.investment_amount).sum()
    }
}

/// A portfolio paired with the inputs it was generated for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub inputs: UserInputs,
    pub record: PortfolioRecord,
    pub generated_at: DateTime<Utc>,
}
