use crate::domain::inputs::{Currency, UserInputs};
use crate::domain::portfolio::{AssetAllocation, PortfolioRecord, Recommendation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_COMMENTARY: &str = "No commentary available";

/// Width of the illustrative band around the expected-return curve, in
/// percentage points.
pub const PROJECTION_BAND_PCT: f64 = 2.0;

/// Growth rate used by the projection when the model reported none.
pub const DEFAULT_PROJECTION_RETURN_PCT: f64 = 7.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub summary: SummaryMetrics,
    pub risk_badge: RiskBadge,
    pub commentary: String,
    pub allocation_table: Vec<AllocationRow>,
    pub asset_details: Vec<AssetDetail>,
    pub by_asset_class: Vec<Slice>,
    pub by_currency: Vec<Slice>,
    pub projection: Projection,
    pub currency: Currency,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryMetrics {
    pub risk_level: String,
    pub expected_annual_return: String,
    pub max_expected_yearly_loss: String,
    pub investment_horizon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskBadge {
    pub level: String,
    pub color: &'static str,
    pub max_loss: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRow {
    pub asset_name: String,
    pub ticker: String,
    pub allocation: String,
    pub investment_amount: String,
    pub asset_class: String,
    pub currency: String,
    pub buying_strategy: String,
}

impl AllocationRow {
    pub const HEADERS: [&'static str; 7] = [
        "Asset Name",
        "Ticker",
        "Allocation %",
        "Investment Amount",
        "Asset Class",
        "Currency",
        "Buying Strategy",
    ];

    pub fn cells(&self) -> [&str; 7] {
        [
            self.asset_name.as_str(),
            self.ticker.as_str(),
            self.allocation.as_str(),
            self.investment_amount.as_str(),
            self.asset_class.as_str(),
            self.currency.as_str(),
            self.buying_strategy.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetDetail {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Projection {
    pub years: Vec<u32>,
    pub base_values: Vec<f64>,
    pub upper_values: Vec<f64>,
    pub lower_values: Vec<f64>,
}

impl ResultsView {
    pub fn build(rec: &Recommendation) -> Self {
        let record = &rec.record;
        let inputs = &rec.inputs;

        let projection_return = record
            .expected_annual_return
            .unwrap_or(DEFAULT_PROJECTION_RETURN_PCT);

        Self {
            summary: summary_metrics(record, inputs),
            risk_badge: risk_badge(record),
            commentary: record
                .portfolio_commentary
                .clone()
                .unwrap_or_else(|| NO_COMMENTARY.to_string()),
            allocation_table: record
                .portfolio
                .iter()
                .map(|a| allocation_row(a, inputs.currency))
                .collect(),
            asset_details: record.portfolio.iter().map(asset_detail).collect(),
            by_asset_class: allocation_by(&record.portfolio, |a| &a.asset_class),
            by_currency: allocation_by(&record.portfolio, |a| &a.currency),
            projection: projection(inputs.investable_amount, projection_return, inputs.time_horizon),
            currency: inputs.currency,
            generated_at: rec.generated_at,
        }
    }
}

pub fn summary_metrics(record: &PortfolioRecord, inputs: &UserInputs) -> SummaryMetrics {
    SummaryMetrics {
        risk_level: record
            .risk_level
            .clone()
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        expected_annual_return: format_pct(record.expected_annual_return.unwrap_or(0.0)),
        max_expected_yearly_loss: format_pct(record.max_expected_yearly_loss.unwrap_or(0.0)),
        investment_horizon: format!("{} years", inputs.time_horizon),
    }
}

pub fn risk_badge(record: &PortfolioRecord) -> RiskBadge {
    let level = record.risk_level.as_deref().unwrap_or("Medium");
    let color = match level {
        "Low" => "green",
        "Medium" => "orange",
        "High" => "red",
        _ => "gray",
    };
    RiskBadge {
        level: level.to_string(),
        color,
        max_loss: format_pct(record.max_expected_yearly_loss.unwrap_or(0.0)),
    }
}

fn allocation_row(asset: &AssetAllocation, currency: Currency) -> AllocationRow {
    AllocationRow {
        asset_name: asset.asset_name.clone(),
        ticker: asset.ticker.clone(),
        allocation: format_pct(asset.allocation_percentage),
        investment_amount: format_amount(currency, asset.investment_amount),
        asset_class: asset.asset_class.clone(),
        currency: asset.currency.clone(),
        buying_strategy: asset.buying_strategy.clone(),
    }
}

fn asset_detail(asset: &AssetAllocation) -> AssetDetail {
    AssetDetail {
        title: format!("{} ({})", asset.asset_name, asset.ticker),
        description: asset.description.clone(),
        link: asset.link.clone(),
    }
}

/// Sums allocation percentages per key, ordered by key.
pub fn allocation_by<F>(portfolio: &[AssetAllocation], key: F) -> Vec<Slice>
where
    F: Fn(&AssetAllocation) -> &String,
{
    let mut sums = BTreeMap::<&str, f64>::new();
    for asset in portfolio {
        *sums.entry(key(asset).as_str()).or_insert(0.0) += asset.allocation_percentage;
    }
    sums.into_iter()
        .map(|(label, value)| Slice {
            label: label.to_string(),
            value,
        })
        .collect()
}

/// Compound growth for years `0..=time_horizon` at the expected return, with
/// a band of `PROJECTION_BAND_PCT` points either side.
pub fn projection(initial_amount: f64, expected_return_pct: f64, time_horizon: u32) -> Projection {
    let rate = expected_return_pct / 100.0;
    let band = PROJECTION_BAND_PCT / 100.0;
    let years: Vec<u32> = (0..=time_horizon).collect();
    let grow = |r: f64| -> Vec<f64> {
        years
            .iter()
            .map(|&y| initial_amount * (1.0 + r).powi(y as i32))
            .collect()
    };

    Projection {
        base_values: grow(rate),
        upper_values: grow(rate + band),
        lower_values: grow(rate - band),
        years,
    }
}

pub fn format_pct(value: f64) -> String {
    format!("{value:.2}%")
}

/// `"USD 12,500.00"`
pub fn format_amount(currency: Currency, value: f64) -> String {
    format!("{currency} {}", format_thousands(value))
}

pub fn format_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
