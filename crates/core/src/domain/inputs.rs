use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_INVESTABLE_AMOUNT: f64 = 1_000.0;
pub const MAX_INVESTABLE_AMOUNT: f64 = 10_000_000.0;
pub const MIN_YEARLY_LOSS_PCT: f64 = 1.0;
pub const MAX_YEARLY_LOSS_PCT: f64 = 50.0;
pub const MIN_TIME_HORIZON_YEARS: u32 = 1;
pub const MAX_TIME_HORIZON_YEARS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "GBP")]
    Gbp,
    #[serde(rename = "CHF")]
    Chf,
    #[serde(rename = "JPY")]
    Jpy,
    #[serde(rename = "CAD")]
    Cad,
    #[serde(rename = "AUD")]
    Aud,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Chf,
        Currency::Jpy,
        Currency::Cad,
        Currency::Aud,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Chf => "CHF",
            Currency::Jpy => "JPY",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| InputError::UnsupportedCurrency(code.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [RiskProfile::Low, RiskProfile::Medium, RiskProfile::High];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskProfile::Low => "Low",
            RiskProfile::Medium => "Medium",
            RiskProfile::High => "High",
        }
    }

    /// Form help text shown next to the selector.
    pub fn description(self) -> &'static str {
        match self {
            RiskProfile::Low => "Conservative",
            RiskProfile::Medium => "Balanced",
            RiskProfile::High => "Aggressive",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        RiskProfile::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| InputError::UnknownRiskProfile(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    AmountTooLow(f64),
    AmountTooHigh(f64),
    MaxLossNotPositive(f64),
    MaxLossTooLow(f64),
    MaxLossTooHigh(f64),
    HorizonTooShort(u32),
    HorizonTooLong(u32),
    UnsupportedCurrency(String),
    UnknownRiskProfile(String),
    NotANumber { field: &'static str, value: String },
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::AmountTooLow(_) => write!(f, "Investable amount must be at least 1,000"),
            InputError::AmountTooHigh(_) => {
                write!(f, "Investable amount must be at most 10,000,000")
            }
            InputError::MaxLossNotPositive(_) => {
                write!(f, "Maximum yearly loss must be greater than 0")
            }
            InputError::MaxLossTooLow(_) => write!(f, "Maximum yearly loss must be at least 1%"),
            InputError::MaxLossTooHigh(_) => write!(f, "Maximum yearly loss must be at most 50%"),
            InputError::HorizonTooShort(_) => write!(f, "Time horizon must be at least 1 year"),
            InputError::HorizonTooLong(_) => write!(f, "Time horizon must be at most 30 years"),
            InputError::UnsupportedCurrency(code) => write!(f, "Unsupported currency: {code}"),
            InputError::UnknownRiskProfile(name) => write!(f, "Unknown risk profile: {name}"),
            InputError::NotANumber { field, value } if value.trim().is_empty() => {
                write!(f, "{field} is required")
            }
            InputError::NotANumber { field, value } => {
                write!(f, "{field} must be a number (got \"{}\")", value.trim())
            }
        }
    }
}

impl std::error::Error for InputError {}

/// Raw values as submitted by the investment profile form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationForm {
    pub currency: String,
    pub investable_amount: f64,
    pub risk_profile: String,
    pub max_yearly_loss: f64,
    pub time_horizon: u32,
}

impl Default for RecommendationForm {
    fn default() -> Self {
        Self {
            currency: Currency::Usd.code().to_string(),
            investable_amount: 50_000.0,
            risk_profile: RiskProfile::Medium.as_str().to_string(),
            max_yearly_loss: 15.0,
            time_horizon: 5,
        }
    }
}

impl RecommendationForm {
    /// Builds a form from untyped text fields, as posted by a browser.
    pub fn from_fields(
        currency: &str,
        investable_amount: &str,
        risk_profile: &str,
        max_yearly_loss: &str,
        time_horizon: &str,
    ) -> Result<Self, InputError> {
        Ok(Self {
            currency: currency.trim().to_string(),
            investable_amount: number("Investable amount", investable_amount)?,
            risk_profile: risk_profile.trim().to_string(),
            max_yearly_loss: number("Maximum yearly loss", max_yearly_loss)?,
            time_horizon: number("Time horizon (whole years)", time_horizon)?,
        })
    }
}

fn number<T: FromStr>(field: &'static str, value: &str) -> Result<T, InputError> {
    value.trim().parse().map_err(|_| InputError::NotANumber {
        field,
        value: value.to_string(),
    })
}

impl From<&UserInputs> for RecommendationForm {
    fn from(inputs: &UserInputs) -> Self {
        Self {
            currency: inputs.currency.code().to_string(),
            investable_amount: inputs.investable_amount,
            risk_profile: inputs.risk_profile.as_str().to_string(),
            max_yearly_loss: inputs.max_yearly_loss,
            time_horizon: inputs.time_horizon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInputs {
    pub investable_amount: f64,
    pub risk_profile: RiskProfile,
    pub max_yearly_loss: f64,
    pub time_horizon: u32,
    pub currency: Currency,
}

impl UserInputs {
    pub fn try_new(
        investable_amount: f64,
        risk_profile: RiskProfile,
        max_yearly_loss: f64,
        time_horizon: u32,
        currency: Currency,
    ) -> Result<Self, InputError> {
        if investable_amount.is_nan() || investable_amount < MIN_INVESTABLE_AMOUNT {
            return Err(InputError::AmountTooLow(investable_amount));
        }
        if investable_amount > MAX_INVESTABLE_AMOUNT {
            return Err(InputError::AmountTooHigh(investable_amount));
        }
        if max_yearly_loss.is_nan() || max_yearly_loss <= 0.0 {
            return Err(InputError::MaxLossNotPositive(max_yearly_loss));
        }
        if max_yearly_loss < MIN_YEARLY_LOSS_PCT {
            return Err(InputError::MaxLossTooLow(max_yearly_loss));
        }
        if max_yearly_loss > MAX_YEARLY_LOSS_PCT {
            return Err(InputError::MaxLossTooHigh(max_yearly_loss));
        }
        if time_horizon < MIN_TIME_HORIZON_YEARS {
            return Err(InputError::HorizonTooShort(time_horizon));
        }
        if time_horizon > MAX_TIME_HORIZON_YEARS {
            return Err(InputError::HorizonTooLong(time_horizon));
        }

        Ok(Self {
            investable_amount,
            risk_profile,
            max_yearly_loss,
            time_horizon,
            currency,
        })
    }
}

impl TryFrom<&RecommendationForm> for UserInputs {
    type Error = InputError;

    fn try_from(form: &RecommendationForm) -> Result<Self, Self::Error> {
        let currency = form.currency.parse::<Currency>()?;
        let risk_profile = form.risk_profile.parse::<RiskProfile>()?;
        UserInputs::try_new(
            form.investable_amount,
            risk_profile,
            form.max_yearly_loss,
            form.time_horizon,
            currency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_default_form() {
        let inputs = UserInputs::try_from(&RecommendationForm::default()).unwrap();
        assert_eq!(inputs.currency, Currency::Usd);
        assert_eq!(inputs.risk_profile, RiskProfile::Medium);
        assert_eq!(inputs.time_horizon, 5);
    }

    #[test]
    fn rejects_amount_below_minimum() {
        let err = UserInputs::try_new(999.0, RiskProfile::Low, 10.0, 3, Currency::Eur).unwrap_err();
        assert_eq!(err, InputError::AmountTooLow(999.0));
        assert_eq!(err.to_string(), "Investable amount must be at least 1,000");
    }

    #[test]
    fn rejects_non_positive_max_loss() {
        let err = UserInputs::try_new(5_000.0, RiskProfile::Low, 0.0, 3, Currency::Eur).unwrap_err();
        assert_eq!(err, InputError::MaxLossNotPositive(0.0));
        assert!(UserInputs::try_new(5_000.0, RiskProfile::Low, f64::NAN, 3, Currency::Eur).is_err());
    }

    #[test]
    fn rejects_zero_horizon() {
        let err = UserInputs::try_new(5_000.0, RiskProfile::High, 5.0, 0, Currency::Gbp).unwrap_err();
        assert_eq!(err, InputError::HorizonTooShort(0));
    }

    #[test]
    fn enforces_form_upper_bounds() {
        assert!(UserInputs::try_new(20_000_000.0, RiskProfile::High, 5.0, 5, Currency::Gbp).is_err());
        assert!(UserInputs::try_new(5_000.0, RiskProfile::High, 51.0, 5, Currency::Gbp).is_err());
        assert_eq!(
            UserInputs::try_new(5_000.0, RiskProfile::High, 0.5, 5, Currency::Gbp).unwrap_err(),
            InputError::MaxLossTooLow(0.5)
        );
        assert!(UserInputs::try_new(5_000.0, RiskProfile::High, 5.0, 31, Currency::Gbp).is_err());
    }

    #[test]
    fn parses_text_fields() {
        let form = RecommendationForm::from_fields("eur", " 25000 ", "Low", "7.5", "10").unwrap();
        assert_eq!(form.investable_amount, 25_000.0);
        assert_eq!(form.max_yearly_loss, 7.5);
        assert_eq!(form.time_horizon, 10);
        assert_eq!(UserInputs::try_from(&form).unwrap().currency, Currency::Eur);
    }

    #[test]
    fn reports_unparseable_fields() {
        let err = RecommendationForm::from_fields("USD", "50000", "Medium", "15", "2.5").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Time horizon (whole years) must be a number (got \"2.5\")"
        );

        let err = RecommendationForm::from_fields("USD", "", "Medium", "15", "5").unwrap_err();
        assert_eq!(err.to_string(), "Investable amount is required");

        assert!(RecommendationForm::from_fields("USD", "50000", "Medium", "abc", "5").is_err());
    }

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("chf".parse::<Currency>().unwrap(), Currency::Chf);
        assert_eq!(" high ".parse::<RiskProfile>().unwrap(), RiskProfile::High);
        assert_eq!(
            "BTC".parse::<Currency>().unwrap_err(),
            InputError::UnsupportedCurrency("BTC".to_string())
        );
    }
}
