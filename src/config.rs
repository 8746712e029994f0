//! Pricing request: the scalar inputs of one pricing call
//!
//! Missing JSON fields fall back to the reference case (200 000 over 20 years at 3.5%,
//! subscribed at 35, technical rate 2%, 35% abattement).

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};
use crate::mortality::MortalityTable;
use crate::pricing::{price, PricingResult};

/// Input parameters for one pricing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    /// Borrowed principal
    #[serde(default = "default_capital")]
    pub capital: f64,

    /// Loan term in years
    #[serde(default = "default_duration_years")]
    pub duration_years: u32,

    /// Annual loan interest rate (0.035 for 3.5%)
    #[serde(default = "default_loan_rate")]
    pub loan_rate: f64,

    /// Borrower age at subscription
    #[serde(default = "default_age")]
    pub age: u32,

    /// Annual technical rate for discounting
    #[serde(default = "default_technical_rate")]
    pub technical_rate: f64,

    /// Flat reduction applied to table qx
    #[serde(default = "default_abattement")]
    pub abattement: f64,
}

fn default_capital() -> f64 { 200_000.0 }
fn default_duration_years() -> u32 { 20 }
fn default_loan_rate() -> f64 { 0.035 }
fn default_age() -> u32 { 35 }
fn default_technical_rate() -> f64 { 0.02 }
fn default_abattement() -> f64 { 0.35 }

impl Default for PricingRequest {
    fn default() -> Self {
        Self {
            capital: default_capital(),
            duration_years: default_duration_years(),
            loan_rate: default_loan_rate(),
            age: default_age(),
            technical_rate: default_technical_rate(),
            abattement: default_abattement(),
        }
    }
}

/// Accepted input ranges
pub const MIN_CAPITAL: f64 = 1_000.0;
pub const MAX_DURATION_YEARS: u32 = 40;
pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 90;
pub const MAX_ABATTEMENT: f64 = 0.9;

impl PricingRequest {
    /// Read a request from a JSON file; absent fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let request = serde_json::from_reader(BufReader::new(file))?;
        Ok(request)
    }

    /// Check the request against the accepted input ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.capital >= MIN_CAPITAL) || !self.capital.is_finite() {
            return Err(PricingError::invalid(
                "capital",
                format!("must be at least {MIN_CAPITAL}, got {}", self.capital),
            ));
        }
        if !(1..=MAX_DURATION_YEARS).contains(&self.duration_years) {
            return Err(PricingError::invalid(
                "duration_years",
                format!("must lie in 1..={MAX_DURATION_YEARS}, got {}", self.duration_years),
            ));
        }
        if !(self.loan_rate >= 0.0) || !self.loan_rate.is_finite() {
            return Err(PricingError::invalid(
                "loan_rate",
                format!("must be non-negative, got {}", self.loan_rate),
            ));
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.age) {
            return Err(PricingError::invalid(
                "age",
                format!("must lie in {MIN_AGE}..={MAX_AGE}, got {}", self.age),
            ));
        }
        if !(self.technical_rate >= 0.0) || !self.technical_rate.is_finite() {
            return Err(PricingError::invalid(
                "technical_rate",
                format!("must be non-negative, got {}", self.technical_rate),
            ));
        }
        if !(0.0..=MAX_ABATTEMENT).contains(&self.abattement) {
            return Err(PricingError::invalid(
                "abattement",
                format!("must lie in [0, {MAX_ABATTEMENT}], got {}", self.abattement),
            ));
        }
        Ok(())
    }

    /// Validate, then price against `table`
    pub fn price(&self, table: &MortalityTable) -> Result<PricingResult> {
        self.validate()?;
        price(
            table,
            self.capital,
            self.duration_years,
            self.loan_rate,
            self.age,
            self.technical_rate,
            self.abattement,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mortality::Sex;

    #[test]
    fn test_defaults_from_empty_json() {
        let request: PricingRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PricingRequest::default());
        assert_eq!(request.capital, 200_000.0);
        assert_eq!(request.duration_years, 20);
        assert_eq!(request.abattement, 0.35);
    }

    #[test]
    fn test_partial_json_override() {
        let request: PricingRequest =
            serde_json::from_str(r#"{"capital": 150000, "age": 48, "loan_rate": 0.0}"#).unwrap();
        assert_eq!(request.capital, 150_000.0);
        assert_eq!(request.age, 48);
        assert_eq!(request.loan_rate, 0.0);
        assert_eq!(request.technical_rate, 0.02);
    }

    #[test]
    fn test_validate_ranges() {
        assert!(PricingRequest::default().validate().is_ok());

        let cases = [
            PricingRequest { capital: 500.0, ..Default::default() },
            PricingRequest { duration_years: 0, ..Default::default() },
            PricingRequest { duration_years: 41, ..Default::default() },
            PricingRequest { loan_rate: -0.01, ..Default::default() },
            PricingRequest { age: 17, ..Default::default() },
            PricingRequest { age: 91, ..Default::default() },
            PricingRequest { technical_rate: f64::NAN, ..Default::default() },
            PricingRequest { abattement: 0.95, ..Default::default() },
        ];
        for case in &cases {
            assert!(
                matches!(case.validate(), Err(PricingError::InvalidParameter { .. })),
                "expected rejection of {:?}",
                case
            );
        }
    }

    #[test]
    fn test_price_request() {
        let table = MortalityTable::iam_2012_basic(Sex::Male);
        let result = PricingRequest::default().price(&table).unwrap();
        assert_eq!(result.schedule.len(), 241);
        assert!(result.monthly_premium > 0.0);

        let invalid = PricingRequest { age: 10, ..Default::default() };
        assert!(invalid.price(&table).is_err());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("pricing_request_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"duration_years": 15, "abattement": 0.5}"#).unwrap();
        let request = PricingRequest::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(request.duration_years, 15);
        assert_eq!(request.abattement, 0.5);
        assert_eq!(request.age, 35);
    }
}
