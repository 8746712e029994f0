//! Technical-rate discounting for the premium calculation
//!
//! Two conventions coexist:
//! - expected losses are discounted mid-month, `1 / (1 + i_m)^(t + 0.5)` with
//!   `i_m = (1 + i)^(1/12) - 1`
//! - the premium annuity is discounted at the start of each month, `v^t` with
//!   `v = 1 / (1 + i)^(1/12)`

use serde::{Deserialize, Serialize};

use crate::error::{PricingError, Result};

/// Annual technical (valuation) rate used by the insurer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechnicalRate {
    annual: f64,
}

impl TechnicalRate {
    pub fn new(annual: f64) -> Result<Self> {
        if !(annual > -1.0) || !annual.is_finite() {
            return Err(PricingError::invalid(
                "technical_rate",
                format!("must be a finite rate above -100%, got {annual}"),
            ));
        }
        Ok(Self { annual })
    }

    pub fn annual(&self) -> f64 {
        self.annual
    }

    /// Monthly rate compounding to the annual rate
    pub fn monthly_equivalent(&self) -> f64 {
        (1.0 + self.annual).powf(1.0 / 12.0) - 1.0
    }

    /// Discount factor for a loss occurring mid-way through month `t`
    pub fn mid_month_factor(&self, month: u32) -> f64 {
        1.0 / (1.0 + self.monthly_equivalent()).powf(month as f64 + 0.5)
    }

    /// One-month discount factor `v`
    pub fn monthly_discount(&self) -> f64 {
        1.0 / (1.0 + self.annual).powf(1.0 / 12.0)
    }

    /// Discount factor for a premium paid at the start of month `t`
    pub fn annuity_factor_at(&self, month: u32) -> f64 {
        self.monthly_discount().powf(month as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_monthly_equivalent_compounds_to_annual() {
        let rate = TechnicalRate::new(0.02).unwrap();
        let monthly = rate.monthly_equivalent();

        assert_relative_eq!((1.0 + monthly).powi(12), 1.02, max_relative = 1e-12);
        // Compounding-consistent, so below simple division
        assert!(monthly < 0.02 / 12.0);
    }

    #[test]
    fn test_mid_month_shift() {
        let rate = TechnicalRate::new(0.03).unwrap();

        // Half a month of discounting at t = 0
        assert_relative_eq!(rate.mid_month_factor(0), 1.03_f64.powf(-1.0 / 24.0), max_relative = 1e-12);
        // Twelve months later: one more year plus the half month
        assert_relative_eq!(
            rate.mid_month_factor(12),
            1.03_f64.powf(-(12.5 / 12.0)),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_annuity_discount_has_no_shift() {
        let rate = TechnicalRate::new(0.05).unwrap();

        assert_eq!(rate.annuity_factor_at(0), 1.0);
        assert_relative_eq!(rate.annuity_factor_at(12), 1.0 / 1.05, max_relative = 1e-12);
        assert!(rate.annuity_factor_at(6) > rate.mid_month_factor(6));
    }

    #[test]
    fn test_zero_rate_means_no_discounting() {
        let rate = TechnicalRate::new(0.0).unwrap();
        assert_eq!(rate.monthly_equivalent(), 0.0);
        assert_eq!(rate.mid_month_factor(100), 1.0);
        assert_eq!(rate.annuity_factor_at(100), 1.0);
    }

    #[test]
    fn test_invalid_rates() {
        assert!(TechnicalRate::new(-1.0).is_err());
        assert!(TechnicalRate::new(f64::INFINITY).is_err());
        assert!(TechnicalRate::new(f64::NAN).is_err());
        assert!(TechnicalRate::new(-0.005).is_ok());
    }
}
