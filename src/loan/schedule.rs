//! Level-payment amortization schedule with per-month monetary rounding
//!
//! Month 0 is the seed row (full principal outstanding, nothing paid). Each later
//! month carries the rounded outstanding balance forward, so rounding error compounds
//! exactly as in the reference spreadsheet.

use std::io::Write;

use serde::Serialize;

use crate::error::{PricingError, Result};

/// One installment of the schedule
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduleRow {
    /// Installment number, 0 for the seed row
    #[serde(rename = "Num_échéance")]
    pub month: u32,
    /// Outstanding principal after this installment
    #[serde(rename = "capital_restant_du")]
    pub outstanding: f64,
    #[serde(rename = "interets")]
    pub interest: f64,
    #[serde(rename = "mensualites")]
    pub payment: f64,
    #[serde(rename = "capital_rembourse")]
    pub principal_repaid: f64,
}

/// Schedule row extended with the insurance premium columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricedRow {
    #[serde(rename = "Num_échéance")]
    pub month: u32,
    #[serde(rename = "capital_restant_du")]
    pub outstanding: f64,
    #[serde(rename = "interets")]
    pub interest: f64,
    #[serde(rename = "mensualites")]
    pub payment: f64,
    #[serde(rename = "capital_rembourse")]
    pub principal_repaid: f64,
    #[serde(rename = "prime_mensuelle")]
    pub monthly_premium: f64,
    /// Loan payment plus premium
    #[serde(rename = "mensualite_totale")]
    pub total_payment: f64,
}

/// Month-by-month amortization of a fixed-rate loan
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizationSchedule {
    capital: f64,
    duration_years: u32,
    annual_rate: f64,
    payment: f64,
    rows: Vec<ScheduleRow>,
}

/// Round to cents on the exact binary value.
///
/// Goes through the exact decimal formatter rather than `(x * 100).round()`,
/// which misrounds values whose scaled product is inexact (1.005 must give 1.0).
pub fn round_cents(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.2}").parse().unwrap_or(value)
}

/// Level monthly payment for principal `capital` over `months` at monthly rate `monthly_rate`.
///
/// A zero rate degenerates to straight-line repayment instead of dividing by zero.
pub fn level_payment(capital: f64, monthly_rate: f64, months: u32) -> f64 {
    if monthly_rate == 0.0 {
        return capital / months as f64;
    }
    capital * (monthly_rate / (1.0 - (1.0 + monthly_rate).powf(-(months as f64))))
}

/// Write priced rows as CSV with the schedule's column names
pub fn write_schedule_csv<W: Write>(rows: &[PricedRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

impl AmortizationSchedule {
    /// Build the schedule for `capital` over `duration_years` at `annual_rate`.
    pub fn build(capital: f64, duration_years: u32, annual_rate: f64) -> Result<Self> {
        if !(capital > 0.0) || !capital.is_finite() {
            return Err(PricingError::invalid("capital", format!("must be positive, got {capital}")));
        }
        if duration_years < 1 {
            return Err(PricingError::invalid("duration_years", "must be at least 1 year"));
        }
        if !(annual_rate >= 0.0) || !annual_rate.is_finite() {
            return Err(PricingError::invalid(
                "loan_rate",
                format!("must be a non-negative rate, got {annual_rate}"),
            ));
        }

        let months = duration_years.checked_mul(12).ok_or_else(|| {
            PricingError::invalid("duration_years", format!("{duration_years} years overflows the month count"))
        })?;
        let monthly_rate = annual_rate / 12.0;
        let payment = level_payment(capital, monthly_rate, months);
        if !payment.is_finite() {
            return Err(PricingError::NonFinite("loan payment"));
        }

        let seed = ScheduleRow {
            month: 0,
            outstanding: capital,
            interest: 0.0,
            payment: 0.0,
            principal_repaid: 0.0,
        };

        let rows = (1..=months).fold(vec![seed], |mut rows, month| {
            let previous = rows[rows.len() - 1].outstanding;
            let interest = previous * monthly_rate;
            let principal_repaid = payment - interest;
            rows.push(ScheduleRow {
                month,
                outstanding: round_cents(previous - principal_repaid),
                interest: round_cents(interest),
                payment: round_cents(payment),
                principal_repaid: round_cents(principal_repaid),
            });
            rows
        });

        log::debug!(
            "Schedule: capital {:.2}, {} months at {:.4}, payment {:.6}",
            capital,
            months,
            annual_rate,
            payment
        );

        Ok(Self {
            capital,
            duration_years,
            annual_rate,
            payment,
            rows,
        })
    }

    pub fn rows(&self) -> &[ScheduleRow] {
        &self.rows
    }

    /// Outstanding principal column, months 0..=N
    pub fn outstanding(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.outstanding).collect()
    }

    /// Unrounded level payment
    pub fn payment(&self) -> f64 {
        self.payment
    }

    /// Rounded payment of the first installment (0 for a schedule with no installments)
    pub fn first_payment(&self) -> f64 {
        self.rows.get(1).map(|row| row.payment).unwrap_or(0.0)
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn duration_years(&self) -> u32 {
        self.duration_years
    }

    pub fn annual_rate(&self) -> f64 {
        self.annual_rate
    }

    /// Number of installments N = 12 x duration
    pub fn months(&self) -> u32 {
        12 * self.duration_years
    }

    /// Attach a constant monthly premium to every row
    pub fn with_premium(&self, monthly_premium: f64) -> Vec<PricedRow> {
        self.rows
            .iter()
            .map(|row| PricedRow {
                month: row.month,
                outstanding: row.outstanding,
                interest: row.interest,
                payment: row.payment,
                principal_repaid: row.principal_repaid,
                monthly_premium,
                total_payment: row.payment + monthly_premium,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(1.234), 1.23);
        assert_eq!(round_cents(1.236), 1.24);
        assert_eq!(round_cents(-0.004), -0.0);
        // 1.005 is stored slightly below the half, so it rounds down
        assert_eq!(round_cents(1.005), 1.0);
        assert!(round_cents(f64::NAN).is_nan());
    }

    #[test]
    fn test_level_payment() {
        // 200k over 20 years at 3.5%
        let payment = level_payment(200_000.0, 0.035 / 12.0, 240);
        assert_abs_diff_eq!(payment, 1159.92, epsilon = 0.01);
    }

    #[test]
    fn test_schedule_shape() {
        let schedule = AmortizationSchedule::build(200_000.0, 20, 0.035).unwrap();
        let rows = schedule.rows();

        assert_eq!(rows.len(), 241);
        assert_eq!(rows[0].month, 0);
        assert_eq!(rows[0].outstanding, 200_000.0);
        assert_eq!(rows[0].payment, 0.0);
        assert_eq!(rows[0].interest, 0.0);
        assert_eq!(rows[0].principal_repaid, 0.0);
        assert_eq!(rows[240].month, 240);
    }

    #[test]
    fn test_first_installment() {
        let schedule = AmortizationSchedule::build(200_000.0, 20, 0.035).unwrap();
        let first = schedule.rows()[1];

        // 200000 * 0.035 / 12 = 583.333...
        assert_eq!(first.interest, 583.33);
        assert_eq!(first.payment, round_cents(schedule.payment()));
        assert_eq!(first.principal_repaid, round_cents(schedule.payment() - 200_000.0 * 0.035 / 12.0));
        assert_eq!(first.outstanding, round_cents(200_000.0 - (schedule.payment() - 200_000.0 * 0.035 / 12.0)));
    }

    #[test]
    fn test_outstanding_decreases_to_zero() {
        let schedule = AmortizationSchedule::build(150_000.0, 15, 0.042).unwrap();
        let rows = schedule.rows();

        assert!(rows.windows(2).all(|w| w[1].outstanding < w[0].outstanding));
        assert_abs_diff_eq!(rows[rows.len() - 1].outstanding, 0.0, epsilon = 0.5);

        let total_paid = schedule.payment() * schedule.months() as f64;
        let total_interest: f64 = rows.iter().map(|r| r.interest).sum();
        assert_abs_diff_eq!(total_paid, 150_000.0 + total_interest, epsilon = 1.0);
    }

    #[test]
    fn test_outstanding_carries_rounded_balance() {
        let schedule = AmortizationSchedule::build(123_456.78, 7, 0.0365).unwrap();
        let rows = schedule.rows();
        let monthly_rate = 0.0365 / 12.0;

        for m in 1..rows.len() {
            let previous = rows[m - 1].outstanding;
            let expected = round_cents(previous - (schedule.payment() - previous * monthly_rate));
            assert_eq!(rows[m].outstanding, expected);
        }
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let schedule = AmortizationSchedule::build(120_000.0, 10, 0.0).unwrap();

        assert_relative_eq!(schedule.payment(), 1000.0);
        assert!(schedule.rows().iter().all(|r| r.payment.is_finite()));
        assert_eq!(schedule.rows()[1].interest, 0.0);
        assert_eq!(schedule.rows()[60].outstanding, 60_000.0);
        assert_abs_diff_eq!(schedule.rows()[120].outstanding, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(AmortizationSchedule::build(0.0, 10, 0.03).is_err());
        assert!(AmortizationSchedule::build(-5.0, 10, 0.03).is_err());
        assert!(AmortizationSchedule::build(1000.0, 0, 0.03).is_err());
        assert!(matches!(
            AmortizationSchedule::build(1000.0, 5, -0.01),
            Err(PricingError::InvalidParameter { name: "loan_rate", .. })
        ));
        assert!(AmortizationSchedule::build(f64::NAN, 5, 0.01).is_err());
    }

    #[test]
    fn test_huge_duration_is_rejected() {
        assert!(matches!(
            AmortizationSchedule::build(1000.0, u32::MAX / 4, 0.03),
            Err(PricingError::InvalidParameter { name: "duration_years", .. })
        ));
    }

    #[test]
    fn test_first_payment_is_rounded_installment() {
        let schedule = AmortizationSchedule::build(200_000.0, 20, 0.035).unwrap();
        assert_eq!(schedule.first_payment(), schedule.rows()[1].payment);
        assert_eq!(schedule.first_payment(), round_cents(schedule.payment()));
        assert_abs_diff_eq!(schedule.first_payment(), 1159.92, epsilon = 1e-9);
    }

    #[test]
    fn test_write_schedule_csv() {
        let schedule = AmortizationSchedule::build(12_000.0, 1, 0.0).unwrap();
        let mut buffer = Vec::new();
        write_schedule_csv(&schedule.with_premium(2.5), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Num_échéance,capital_restant_du,interets,mensualites,capital_rembourse,prime_mensuelle,mensualite_totale"
        );
        assert_eq!(lines.next().unwrap(), "0,12000.0,0.0,0.0,0.0,2.5,2.5");
        assert_eq!(lines.count(), 12);
    }

    #[test]
    fn test_with_premium() {
        let schedule = AmortizationSchedule::build(10_000.0, 1, 0.05).unwrap();
        let priced = schedule.with_premium(4.5);

        assert_eq!(priced.len(), 13);
        assert_eq!(priced[0].total_payment, 4.5);
        assert_relative_eq!(priced[1].total_payment, priced[1].payment + 4.5);
        assert!(priced.iter().all(|r| r.monthly_premium == 4.5));
    }
}
