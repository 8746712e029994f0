//! Monthly working table: interpolated survivors, monthly death probabilities,
//! survival, discounting and expected loss on the outstanding principal

use crate::error::{PricingError, Result};
use crate::mortality::MortalityTable;
use super::discount::TechnicalRate;

/// One month of the pricing computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingRow {
    /// Month since subscription, t
    pub month: u32,
    /// y(t) = age + t div 12
    pub integer_age: u32,
    /// x(t) = age + t / 12
    pub fractional_age: f64,
    /// Table lx at the integer age, l(y(t))
    pub annual_lx: f64,
    /// Table qx at the integer age, q(y(t))
    pub annual_qx: f64,
    /// Survivors interpolated to the fractional age, l(x(t))
    pub lx: f64,
    /// Probability of dying within the month given alive at t, q(x(t))
    pub monthly_qx: f64,
    /// Survival from subscription to t, tp
    pub survival: f64,
    /// Mid-month discount factor
    pub discount: f64,
    /// Outstanding principal (CRD) at t
    pub outstanding: f64,
    /// Outstanding x survival x monthly q x discount
    pub expected_loss: f64,
}

/// Build the working table for months `0..12 * duration_years`.
///
/// `outstanding` must hold the schedule's outstanding principal for months 0..=N.
/// The month-N row only serves the forward difference of month N-1 and is dropped.
pub fn build_working_table(
    table: &MortalityTable,
    outstanding: &[f64],
    age: u32,
    duration_years: u32,
    technical_rate: &TechnicalRate,
) -> Result<Vec<WorkingRow>> {
    let months = 12 * duration_years as usize;
    if outstanding.len() != months + 1 {
        return Err(PricingError::ScheduleLengthMismatch {
            expected: months + 1,
            found: outstanding.len(),
        });
    }

    // l(y(t)) resampled at monthly granularity
    let annual: Vec<(u32, f64, f64)> = (0..=months)
        .map(|t| -> Result<(u32, f64, f64)> {
            let integer_age = age + (t / 12) as u32;
            let row = table.require(integer_age)?;
            Ok((integer_age, row.lx, row.qx))
        })
        .collect::<Result<_>>()?;

    // Interpolate between the year-boundary entries of that monthly column,
    // clipped to the last month so the final year falls back to lx0 == lx1.
    let last = months;
    let lx: Vec<f64> = (0..=months)
        .map(|t| {
            let year = t / 12;
            let frac = t as f64 / 12.0 - year as f64;
            let lx0 = annual[(year * 12).min(last)].1;
            let lx1 = annual[(year * 12 + 12).min(last)].1;
            lx0 + frac * (lx1 - lx0)
        })
        .collect();

    let l0 = lx[0];
    if !(l0 > 0.0) {
        return Err(PricingError::ExtinctCohort { age });
    }

    let rows = (0..months)
        .map(|t| {
            let (integer_age, annual_lx, annual_qx) = annual[t];
            let monthly_qx = if lx[t] > 0.0 {
                (lx[t] - lx[t + 1]) / lx[t]
            } else {
                0.0
            };
            let survival = lx[t] / l0;
            let discount = technical_rate.mid_month_factor(t as u32);
            WorkingRow {
                month: t as u32,
                integer_age,
                fractional_age: age as f64 + t as f64 / 12.0,
                annual_lx,
                annual_qx,
                lx: lx[t],
                monthly_qx,
                survival,
                discount,
                outstanding: outstanding[t],
                expected_loss: outstanding[t] * survival * monthly_qx * discount,
            }
        })
        .collect();

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mortality::{MortalityRow, Sex};
    use approx::assert_relative_eq;

    fn linear_table() -> MortalityTable {
        // lx drops by 100 each year from 1000
        MortalityTable::new(vec![
            MortalityRow { age: 40, qx: 0.1, lx: 1000.0 },
            MortalityRow { age: 41, qx: 100.0 / 900.0, lx: 900.0 },
            MortalityRow { age: 42, qx: 1.0, lx: 800.0 },
        ])
        .unwrap()
    }

    #[test]
    fn test_interpolates_within_year() {
        let rate = TechnicalRate::new(0.0).unwrap();
        let outstanding = vec![1000.0; 25];
        let rows = build_working_table(&linear_table(), &outstanding, 40, 2, &rate).unwrap();

        assert_eq!(rows.len(), 24);
        assert_relative_eq!(rows[0].lx, 1000.0);
        assert_relative_eq!(rows[6].lx, 950.0, max_relative = 1e-12);
        assert_relative_eq!(rows[12].lx, 900.0);
        assert_relative_eq!(rows[18].lx, 850.0, max_relative = 1e-12);
        assert_eq!(rows[13].integer_age, 41);
        assert_relative_eq!(rows[18].fractional_age, 41.5);
    }

    #[test]
    fn test_monthly_q_is_forward_difference() {
        let rate = TechnicalRate::new(0.0).unwrap();
        let outstanding = vec![500.0; 25];
        let rows = build_working_table(&linear_table(), &outstanding, 40, 2, &rate).unwrap();

        // 100/12 survivors lost per month in both years
        let step = 100.0 / 12.0;
        assert_relative_eq!(rows[0].monthly_qx, step / 1000.0, max_relative = 1e-9);
        assert_relative_eq!(rows[23].monthly_qx, step / (800.0 + step), max_relative = 1e-9);
        assert_relative_eq!(rows[12].survival, 0.9, max_relative = 1e-12);

        let expected = 500.0 * rows[5].survival * rows[5].monthly_qx;
        assert_relative_eq!(rows[5].expected_loss, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_last_year_reaches_table_end() {
        // age + duration lands exactly on the last table row
        let rate = TechnicalRate::new(0.02).unwrap();
        let outstanding = vec![1.0; 13];
        let rows = build_working_table(&linear_table(), &outstanding, 41, 1, &rate).unwrap();

        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|r| r.monthly_qx.is_finite() && r.expected_loss.is_finite()));
        assert_relative_eq!(rows[11].lx, 900.0 - 100.0 * 11.0 / 12.0, max_relative = 1e-12);
    }

    #[test]
    fn test_coverage_miss_fails_fast() {
        let rate = TechnicalRate::new(0.02).unwrap();
        let outstanding = vec![1.0; 25];
        let result = build_working_table(&linear_table(), &outstanding, 41, 2, &rate);

        assert!(matches!(
            result,
            Err(PricingError::AgeOutOfCoverage { age: 43, min_age: 40, max_age: 42 })
        ));

        let result = build_working_table(&linear_table(), &outstanding, 30, 2, &rate);
        assert!(matches!(result, Err(PricingError::AgeOutOfCoverage { age: 30, .. })));
    }

    #[test]
    fn test_outstanding_length_checked() {
        let rate = TechnicalRate::new(0.02).unwrap();
        let table = MortalityTable::iam_2012_basic(Sex::Male);
        let result = build_working_table(&table, &[1.0; 10], 35, 1, &rate);

        assert!(matches!(
            result,
            Err(PricingError::ScheduleLengthMismatch { expected: 13, found: 10 })
        ));
    }

    #[test]
    fn test_extinct_cohort() {
        let table = MortalityTable::new(vec![
            MortalityRow { age: 0, qx: 1.0, lx: 0.0 },
            MortalityRow { age: 1, qx: 1.0, lx: 0.0 },
        ])
        .unwrap();
        let rate = TechnicalRate::new(0.02).unwrap();
        let result = build_working_table(&table, &[1.0; 13], 0, 1, &rate);

        assert!(matches!(result, Err(PricingError::ExtinctCohort { age: 0 })));
    }
}
