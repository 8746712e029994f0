//! Actuarial premium: expected discounted loss on the outstanding principal,
//! spread into a level monthly premium by a survival-weighted annuity factor

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{PricingError, Result};
use crate::loan::{write_schedule_csv, AmortizationSchedule, PricedRow};
use crate::mortality::MortalityTable;
use super::discount::TechnicalRate;
use super::working::{build_working_table, WorkingRow};

/// Premium plus the schedule enriched with premium columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingResult {
    /// Level monthly premium, single premium / annuity factor
    pub monthly_premium: f64,
    /// Sum of expected discounted losses, U
    pub single_premium: f64,
    /// Survival-weighted discounted count of premium payments, a
    pub annuity_factor: f64,
    /// Loan payment of the first installment, rounded to cents
    pub loan_payment: f64,
    pub schedule: Vec<PricedRow>,
}

impl PricingResult {
    /// Loan payment plus premium for installment 1
    pub fn first_total_payment(&self) -> f64 {
        self.schedule
            .get(1)
            .map(|row| row.total_payment)
            .unwrap_or(self.monthly_premium)
    }

    /// Write the enriched schedule as CSV
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_csv_to(file)
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        write_schedule_csv(&self.schedule, writer)
    }
}

/// Pricing engine over a (reduced) mortality table and a technical rate
#[derive(Debug, Clone)]
pub struct ActuarialPricer {
    table: MortalityTable,
    technical_rate: TechnicalRate,
}

impl ActuarialPricer {
    pub fn new(table: MortalityTable, technical_rate: f64) -> Result<Self> {
        Ok(Self {
            table,
            technical_rate: TechnicalRate::new(technical_rate)?,
        })
    }

    pub fn table(&self) -> &MortalityTable {
        &self.table
    }

    pub fn technical_rate(&self) -> TechnicalRate {
        self.technical_rate
    }

    /// Monthly working table for a subscription age over the schedule's term
    pub fn working_table(&self, schedule: &AmortizationSchedule, age: u32) -> Result<Vec<WorkingRow>> {
        build_working_table(
            &self.table,
            &schedule.outstanding(),
            age,
            schedule.duration_years(),
            &self.technical_rate,
        )
    }

    /// Price the cover on `schedule` for a borrower subscribing at `age`
    pub fn price_schedule(&self, schedule: &AmortizationSchedule, age: u32) -> Result<PricingResult> {
        let rows = self.working_table(schedule, age)?;

        let single = single_premium(&rows);
        if !single.is_finite() {
            return Err(PricingError::NonFinite("single premium"));
        }
        let annuity = annuity_factor(&rows, &self.technical_rate);
        if !annuity.is_finite() {
            return Err(PricingError::NonFinite("annuity factor"));
        }
        if annuity == 0.0 {
            return Err(PricingError::ZeroAnnuityFactor);
        }
        let monthly_premium = single / annuity;

        log::debug!(
            "Age {} over {} months: U = {:.6}, a = {:.6}, premium = {:.6}",
            age,
            rows.len(),
            single,
            annuity,
            monthly_premium
        );

        Ok(PricingResult {
            monthly_premium,
            single_premium: single,
            annuity_factor: annuity,
            loan_payment: schedule.first_payment(),
            schedule: schedule.with_premium(monthly_premium),
        })
    }
}

/// U: sum of expected discounted losses
pub fn single_premium(rows: &[WorkingRow]) -> f64 {
    rows.iter().map(|row| row.expected_loss).sum()
}

/// a: survival-weighted sum of start-of-month discount factors
pub fn annuity_factor(rows: &[WorkingRow], technical_rate: &TechnicalRate) -> f64 {
    rows.iter()
        .map(|row| row.survival * technical_rate.annuity_factor_at(row.month))
        .sum()
}

/// Amortization schedule for a fixed-rate loan
pub fn build_schedule(capital: f64, duration_years: u32, loan_rate: f64) -> Result<AmortizationSchedule> {
    AmortizationSchedule::build(capital, duration_years, loan_rate)
}

/// Price a borrower policy end to end.
///
/// Applies `abattement` to `table`, builds the loan schedule and returns the level
/// monthly premium with the enriched schedule. The input table is not modified.
pub fn price(
    table: &MortalityTable,
    capital: f64,
    duration_years: u32,
    loan_rate: f64,
    age: u32,
    technical_rate: f64,
    abattement: f64,
) -> Result<PricingResult> {
    let reduced = table.with_abattement(abattement)?;
    let schedule = build_schedule(capital, duration_years, loan_rate)?;
    ActuarialPricer::new(reduced, technical_rate)?.price_schedule(&schedule, age)
}
