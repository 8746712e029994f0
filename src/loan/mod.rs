//! Loan amortization

mod schedule;

pub use schedule::{level_payment, round_cents, write_schedule_csv, AmortizationSchedule, PricedRow, ScheduleRow};
