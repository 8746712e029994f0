//! Actuarial pricing of borrower death/disability cover
//!
//! The annual table is interpolated to monthly survivors, monthly death probabilities
//! are applied to the outstanding principal, losses are discounted at the technical
//! rate and summed into a single premium, then spread into a level monthly premium
//! with a survival-weighted annuity factor.

mod discount;
mod pricer;
mod working;

pub use discount::TechnicalRate;
pub use pricer::{annuity_factor, build_schedule, price, single_premium, ActuarialPricer, PricingResult};
pub use working::{build_working_table, WorkingRow};
