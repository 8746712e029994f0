//! Borrower insurance pricing - monthly death/disability premium on an amortizing loan
//!
//! This library provides:
//! - Mortality tables (built-in IAM 2012 Basic, CSV loading, qx abattement)
//! - Level-payment amortization schedules
//! - Actuarial pricing: expected discounted loss on the outstanding principal,
//!   spread into a level monthly premium
//! - A regression engine trained on synthetic actuarial prices

pub mod error;
pub mod mortality;
pub mod loan;
pub mod pricing;
pub mod config;
pub mod ml;

// Re-export commonly used types
pub use error::PricingError;
pub use mortality::{MortalityTable, Sex};
pub use loan::AmortizationSchedule;
pub use pricing::{price, ActuarialPricer, PricingResult};
pub use config::PricingRequest;
