//! Error types for the actuarial pricing core

use thiserror::Error;

/// Errors raised while loading mortality tables, building schedules or pricing.
///
/// Every variant aborts the pricing call that raised it; no partial result is returned.
#[derive(Debug, Error)]
pub enum PricingError {
    /// One or more of the `Age`, `qx`, `lx` columns is absent.
    #[error("mortality table is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("mortality table has no rows")]
    EmptyTable,

    /// Ages must form a dense ascending range.
    #[error("mortality table ages must be contiguous: expected age {expected}, found {found}")]
    NonContiguousAges { expected: u32, found: u32 },

    /// A row could not be parsed or holds an out-of-range value.
    #[error("malformed mortality table at line {line}: {reason}")]
    MalformedTable { line: u64, reason: String },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The pricing horizon needs an age the table does not cover.
    #[error("age {age} is outside mortality table coverage {min_age}..={max_age}")]
    AgeOutOfCoverage { age: u32, min_age: u32, max_age: u32 },

    /// No survivors at the subscription age, so survival ratios are undefined.
    #[error("no survivors at subscription age {age}")]
    ExtinctCohort { age: u32 },

    #[error("outstanding principal column has {found} entries, expected {expected}")]
    ScheduleLengthMismatch { expected: usize, found: usize },

    #[error("annuity factor is zero; single premium cannot be spread monthly")]
    ZeroAnnuityFactor,

    /// An intermediate quantity overflowed or became NaN.
    #[error("non-finite value computed for {0}")]
    NonFinite(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PricingError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PricingError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PricingError>;
