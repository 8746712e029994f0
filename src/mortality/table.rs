//! Annual mortality table with qx/lx columns and the flat qx reduction ("abattement")
//!
//! Rows are stored densely by age, so lookups are index arithmetic rather than joins.
//! Invariant after construction: `lx[i] = lx[i-1] * (1 - qx[i-1])` and the last row
//! carries `qx = 1.0` (full extinction).

use crate::error::{PricingError, Result};
use super::iam;

/// Default cohort size at the youngest age
pub const DEFAULT_RADIX: f64 = 100_000.0;

/// One age of the table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MortalityRow {
    pub age: u32,
    /// Probability of dying between `age` and `age + 1`
    pub qx: f64,
    /// Survivors at `age` out of the radix
    pub lx: f64,
}

/// Sex column to read from a two-sex base table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Female,
    Male,
}

impl std::str::FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "female" => Ok(Sex::Female),
            "m" | "male" => Ok(Sex::Male),
            other => Err(format!("unknown sex `{other}`, expected female or male")),
        }
    }
}

/// Age-indexed mortality table
#[derive(Debug, Clone, PartialEq)]
pub struct MortalityTable {
    rows: Vec<MortalityRow>,
}

impl MortalityTable {
    /// Create a table from rows sorted by age.
    ///
    /// Rows are taken as-is (lx is not recomputed). Fails on an empty table,
    /// gaps in the age sequence, qx outside [0, 1] or negative lx.
    pub fn new(rows: Vec<MortalityRow>) -> Result<Self> {
        let first = rows.first().ok_or(PricingError::EmptyTable)?;
        let min_age = first.age;

        for (offset, row) in rows.iter().enumerate() {
            let expected = min_age + offset as u32;
            if row.age != expected {
                return Err(PricingError::NonContiguousAges {
                    expected,
                    found: row.age,
                });
            }
            if !(0.0..=1.0).contains(&row.qx) {
                return Err(PricingError::MalformedTable {
                    line: offset as u64 + 1,
                    reason: format!("qx {} at age {} is outside [0, 1]", row.qx, row.age),
                });
            }
            if !(row.lx >= 0.0) || !row.lx.is_finite() {
                return Err(PricingError::MalformedTable {
                    line: offset as u64 + 1,
                    reason: format!("lx {} at age {} must be a non-negative number", row.lx, row.age),
                });
            }
        }

        Ok(Self { rows })
    }

    /// Build a table from a qx column starting at `min_age`.
    ///
    /// lx follows the recurrence from `radix` and the terminal qx is forced to 1.0.
    pub fn from_qx(min_age: u32, qx: &[f64], radix: f64) -> Result<Self> {
        if qx.is_empty() {
            return Err(PricingError::EmptyTable);
        }
        if !(radix > 0.0) || !radix.is_finite() {
            return Err(PricingError::invalid("radix", format!("must be positive, got {radix}")));
        }

        let mut rows = Vec::with_capacity(qx.len());
        let mut lx = radix;
        for (offset, &q) in qx.iter().enumerate() {
            rows.push(MortalityRow {
                age: min_age + offset as u32,
                qx: q,
                lx,
            });
            lx *= 1.0 - q;
        }
        if let Some(last) = rows.last_mut() {
            last.qx = 1.0;
        }

        Self::new(rows)
    }

    /// IAM 2012 Basic annual rates for ages 0-120, radix 100 000
    pub fn iam_2012_basic(sex: Sex) -> Self {
        let qx: Vec<f64> = iam::IAM_2012_BASIC
            .iter()
            .map(|&(female, male)| match sex {
                Sex::Female => female,
                Sex::Male => male,
            })
            .collect();

        let mut rows = Vec::with_capacity(qx.len());
        let mut lx = DEFAULT_RADIX;
        for (age, &q) in qx.iter().enumerate() {
            rows.push(MortalityRow { age: age as u32, qx: q, lx });
            lx *= 1.0 - q;
        }
        if let Some(last) = rows.last_mut() {
            last.qx = 1.0;
        }

        Self { rows }
    }

    /// Apply a flat reduction to qx and rebuild lx.
    ///
    /// `qx_new = qx * (1 - rate)` for every row but the last, whose qx becomes 1.0.
    /// lx is then recomputed in ascending age order from the unchanged radix `lx[0]`.
    /// The receiver is left untouched.
    pub fn with_abattement(&self, rate: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(PricingError::invalid(
                "taux_abattement",
                format!("must lie in [0, 1), got {rate}"),
            ));
        }

        let mut rows = self.rows.clone();
        for row in rows.iter_mut() {
            row.qx *= 1.0 - rate;
        }
        if let Some(last) = rows.last_mut() {
            last.qx = 1.0;
        }
        for i in 1..rows.len() {
            rows[i].lx = rows[i - 1].lx * (1.0 - rows[i - 1].qx);
        }

        log::debug!(
            "Applied abattement {:.4} to table {}..={} (radix {})",
            rate,
            self.min_age(),
            self.max_age(),
            self.radix()
        );

        Ok(Self { rows })
    }

    /// Row for an age, or None outside the table
    pub fn lookup(&self, age: u32) -> Option<&MortalityRow> {
        let offset = age.checked_sub(self.min_age())?;
        self.rows.get(offset as usize)
    }

    /// Row for an age, failing with a coverage error outside the table
    pub fn require(&self, age: u32) -> Result<&MortalityRow> {
        self.lookup(age).ok_or(PricingError::AgeOutOfCoverage {
            age,
            min_age: self.min_age(),
            max_age: self.max_age(),
        })
    }

    pub fn lx_at(&self, age: u32) -> Option<f64> {
        self.lookup(age).map(|row| row.lx)
    }

    pub fn qx_at(&self, age: u32) -> Option<f64> {
        self.lookup(age).map(|row| row.qx)
    }

    pub fn min_age(&self) -> u32 {
        self.rows[0].age
    }

    pub fn max_age(&self) -> u32 {
        self.rows[self.rows.len() - 1].age
    }

    /// Cohort size at the youngest age
    pub fn radix(&self) -> f64 {
        self.rows[0].lx
    }

    pub fn rows(&self) -> &[MortalityRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the last row forces full extinction
    pub fn is_terminated(&self) -> bool {
        self.rows[self.rows.len() - 1].qx == 1.0
    }
}
