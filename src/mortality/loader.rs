//! CSV mortality table loader
//!
//! Expects a header row containing `Age`, `qx` and `lx` (any order, extra columns ignored).

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{Reader, StringRecord};

use crate::error::{PricingError, Result};
use super::{MortalityRow, MortalityTable};

/// Columns every mortality table must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["Age", "qx", "lx"];

/// Load a mortality table from a CSV file
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<MortalityTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = load_table_from_reader(file)?;
    log::debug!(
        "Loaded mortality table {} (ages {}..={})",
        path.display(),
        table.min_age(),
        table.max_age()
    );
    Ok(table)
}

/// Load a mortality table from any reader
pub fn load_table_from_reader<R: Read>(reader: R) -> Result<MortalityTable> {
    let mut csv_reader = Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let [age_idx, qx_idx, lx_idx] = locate_columns(&headers)?;

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let age = parse_age(field(&record, age_idx), line)?;
        let qx = parse_float(field(&record, qx_idx), "qx", line)?;
        let lx = parse_float(field(&record, lx_idx), "lx", line)?;
        rows.push(MortalityRow { age, qx, lx });
    }

    rows.sort_by_key(|row| row.age);
    let table = MortalityTable::new(rows)?;

    if !table.is_terminated() {
        log::warn!(
            "Terminal qx at age {} is not 1.0; abattement will force it",
            table.max_age()
        );
    }

    Ok(table)
}

/// Load a table and apply the qx reduction in one step
pub fn load_table_with_abattement<P: AsRef<Path>>(path: P, taux_abattement: f64) -> Result<MortalityTable> {
    load_table(path)?.with_abattement(taux_abattement)
}

fn locate_columns(headers: &StringRecord) -> Result<[usize; 3]> {
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);

    let found: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|name| position(name)).collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(&found)
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PricingError::MissingColumns(missing));
    }

    match found.as_slice() {
        [Some(age), Some(qx), Some(lx)] => Ok([*age, *qx, *lx]),
        _ => Err(PricingError::MissingColumns(
            REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect(),
        )),
    }
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("").trim()
}

fn parse_age(raw: &str, line: u64) -> Result<u32> {
    if let Ok(age) = raw.parse::<u32>() {
        return Ok(age);
    }
    // Spreadsheet exports often write integer ages as "35.0"
    match raw.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 => Ok(value as u32),
        _ => Err(PricingError::MalformedTable {
            line,
            reason: format!("Age `{raw}` is not a non-negative integer"),
        }),
    }
}

fn parse_float(raw: &str, column: &str, line: u64) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| PricingError::MalformedTable {
        line,
        reason: format!("{column} `{raw}` is not a number"),
    })
}
