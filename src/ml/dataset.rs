//! Training datasets: CSV I/O, seeded train/test split and synthetic generation
//!
//! A dataset row is the five loan features plus `target`, the actuarial monthly premium.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::Reader;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::loan::AmortizationSchedule;
use crate::mortality::MortalityTable;
use crate::pricing::ActuarialPricer;
use super::error::{ModelError, Result};
use super::features::{LoanFeatures, FEATURE_NAMES};

/// Name of the label column
pub const TARGET_COLUMN: &str = "target";

/// Default share of rows held out for testing
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Default seed for splits and synthetic sampling
pub const DEFAULT_SEED: u64 = 42;

/// One labelled observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(flatten)]
    pub loan: LoanFeatures,
    pub target: f64,
}

/// Labelled observations with a source label
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub rows: Vec<DatasetRow>,
    pub label: String,
}

impl Dataset {
    pub fn new(rows: Vec<DatasetRow>, label: impl Into<String>) -> Self {
        Self {
            rows,
            label: label.into(),
        }
    }

    /// Load a dataset from CSV, labelled with the file name
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        let dataset = Self::from_reader(file, label)?;
        log::info!("Loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Load a dataset from any CSV reader.
    ///
    /// Every missing feature or target column is reported at once.
    pub fn from_reader<R: Read>(reader: R, label: impl Into<String>) -> Result<Self> {
        let mut csv_reader = Reader::from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let missing: Vec<String> = FEATURE_NAMES
            .iter()
            .chain(std::iter::once(&TARGET_COLUMN))
            .filter(|name| !headers.iter().any(|h| h == **name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::MissingColumns(missing));
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.deserialize::<Flat>(Some(&headers))?.into());
        }

        Ok(Self::new(rows, label))
    }

    /// Write the dataset as CSV with the feature columns then `target`
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.write_csv_to(File::create(path)?)
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        for row in &self.rows {
            csv_writer.serialize(Flat::from(*row))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature matrix in `FEATURE_NAMES` order
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(|row| row.loan.to_vector().to_vec()).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.target).collect()
    }

    /// Shuffle with a seeded RNG and hold out `ceil(test_size * n)` rows for testing.
    ///
    /// Returns `(train, test)`.
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(test_size > 0.0 && test_size < 1.0) {
            return Err(ModelError::InvalidParameter {
                name: "test_size",
                reason: format!("must lie in (0, 1), got {test_size}"),
            });
        }
        if self.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let n_test = ((test_size * self.len() as f64).ceil() as usize).min(self.len());
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));

        let (test_idx, train_idx) = indices.split_at(n_test);
        let pick = |idx: &[usize]| idx.iter().map(|&i| self.rows[i]).collect::<Vec<_>>();

        Ok((
            Dataset::new(pick(train_idx), self.label.clone()),
            Dataset::new(pick(test_idx), self.label.clone()),
        ))
    }
}

/// CSV shape of a row; csv cannot (de)serialize flattened structs.
#[derive(Debug, Serialize, Deserialize)]
struct Flat {
    age_souscription: u32,
    duree: u32,
    capital_emprunte: f64,
    taux_interet_annuel: f64,
    taux_technique_annuel: f64,
    target: f64,
}

impl From<Flat> for DatasetRow {
    fn from(flat: Flat) -> Self {
        DatasetRow {
            loan: LoanFeatures {
                age_souscription: flat.age_souscription,
                duree: flat.duree,
                capital_emprunte: flat.capital_emprunte,
                taux_interet_annuel: flat.taux_interet_annuel,
                taux_technique_annuel: flat.taux_technique_annuel,
            },
            target: flat.target,
        }
    }
}

impl From<DatasetRow> for Flat {
    fn from(row: DatasetRow) -> Self {
        Flat {
            age_souscription: row.loan.age_souscription,
            duree: row.loan.duree,
            capital_emprunte: row.loan.capital_emprunte,
            taux_interet_annuel: row.loan.taux_interet_annuel,
            taux_technique_annuel: row.loan.taux_technique_annuel,
            target: row.target,
        }
    }
}

/// Sampling ranges for synthetic loans
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub rows: usize,
    pub seed: u64,
    pub ages: (u32, u32),
    pub durations: (u32, u32),
    pub capital: (f64, f64),
    pub loan_rate: (f64, f64),
    pub technical_rate: (f64, f64),
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            rows: 40_000,
            seed: DEFAULT_SEED,
            ages: (18, 65),
            durations: (5, 30),
            capital: (10_000.0, 500_000.0),
            loan_rate: (0.005, 0.06),
            technical_rate: (0.0, 0.04),
        }
    }
}

/// Sample loans and label each with its actuarial premium.
///
/// `table` should already carry the desired abattement. Sampling is sequential so the
/// output depends only on the seed; pricing runs in parallel.
pub fn generate_synthetic(table: &MortalityTable, config: &SyntheticConfig) -> Result<Dataset> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let loans: Vec<LoanFeatures> = (0..config.rows)
        .map(|_| LoanFeatures {
            age_souscription: rng.random_range(config.ages.0..=config.ages.1),
            duree: rng.random_range(config.durations.0..=config.durations.1),
            capital_emprunte: rng.random_range(config.capital.0..=config.capital.1),
            taux_interet_annuel: rng.random_range(config.loan_rate.0..=config.loan_rate.1),
            taux_technique_annuel: rng.random_range(config.technical_rate.0..=config.technical_rate.1),
        })
        .collect();

    let rows = loans
        .par_iter()
        .map(|loan| -> Result<DatasetRow> {
            let schedule = AmortizationSchedule::build(loan.capital_emprunte, loan.duree, loan.taux_interet_annuel)?;
            let pricer = ActuarialPricer::new(table.clone(), loan.taux_technique_annuel)?;
            let result = pricer.price_schedule(&schedule, loan.age_souscription)?;
            Ok(DatasetRow {
                loan: *loan,
                target: result.monthly_premium,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    log::info!("Generated {} synthetic rows (seed {})", rows.len(), config.seed);
    Ok(Dataset::new(rows, format!("synthetic_{}_seed{}", config.rows, config.seed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mortality::Sex;

    fn reduced_table() -> MortalityTable {
        MortalityTable::iam_2012_basic(Sex::Male).with_abattement(0.35).unwrap()
    }

    fn small_config(rows: usize, seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            rows,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_synthetic_is_deterministic() {
        let table = reduced_table();
        let a = generate_synthetic(&table, &small_config(25, 7)).unwrap();
        let b = generate_synthetic(&table, &small_config(25, 7)).unwrap();
        let c = generate_synthetic(&table, &small_config(25, 8)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.rows, c.rows);
    }

    #[test]
    fn test_synthetic_rows_within_ranges() {
        let config = small_config(50, 1);
        let dataset = generate_synthetic(&reduced_table(), &config).unwrap();

        assert_eq!(dataset.len(), 50);
        for row in &dataset.rows {
            assert!((18..=65).contains(&row.loan.age_souscription));
            assert!((5..=30).contains(&row.loan.duree));
            assert!(row.loan.capital_emprunte >= 10_000.0 && row.loan.capital_emprunte <= 500_000.0);
            assert!(row.target > 0.0 && row.target.is_finite());
        }
    }

    #[test]
    fn test_csv_round_trip_keeps_column_order() {
        let dataset = generate_synthetic(&reduced_table(), &small_config(5, 3)).unwrap();
        let mut buffer = Vec::new();
        dataset.write_csv_to(&mut buffer).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "age_souscription,duree,capital_emprunte,taux_interet_annuel,taux_technique_annuel,target"
        );

        let reloaded = Dataset::from_reader(buffer.as_slice(), "mem").unwrap();
        assert_eq!(reloaded.len(), 5);
        assert_eq!(reloaded.rows[0].loan.age_souscription, dataset.rows[0].loan.age_souscription);
    }

    #[test]
    fn test_missing_columns_listed() {
        let csv = "age_souscription,duree,capital_emprunte\n30,10,1000\n";
        match Dataset::from_reader(csv.as_bytes(), "bad") {
            Err(ModelError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["taux_interet_annuel", "taux_technique_annuel", "target"]);
            }
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_columns_and_order_tolerated() {
        let csv = "target,id,taux_technique_annuel,taux_interet_annuel,capital_emprunte,duree,age_souscription\n\
                   12.5,1,0.02,0.03,100000,15,40\n";
        let dataset = Dataset::from_reader(csv.as_bytes(), "reordered").unwrap();
        assert_eq!(dataset.rows[0].loan.duree, 15);
        assert_eq!(dataset.rows[0].target, 12.5);
    }

    #[test]
    fn test_train_test_split() {
        let dataset = generate_synthetic(&reduced_table(), &small_config(11, 5)).unwrap();
        let (train, test) = dataset.train_test_split(0.2, 42).unwrap();

        // ceil(0.2 * 11) = 3
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);

        let (train2, test2) = dataset.train_test_split(0.2, 42).unwrap();
        assert_eq!(train, train2);
        assert_eq!(test, test2);

        assert!(dataset.train_test_split(1.0, 42).is_err());
        assert!(Dataset::new(vec![], "empty").train_test_split(0.2, 42).is_err());
    }
}
