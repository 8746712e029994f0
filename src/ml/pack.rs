//! Model persistence: a fitted model with its feature ordering and scores

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PricingRequest;
use crate::loan::{write_schedule_csv, AmortizationSchedule, PricedRow};
use super::error::{ModelError, Result};
use super::features::{default_features, LoanFeatures};
use super::linear::{LinearRegression, PremiumModel};
use super::metrics::TrainingMetrics;
use super::model::Regressor;

/// Saved model artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPack {
    pub model: Regressor,
    /// Feature order the model was trained on
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Hyper-parameters the model was trained with
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub metrics: Option<TrainingMetrics>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

fn default_model_name() -> String {
    "LinearRegression".to_string()
}

/// A pack file, or a bare model written without its metadata
#[derive(Deserialize)]
#[serde(untagged)]
enum Artifact {
    Pack(ModelPack),
    Bare(LinearRegression),
}

impl ModelPack {
    pub fn new(model: impl Into<Regressor>, metrics: Option<TrainingMetrics>) -> Self {
        let model = model.into();
        Self {
            model_name: model.name().to_string(),
            params: model.params(),
            model,
            features: default_features(),
            metrics,
            saved_at: Some(Utc::now()),
        }
    }

    /// Write the pack as JSON, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        log::info!("Saved {} to {}", self.model_name, path.display());
        Ok(())
    }

    /// Predict from features already in `self.features` order
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        self.model.predict(features)
    }

    /// Predict the premium of a loan, ordering its features as declared in the pack
    pub fn predict_loan(&self, loan: &LoanFeatures) -> Result<f64> {
        let features = loan.ordered(&self.features)?;
        self.model.predict(&features)
    }

    /// Price a request with the model and attach the premium to its loan schedule
    pub fn quote(&self, request: &PricingRequest) -> Result<ModelQuote> {
        let schedule =
            AmortizationSchedule::build(request.capital, request.duration_years, request.loan_rate)?;
        let monthly_premium = self.predict_loan(&LoanFeatures::from(request))?;
        Ok(ModelQuote {
            monthly_premium,
            loan_payment: schedule.first_payment(),
            schedule: schedule.with_premium(monthly_premium),
        })
    }
}

/// Model premium with the loan schedule it applies to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelQuote {
    pub monthly_premium: f64,
    /// Loan payment of the first installment, rounded to cents
    pub loan_payment: f64,
    pub schedule: Vec<PricedRow>,
}

impl ModelQuote {
    pub fn first_total_payment(&self) -> f64 {
        self.loan_payment + self.monthly_premium
    }

    /// Write the enriched schedule as CSV, same columns as the actuarial export
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv_to(File::create(path)?)
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<()> {
        write_schedule_csv(&self.schedule, writer)?;
        Ok(())
    }
}

/// Load a model artifact from `path`.
///
/// Accepts a full pack or a bare model; a bare model or a pack without a feature
/// list gets the default feature order.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<ModelPack> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ModelError::ArtifactNotFound(path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut pack = match serde_json::from_reader::<_, Artifact>(reader)? {
        Artifact::Pack(pack) => pack,
        Artifact::Bare(model) => ModelPack {
            model_name: model.name().to_string(),
            model: model.into(),
            features: default_features(),
            params: BTreeMap::new(),
            metrics: None,
            saved_at: None,
        },
    };
    if pack.features.is_empty() {
        pack.features = default_features();
    }
    if pack.features.len() != pack.model.n_features() {
        return Err(ModelError::FeatureCountMismatch {
            expected: pack.model.n_features(),
            found: pack.features.len(),
        });
    }

    log::debug!("Loaded {} with features {:?}", pack.model_name, pack.features);
    Ok(pack)
}
