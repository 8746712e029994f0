//! Regression engine: a premium model trained on synthetic actuarial prices
//!
//! Synthetic loans are priced by the actuarial engine, a random forest (or a linear
//! baseline) is fitted on them and saved with its feature order and parameters, then
//! reloaded to price new requests.

mod compare;
mod dataset;
mod error;
mod features;
mod forest;
mod linear;
mod metrics;
mod model;
mod pack;
mod train;

pub use compare::{compare, EngineComparison};
pub use dataset::{
    generate_synthetic, Dataset, DatasetRow, SyntheticConfig, DEFAULT_SEED, DEFAULT_TEST_SIZE, TARGET_COLUMN,
};
pub use error::{ModelError, Result};
pub use features::{default_features, LoanFeatures, FEATURE_NAMES};
pub use forest::{ForestParams, Node, RandomForest, RegressionTree};
pub use linear::{LinearRegression, PremiumModel};
pub use metrics::{mean_absolute_error, r2_score, root_mean_squared_error, TrainingMetrics};
pub use model::{ModelSpec, Regressor};
pub use pack::{load_model, ModelPack, ModelQuote};
pub use train::fit_and_eval;
