//! Side-by-side view of the actuarial and regression premiums

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EngineComparison {
    pub actuarial: f64,
    pub model: f64,
    /// model - actuarial
    pub delta: f64,
    /// delta as a percentage of the actuarial premium, 0 when that premium is 0
    pub delta_pct: f64,
}

pub fn compare(actuarial_premium: f64, model_premium: f64) -> EngineComparison {
    let delta = model_premium - actuarial_premium;
    let delta_pct = if actuarial_premium != 0.0 {
        delta / actuarial_premium * 100.0
    } else {
        0.0
    };
    EngineComparison {
        actuarial: actuarial_premium,
        model: model_premium,
        delta,
        delta_pct,
    }
}
