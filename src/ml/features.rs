//! Feature ordering shared by training and prediction

use serde::{Deserialize, Serialize};

use crate::config::PricingRequest;
use super::error::{ModelError, Result};

/// Model inputs in training order
pub const FEATURE_NAMES: [&str; 5] = [
    "age_souscription",
    "duree",
    "capital_emprunte",
    "taux_interet_annuel",
    "taux_technique_annuel",
];

/// The default feature list as owned strings
pub fn default_features() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Loan inputs the regression engine prices from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanFeatures {
    pub age_souscription: u32,
    pub duree: u32,
    pub capital_emprunte: f64,
    pub taux_interet_annuel: f64,
    pub taux_technique_annuel: f64,
}

impl From<&PricingRequest> for LoanFeatures {
    fn from(request: &PricingRequest) -> Self {
        Self {
            age_souscription: request.age,
            duree: request.duration_years,
            capital_emprunte: request.capital,
            taux_interet_annuel: request.loan_rate,
            taux_technique_annuel: request.technical_rate,
        }
    }
}

impl LoanFeatures {
    /// Value of a named feature
    pub fn value(&self, name: &str) -> Option<f64> {
        match name {
            "age_souscription" => Some(self.age_souscription as f64),
            "duree" => Some(self.duree as f64),
            "capital_emprunte" => Some(self.capital_emprunte),
            "taux_interet_annuel" => Some(self.taux_interet_annuel),
            "taux_technique_annuel" => Some(self.taux_technique_annuel),
            _ => None,
        }
    }

    /// Feature vector in the declared order
    pub fn ordered<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<f64>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.value(name)
                    .ok_or_else(|| ModelError::UnknownFeature(name.to_string()))
            })
            .collect()
    }

    /// Feature vector in `FEATURE_NAMES` order
    pub fn to_vector(&self) -> [f64; 5] {
        [
            self.age_souscription as f64,
            self.duree as f64,
            self.capital_emprunte,
            self.taux_interet_annuel,
            self.taux_technique_annuel,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loan() -> LoanFeatures {
        LoanFeatures {
            age_souscription: 35,
            duree: 20,
            capital_emprunte: 200_000.0,
            taux_interet_annuel: 0.035,
            taux_technique_annuel: 0.02,
        }
    }

    #[test]
    fn test_default_order_matches_vector() {
        let loan = loan();
        let ordered = loan.ordered(&FEATURE_NAMES).unwrap();
        assert_eq!(ordered, loan.to_vector().to_vec());
        assert_eq!(default_features().len(), 5);
    }

    #[test]
    fn test_custom_order() {
        let ordered = loan().ordered(&["taux_technique_annuel", "age_souscription"]).unwrap();
        assert_eq!(ordered, vec![0.02, 35.0]);
    }

    #[test]
    fn test_from_request() {
        let features = LoanFeatures::from(&PricingRequest::default());
        assert_eq!(features, loan());
    }

    #[test]
    fn test_unknown_feature() {
        match loan().ordered(&["duree", "sexe"]) {
            Err(ModelError::UnknownFeature(name)) => assert_eq!(name, "sexe"),
            other => panic!("expected unknown feature, got {:?}", other),
        }
    }
}
