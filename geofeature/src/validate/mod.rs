//! Validation des features
//!
//! Deux variantes, choisies une fois au démarrage :
//! - `StructuralOnly` : contrôles de structure uniquement
//! - `StructuralPlusGeometric` : structure + validité OGC (feature `validity`)

pub mod structure;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::ValidationError;
use crate::types::{Feature, Partition, Rejection, ValidationOutcome};

/// Validateur de features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validator {
    /// Contrôles structurels seuls (oracle géométrique indisponible ou désactivé)
    StructuralOnly,
    /// Contrôles structurels puis validité topologique de la géométrie
    #[cfg(feature = "validity")]
    StructuralPlusGeometric,
}

impl Validator {
    /// Sélectionne la variante la plus complète disponible
    ///
    /// L'absence d'oracle géométrique est signalée ici, une seule fois.
    pub fn detect() -> Self {
        match Self::geometric() {
            Some(validator) => {
                info!("Geometry validity checks enabled");
                validator
            }
            None => {
                warn!("Geometry validity checks unavailable, falling back to structural validation");
                Self::StructuralOnly
            }
        }
    }

    /// Variante géométrique, si compilée
    pub fn geometric() -> Option<Self> {
        #[cfg(feature = "validity")]
        {
            Some(Self::StructuralPlusGeometric)
        }
        #[cfg(not(feature = "validity"))]
        {
            None
        }
    }

    /// Vrai si la variante vérifie la validité des géométries
    pub fn is_geometric(&self) -> bool {
        !matches!(self, Self::StructuralOnly)
    }

    /// Valide une feature. Ne modifie jamais son contenu.
    pub fn validate(&self, feature: Value, index: usize) -> Result<Feature, ValidationError> {
        let object = structure::check(feature, index)?;

        match self {
            Self::StructuralOnly => {}
            #[cfg(feature = "validity")]
            Self::StructuralPlusGeometric => {
                if let Some(geometry) = object.get("geometry") {
                    crate::validity::check_geometry(geometry, index)?;
                }
            }
        }

        Ok(Feature::new(object))
    }

    /// Valide une feature et produit un `ValidationOutcome`
    pub fn outcome(&self, feature: Value, index: usize) -> ValidationOutcome {
        match self.validate(feature, index) {
            Ok(feature) => ValidationOutcome::Accepted(feature),
            Err(e) => {
                warn!(index, reason = %e, "Feature validation failed");
                ValidationOutcome::Rejected(Rejection {
                    index,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Valide toutes les features, dans l'ordre, sans jamais s'arrêter
    pub fn partition(&self, features: Vec<Value>) -> Partition {
        features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| self.outcome(feature, index))
            .collect()
    }
}
