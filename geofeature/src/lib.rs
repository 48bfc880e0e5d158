//! # geofeature
//!
//! Chargement et validation de FeatureCollections GeoJSON, feature par feature.
//!
//! ## Features
//!
//! - Chargement intégral du document avec erreurs localisées (ligne/colonne)
//! - Contrôle de forme de la collection (fatal pour le fichier)
//! - Validation indépendante de chaque feature (jamais fatale pour le lot)
//! - Validité topologique OGC via `geo` (feature `validity`, activée par défaut)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geofeature::Validator;
//! use std::path::Path;
//!
//! let collection = geofeature::load(Path::new("parcels.geojson"))?;
//! let partition = Validator::detect().partition(collection.features);
//! println!("{} accepted, {} rejected", partition.accepted.len(), partition.rejected.len());
//! ```

pub mod document;
pub mod error;
pub mod types;
pub mod validate;
#[cfg(feature = "validity")]
pub mod validity;

pub use document::load;
pub use error::{DocumentError, ValidationError};
pub use types::{Feature, FeatureCollection, Partition, Rejection, ValidationOutcome};
pub use validate::Validator;
