//! # geojson-pg
//!
//! Ingestion de collections GeoJSON dans PostGIS, tolérante aux erreurs
//! par feature.
//!
//! ## Pipeline
//!
//! Pour chaque fichier : parsing, validation de chaque feature (structure,
//! puis validité géométrique si disponible), connexion avec retry, création
//! idempotente du schéma, insertion en une transaction. Les rejets de
//! validation et les échecs d'insertion sont comptés, jamais fatals.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Ingestion (configuration via .env / DB_*)
//! geojson-pg ingest ./data/ --jobs 4 --report report.json
//!
//! # Validation seule, sans base
//! geojson-pg check ./data/parcels.geojson
//!
//! # Test de connexion
//! geojson-pg health
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod store;

pub use config::{ConnectionSettings, DatabaseConfig};
pub use error::{IngestError, StoreError};
pub use pipeline::{IngestionResult, Ingestor, RetryPolicy};
pub use store::{Connection, Connector, NewRow, PgConnector};
