//! Pipeline d'ingestion d'un fichier GeoJSON
//!
//! chargement → forme de la collection → validation de chaque feature →
//! connexion (avec retry) → schéma → insertion en une transaction.

pub mod connection;
pub mod insert;
pub mod result;

use std::path::{Path, PathBuf};
use std::time::Instant;

use geofeature::{FeatureCollection, Partition, Validator};
use tracing::{info, instrument, warn};

use crate::error::IngestError;
use crate::store::{Connection, Connector};

pub use connection::{acquire, RetryPolicy};
pub use insert::{display_name, insert_all};
pub use result::IngestionResult;

/// Orchestrateur d'ingestion
///
/// Sans état entre deux appels : un même `Ingestor` peut traiter plusieurs
/// fichiers en parallèle si le `Connector` le permet.
pub struct Ingestor<C> {
    connector: C,
    validator: Validator,
    retry: RetryPolicy,
}

impl<C: Connector> Ingestor<C> {
    pub fn new(connector: C, validator: Validator) -> Self {
        Self {
            connector,
            validator,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Ingère un fichier GeoJSON
    ///
    /// Aucune connexion n'est ouverte si le fichier ne contient aucune feature
    /// valide. La connexion est rendue sur tous les chemins de sortie.
    ///
    /// # Errors
    ///
    /// Erreurs fatales uniquement (fichier, connexion, schéma, transaction) ;
    /// les rejets par feature sont dans le résultat.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn ingest(&self, path: &Path) -> Result<IngestionResult, IngestError> {
        let start = Instant::now();

        let collection = load(path.to_path_buf()).await?;
        if collection.is_empty() {
            info!("No features in collection");
            return Ok(IngestionResult::default());
        }

        let Partition { accepted, rejected } = self.validator.partition(collection.features);
        let validation_failures: Vec<String> = rejected.into_iter().map(|r| r.reason).collect();

        if accepted.is_empty() {
            warn!(
                rejected = validation_failures.len(),
                "No valid features, nothing to insert"
            );
            return Ok(IngestionResult {
                validation_failures,
                ..Default::default()
            });
        }

        let mut connection = acquire(&self.connector, &self.retry).await?;
        connection
            .ensure_schema()
            .await
            .map_err(IngestError::Schema)?;

        let mut result = insert_all(&mut connection, &accepted).await?;
        result.validation_failures = validation_failures;

        info!(
            inserted = result.inserted,
            skipped = result.skipped,
            rejected = result.validation_failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "File ingested"
        );
        Ok(result)
    }

    /// Ouvre une connexion et exécute une requête triviale
    pub async fn health_check(&self) -> Result<(), IngestError> {
        let mut connection = acquire(&self.connector, &self.retry).await?;
        connection
            .ping()
            .await
            .map_err(|source| IngestError::Connection {
                attempts: 1,
                source,
            })
    }
}

/// Lecture et parsing hors du runtime async
async fn load(path: PathBuf) -> Result<FeatureCollection, IngestError> {
    let display = path.clone();
    tokio::task::spawn_blocking(move || geofeature::load(&path))
        .await
        .map_err(|e| IngestError::Io {
            path: display,
            source: std::io::Error::other(e),
        })?
        .map_err(IngestError::from)
}
