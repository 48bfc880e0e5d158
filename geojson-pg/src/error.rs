//! Erreurs du pipeline d'ingestion
//!
//! Les erreurs par feature (validation, insertion) ne remontent jamais ici :
//! elles sont consignées dans l'`IngestionResult`. `IngestError` ne couvre
//! que les échecs fataux pour un fichier entier.

use std::path::PathBuf;

use geofeature::DocumentError;
use thiserror::Error;

/// Erreur côté base (pool, PostgreSQL, ou implémentation du store)
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("{0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Connexion déjà rendue
    #[error("connection already released")]
    Released,

    #[error("{0}")]
    Backend(String),
}

/// Échec fatal d'un appel d'ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    /// Configuration incomplète ou invalide (pas de retry)
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Connexion impossible après épuisement des tentatives
    #[error("Failed to connect to database after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("GeoJSON file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// JSON valide mais pas une FeatureCollection
    #[error("Invalid GeoJSON structure: {0}")]
    Shape(String),

    #[error("Failed to ensure schema: {0}")]
    Schema(#[source] StoreError),

    #[error("Failed to begin transaction: {0}")]
    Transaction(#[source] StoreError),

    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] StoreError),
}

impl IngestError {
    /// Libellé stable pour les rapports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Connection { .. } => "connection",
            Self::NotFound(_) => "not_found",
            Self::Io { .. } => "io",
            Self::Parse { .. } => "parse",
            Self::Shape(_) => "shape",
            Self::Schema(_) => "schema",
            Self::Transaction(_) => "transaction",
            Self::Commit(_) => "commit",
        }
    }
}

impl From<DocumentError> for IngestError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound(path) => Self::NotFound(path),
            DocumentError::Io { path, source } => Self::Io { path, source },
            DocumentError::Parse {
                line,
                column,
                message,
            } => Self::Parse {
                line,
                column,
                message,
            },
            DocumentError::Shape(reason) => Self::Shape(reason),
        }
    }
}
