//! Accès au stockage spatial
//!
//! Le pipeline ne connaît que ces deux traits : `Connector` ouvre une
//! connexion (une seule tentative, le retry est géré au-dessus), et
//! `Connection` expose les quelques opérations dont l'ingestion a besoin.
//! L'implémentation PostGIS vit dans `postgres`, le pool dans `pool`.

pub mod pool;
pub mod postgres;

use async_trait::async_trait;

use crate::error::StoreError;

pub use pool::{create_pool, PgConnector};
pub use postgres::PgConnection;

/// Ligne à insérer dans la table spatiale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    /// Nom d'affichage de la feature
    pub name: String,
    /// Géométrie GeoJSON sérialisée, telle que lue dans le fichier
    pub geometry: String,
}

/// Fabrique de connexions
#[async_trait]
pub trait Connector: Send + Sync {
    type Connection: Connection;

    /// Une tentative de connexion, sans retry
    async fn connect(&self) -> Result<Self::Connection, StoreError>;

    /// Cible lisible pour les logs
    fn describe(&self) -> String;
}

/// Connexion ouverte vers la table cible
///
/// Rendre la connexion (drop) au milieu d'une transaction l'annule.
#[async_trait]
pub trait Connection: Send {
    /// Crée l'extension, la table et l'index spatial s'ils manquent
    ///
    /// Idempotent, et appliqué hors de toute transaction d'insertion.
    async fn ensure_schema(&mut self) -> Result<(), StoreError>;

    async fn begin(&mut self) -> Result<(), StoreError>;

    /// Insère une ligne dans la transaction courante
    ///
    /// Un échec n'invalide pas la transaction : les lignes suivantes
    /// peuvent encore être insérées.
    async fn insert_row(&mut self, row: &NewRow) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    /// Requête triviale de vérification
    async fn ping(&mut self) -> Result<(), StoreError>;
}
