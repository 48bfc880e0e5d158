//! Connexion PostGIS : schéma, transaction et insertion des features

use async_trait::async_trait;
use deadpool_postgres::Object;
use tracing::{debug, info, warn};

use super::{Connection, NewRow};
use crate::error::StoreError;

/// Clé du verrou consultatif pris pendant la création du schéma
const SCHEMA_LOCK_KEY: &str = "geojson_pg_schema";

/// Connexion PostGIS issue du pool
///
/// Si elle est rendue pendant une transaction ouverte, la connexion est
/// détachée du pool et fermée : le serveur annule alors la transaction.
pub struct PgConnection {
    client: Option<Object>,
    table: String,
    in_transaction: bool,
}

impl PgConnection {
    /// `table` doit être un identifiant déjà validé (voir `config`)
    pub fn new(client: Object, table: &str) -> Self {
        Self {
            client: Some(client),
            table: table.to_string(),
            in_transaction: false,
        }
    }

    fn client(&self) -> Result<&Object, StoreError> {
        self.client.as_ref().ok_or(StoreError::Released)
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (name, geom) VALUES ($1, ST_SetSRID(ST_GeomFromGeoJSON($2::text), 4326))",
            self.table
        )
    }

    /// Vrai entre `BEGIN` et la fin de la transaction courante
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Crée l'extension dans la transaction courante, sous savepoint
    async fn ensure_postgis(&self) -> Result<(), StoreError> {
        let client = self.client()?;
        client.batch_execute("SAVEPOINT postgis_extension").await?;

        // L'extension peut exister sans que l'utilisateur ait le droit de la créer
        match client
            .batch_execute("CREATE EXTENSION IF NOT EXISTS postgis")
            .await
        {
            Ok(()) => client.batch_execute("RELEASE SAVEPOINT postgis_extension").await?,
            Err(e) => {
                warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
                client
                    .batch_execute("ROLLBACK TO SAVEPOINT postgis_extension")
                    .await?;
                let exists = client
                    .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
                    .await?
                    .is_some();
                if !exists {
                    return Err(StoreError::Backend(format!(
                        "PostGIS extension is not installed and could not be created: {e}"
                    )));
                }
            }
        }
        Ok(())
    }

    async fn apply_schema(&self) -> Result<(), StoreError> {
        let client = self.client()?;

        // Verrou consultatif global : l'extension est commune à la base et
        // plusieurs fichiers peuvent créer la même table en parallèle
        client
            .execute("SELECT pg_advisory_xact_lock(hashtext($1::text))", &[&SCHEMA_LOCK_KEY])
            .await?;

        self.ensure_postgis().await?;

        let table = &self.table;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id SERIAL PRIMARY KEY,
                name TEXT,
                geom GEOMETRY(Geometry, 4326),
                uploaded_at TIMESTAMP DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_geom ON {table} USING GIST (geom);"
        );
        client.batch_execute(&ddl).await?;
        Ok(())
    }
}

#[async_trait]
impl Connection for PgConnection {
    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.client()?.batch_execute("BEGIN").await?;
        self.in_transaction = true;

        match self.apply_schema().await {
            Ok(()) => self.client()?.batch_execute("COMMIT").await?,
            Err(e) => {
                // Rollback raté : la connexion reste marquée et sera jetée au drop
                match self.client()?.batch_execute("ROLLBACK").await {
                    Ok(()) => self.in_transaction = false,
                    Err(rollback) => warn!("Rollback after schema failure failed: {rollback}"),
                }
                return Err(e);
            }
        }
        self.in_transaction = false;

        info!(table = %self.table, "Schema ready");
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        self.client()?.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        debug!(table = %self.table, "Transaction started");
        Ok(())
    }

    async fn insert_row(&mut self, row: &NewRow) -> Result<(), StoreError> {
        let sql = self.insert_sql();
        let client = self.client()?;

        // Une erreur SQL invalide toute la transaction : chaque ligne a son savepoint
        client.batch_execute("SAVEPOINT feature_row").await?;

        let inserted = async {
            let stmt = client.prepare_cached(&sql).await?;
            client.execute(&stmt, &[&row.name, &row.geometry]).await
        }
        .await;

        match inserted {
            Ok(_) => {
                client.batch_execute("RELEASE SAVEPOINT feature_row").await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = client
                    .batch_execute("ROLLBACK TO SAVEPOINT feature_row; RELEASE SAVEPOINT feature_row")
                    .await
                {
                    warn!("Rollback to savepoint failed: {rollback}");
                }
                Err(e.into())
            }
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.client()?.batch_execute("COMMIT").await?;
        self.in_transaction = false;
        debug!(table = %self.table, "Transaction committed");
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.client()?.execute("SELECT 1", &[]).await?;
        Ok(())
    }
}

impl Drop for PgConnection {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        if let Some(client) = self.client.take() {
            warn!(table = %self.table, "Connection released with an open transaction, discarding it");
            drop(Object::take(client));
        }
    }
}
