//! Pool de connexions PostgreSQL

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, SslMode as PgSslMode, Timeouts};
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

use super::{Connector, PgConnection};
use crate::config::{ConnectionSettings, SslMode};
use crate::error::{IngestError, StoreError};

/// Crée la configuration TLS pour rustls
fn make_tls_connector() -> MakeRustlsConnect {
    let root_store = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    MakeRustlsConnect::new(config)
}

/// Crée un pool de connexions
///
/// Aucune connexion n'est ouverte ici : le pool se remplit à la demande.
pub fn create_pool(settings: &ConnectionSettings) -> Result<Pool, IngestError> {
    let mut cfg = Config::new();
    cfg.host = Some(settings.host.clone());
    cfg.port = Some(settings.port);
    cfg.dbname = Some(settings.dbname.clone());
    cfg.user = Some(settings.user.clone());
    cfg.password = Some(settings.password.clone());
    cfg.connect_timeout = Some(settings.connect_timeout);

    // Pas de délai d'attente d'un slot libre : un pool saturé n'est pas une
    // panne de connexion, seule l'ouverture d'une connexion est bornée
    cfg.pool = Some(PoolConfig {
        max_size: settings.pool_size,
        timeouts: Timeouts {
            wait: None,
            create: Some(settings.connect_timeout),
            recycle: Some(settings.connect_timeout),
        },
        ..Default::default()
    });

    // `Require` doit être transmis au driver, sinon un refus TLS du serveur
    // retombe en clair
    let pool = match settings.ssl_mode {
        SslMode::Disable => {
            cfg.ssl_mode = Some(PgSslMode::Disable);
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        }
        SslMode::Prefer => {
            cfg.ssl_mode = Some(PgSslMode::Prefer);
            cfg.create_pool(Some(Runtime::Tokio1), make_tls_connector())
        }
        SslMode::Require => {
            cfg.ssl_mode = Some(PgSslMode::Require);
            cfg.create_pool(Some(Runtime::Tokio1), make_tls_connector())
        }
    };

    pool.map_err(|e| IngestError::Configuration(format!("failed to create database pool: {e}")))
}

/// `Connector` PostGIS adossé à un pool partagé
///
/// Le pool est créé une fois par processus et cloné entre les tâches.
#[derive(Clone)]
pub struct PgConnector {
    pool: Pool,
    table: String,
    target: String,
}

impl PgConnector {
    pub fn new(settings: &ConnectionSettings) -> Result<Self, IngestError> {
        Ok(Self {
            pool: create_pool(settings)?,
            table: settings.table.clone(),
            target: settings.target(),
        })
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, StoreError> {
        let client = self.pool.get().await?;
        debug!(target_db = %self.target, "Connection acquired from pool");
        Ok(PgConnection::new(client, &self.table))
    }

    fn describe(&self) -> String {
        format!("{} (table {})", self.target, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn settings(port: u16, ssl_mode: SslMode) -> ConnectionSettings {
        ConnectionSettings {
            host: "127.0.0.1".to_string(),
            port,
            dbname: "gis".to_string(),
            user: "loader".to_string(),
            password: "secret".to_string(),
            connect_timeout: Duration::from_secs(5),
            ssl_mode,
            pool_size: 2,
            table: "geo_data".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pool_is_lazy_and_sized_from_settings() {
        let pool = create_pool(&settings(1, SslMode::Disable)).unwrap();
        let status = pool.status();
        assert_eq!(status.max_size, 2);
        assert_eq!(status.size, 0);
        assert!(pool.timeouts().wait.is_none());
    }

    #[tokio::test]
    async fn test_require_never_falls_back_to_plaintext() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Serveur qui refuse TLS puis enregistre tout ce qu'il reçoit ensuite
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut ssl_request = [0u8; 8];
            socket.read_exact(&mut ssl_request).await.unwrap();
            socket.write_all(b"N").await.unwrap();

            let mut after = Vec::new();
            let _ = socket.read_to_end(&mut after).await;
            (ssl_request, after)
        });

        let connector = PgConnector::new(&settings(port, SslMode::Require)).unwrap();
        assert!(connector.connect().await.is_err());

        let (ssl_request, after) = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        // Longueur 8, code SSLRequest 80877103
        assert_eq!(ssl_request, [0, 0, 0, 8, 4, 210, 22, 47]);
        assert!(after.is_empty(), "startup message sent in plaintext: {after:?}");
    }
}
