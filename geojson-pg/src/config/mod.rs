//! Configuration de la connexion PostGIS
//!
//! `DatabaseConfig` rassemble les valeurs brutes (environnement puis CLI),
//! `resolve()` les valide une fois pour produire des `ConnectionSettings`.

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::warn;

use crate::error::IngestError;

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const DEFAULT_TABLE: &str = "geo_data";

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(format!("Invalid SSL mode: {}. Use: disable, prefer, require", s)),
        }
    }
}

/// Valeurs de configuration brutes, toutes optionnelles
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Hôte, éventuellement au format `host:port`
    pub host: Option<String>,
    pub port: Option<u16>,
    pub dbname: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub ssl_mode: SslMode,
    pub pool_size: Option<usize>,
    pub table: Option<String>,
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Charge la configuration depuis une source clé/valeur quelconque
    ///
    /// Les valeurs vides sont ignorées. `DB_USERNAME` et `DB_PASSWORD` sont
    /// acceptés en second choix.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            host: get("DB_HOST"),
            port: parse_or_warn(get("DB_PORT"), "DB_PORT"),
            dbname: get("DB_NAME"),
            user: get("DB_USER").or_else(|| get("DB_USERNAME")),
            password: get("DB_PASS").or_else(|| get("DB_PASSWORD")),
            connect_timeout_secs: parse_or_warn(get("DB_CONNECT_TIMEOUT"), "DB_CONNECT_TIMEOUT"),
            ssl_mode: parse_or_warn(get("DB_SSLMODE"), "DB_SSLMODE").unwrap_or_default(),
            pool_size: parse_or_warn(get("DB_POOL_SIZE"), "DB_POOL_SIZE"),
            table: get("DB_TABLE"),
        }
    }

    /// Valide la configuration
    ///
    /// # Errors
    ///
    /// `IngestError::Configuration` si une valeur requise manque (hôte, base,
    /// utilisateur, mot de passe), si le port embarqué dans l'hôte est
    /// invalide, ou si le nom de table n'est pas un identifiant SQL simple.
    pub fn resolve(&self) -> Result<ConnectionSettings, IngestError> {
        let missing: Vec<&str> = [
            ("host", self.host.is_none()),
            ("database", self.dbname.is_none()),
            ("user", self.user.is_none()),
            ("password", self.password.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (Some(raw_host), Some(dbname), Some(user), Some(password)) =
            (&self.host, &self.dbname, &self.user, &self.password)
        else {
            return Err(IngestError::Configuration(format!(
                "missing required database settings: {}",
                missing.join(", ")
            )));
        };

        let (host, embedded_port) = split_host_port(raw_host)?;
        let port = embedded_port.or(self.port).unwrap_or(DEFAULT_PORT);

        let table = self.table.clone().unwrap_or_else(|| DEFAULT_TABLE.to_string());
        if !is_valid_identifier(&table) {
            return Err(IngestError::Configuration(format!(
                "invalid table name: '{}'",
                table
            )));
        }

        Ok(ConnectionSettings {
            host,
            port,
            dbname: dbname.clone(),
            user: user.clone(),
            password: password.clone(),
            connect_timeout: Duration::from_secs(
                self.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            ssl_mode: self.ssl_mode,
            pool_size: self.pool_size.unwrap_or(DEFAULT_POOL_SIZE).max(1),
            table,
        })
    }
}

fn parse_or_warn<T: std::str::FromStr>(value: Option<String>, key: &str) -> Option<T> {
    let value = value?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, value = %value, "Ignoring unparsable configuration value");
            None
        }
    }
}

/// Configuration validée, prête pour la création du pool
#[derive(Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub connect_timeout: Duration,
    pub ssl_mode: SslMode,
    pub pool_size: usize,
    /// Table cible (identifiant validé)
    pub table: String,
}

impl ConnectionSettings {
    /// Cible lisible pour les logs, sans mot de passe
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

impl fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .field("connect_timeout", &self.connect_timeout)
            .field("ssl_mode", &self.ssl_mode)
            .field("pool_size", &self.pool_size)
            .field("table", &self.table)
            .finish()
    }
}

/// Sépare un hôte au format `host:port` (ou `[ipv6]:port`)
///
/// Une adresse IPv6 nue (plusieurs `:`) est rendue telle quelle.
pub fn split_host_port(raw: &str) -> Result<(String, Option<u16>), IngestError> {
    let raw = raw.trim();

    let (host, port) = if let Some(rest) = raw.strip_prefix('[') {
        let Some((host, after)) = rest.split_once(']') else {
            return Err(IngestError::Configuration(format!(
                "invalid host: '{}'",
                raw
            )));
        };
        (host, after.strip_prefix(':'))
    } else if raw.matches(':').count() == 1 {
        let (host, port) = raw.split_once(':').unwrap_or((raw, ""));
        (host, Some(port))
    } else {
        (raw, None)
    };

    if host.is_empty() {
        return Err(IngestError::Configuration(format!(
            "invalid host: '{}'",
            raw
        )));
    }

    let port = port
        .map(|p| {
            p.parse::<u16>().map_err(|_| {
                IngestError::Configuration(format!("invalid port '{}' in host '{}'", p, raw))
            })
        })
        .transpose()?;

    Ok((host.to_string(), port))
}

/// Identifiant SQL non quoté (lettres, chiffres, `_`, 63 caractères max)
pub fn is_valid_identifier(name: &str) -> bool {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name))
}
