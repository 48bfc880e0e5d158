//! Définition et implémentation des commandes CLI
//!
//! - `ingest` : fichiers GeoJSON → PostGIS
//! - `check` : validation seule (sans base)
//! - `health` : test de connexion

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use futures::stream::{self, StreamExt};
use geofeature::Validator;
use tracing::{error, info, warn};

use geojson_pg::config::{DatabaseConfig, DEFAULT_POOL_SIZE};
use geojson_pg::report::{FileReport, RunReport};
use geojson_pg::store::{Connector, PgConnector};
use geojson_pg::Ingestor;

/// Extensions acceptées lors du parcours des répertoires
const INPUT_EXTENSIONS: [&str; 2] = ["geojson", "json"];

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest GeoJSON files into PostGIS
    Ingest {
        /// GeoJSON files or directories (searched recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Maximum number of files processed concurrently
        #[arg(long, alias = "threads", default_value_t = 4)]
        jobs: usize,

        /// Skip geometry validity checks (structure only)
        #[arg(long)]
        structural_only: bool,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        database: DatabaseArgs,
    },

    /// Validate GeoJSON files without touching the database
    Check {
        /// GeoJSON files or directories (searched recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Skip geometry validity checks (structure only)
        #[arg(long)]
        structural_only: bool,
    },

    /// Check that the database is reachable
    Health {
        #[command(flatten)]
        database: DatabaseArgs,
    },
}

/// Surcharges CLI de la configuration base
#[derive(Args, Debug, Default)]
pub struct DatabaseArgs {
    /// PostgreSQL host, optionally host:port (défaut : env DB_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL port (défaut : env DB_PORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// PostgreSQL database name (défaut : env DB_NAME)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env DB_USER)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env DB_PASS)
    #[arg(long)]
    pub password: Option<String>,

    /// Target table (défaut : env DB_TABLE / geo_data)
    #[arg(long)]
    pub table: Option<String>,

    /// Connection timeout in seconds (défaut : env DB_CONNECT_TIMEOUT / 10)
    #[arg(long)]
    pub connect_timeout: Option<u64>,

    /// SSL mode: disable, prefer, require (défaut : env DB_SSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

/// Exécute la commande ingest
pub async fn cmd_ingest(
    paths: &[PathBuf],
    jobs: usize,
    structural_only: bool,
    report_path: Option<&Path>,
    database: DatabaseArgs,
) -> Result<()> {
    let start = Instant::now();

    let files = collect_inputs(paths)?;
    if files.is_empty() {
        anyhow::bail!("No .geojson or .json files found");
    }
    info!(files = files.len(), jobs, "Starting ingestion");

    let ingestor = build_ingestor(database, select_validator(structural_only), jobs)?;

    let ingestor = &ingestor;
    let reports: Vec<FileReport> = stream::iter(files)
        .map(|path| async move {
            let outcome = ingestor.ingest(&path).await;
            if let Err(e) = &outcome {
                error!(path = %path.display(), kind = e.kind(), "Ingestion failed: {e}");
            }
            FileReport::from_outcome(&path, &outcome)
        })
        .buffer_unordered(jobs.max(1))
        .collect()
        .await;

    let mut report = RunReport::new();
    for file in reports {
        report.record(file);
    }
    report.sort();
    report.set_duration(start.elapsed());
    report.display();

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        info!(report = %path.display(), "Report written");
    }

    if report.has_failures() {
        anyhow::bail!("{}", report.summary());
    }
    info!("{}", report.summary());
    Ok(())
}

/// Exécute la commande check
pub async fn cmd_check(paths: &[PathBuf], structural_only: bool) -> Result<()> {
    let files = collect_inputs(paths)?;
    if files.is_empty() {
        anyhow::bail!("No .geojson or .json files found");
    }

    let validator = select_validator(structural_only);
    let mut invalid_files = 0usize;

    for path in files {
        let checked = tokio::task::spawn_blocking({
            let path = path.clone();
            move || geofeature::load(&path).map(|c| validator.partition(c.features))
        })
        .await
        .context("Validation task panicked")?;

        match checked {
            Ok(partition) => {
                println!(
                    "{}: {} accepted, {} rejected",
                    path.display(),
                    partition.accepted.len(),
                    partition.rejected.len()
                );
                for rejection in &partition.rejected {
                    println!("    {}", rejection.reason);
                }
                if !partition.rejected.is_empty() {
                    invalid_files += 1;
                }
            }
            Err(e) => {
                println!("{}: {}", path.display(), e);
                invalid_files += 1;
            }
        }
    }

    if invalid_files > 0 {
        anyhow::bail!("{} file(s) with invalid content", invalid_files);
    }
    Ok(())
}

/// Exécute la commande health
pub async fn cmd_health(database: DatabaseArgs) -> Result<()> {
    let ingestor = build_ingestor(database, Validator::StructuralOnly, 1)?;
    ingestor
        .health_check()
        .await
        .with_context(|| format!("Database {} unreachable", ingestor.connector().describe()))?;
    println!("Database OK");
    Ok(())
}

fn select_validator(structural_only: bool) -> Validator {
    if structural_only {
        info!("Geometry validity checks disabled");
        Validator::StructuralOnly
    } else {
        Validator::detect()
    }
}

fn build_ingestor(
    database: DatabaseArgs,
    validator: Validator,
    jobs: usize,
) -> Result<Ingestor<PgConnector>> {
    let mut config = DatabaseConfig::from_env();
    apply_database_overrides(&mut config, database);
    reserve_pool_slots(&mut config, jobs);

    let settings = config.resolve()?;
    info!(target_db = %settings.target(), table = %settings.table, "Database configured");

    let connector = PgConnector::new(&settings)?;
    Ok(Ingestor::new(connector, validator))
}

/// Une connexion par fichier en cours : le pool couvre au moins `jobs`
fn reserve_pool_slots(config: &mut DatabaseConfig, jobs: usize) {
    let size = config.pool_size.unwrap_or(DEFAULT_POOL_SIZE).max(jobs);
    config.pool_size = Some(size);
}

fn apply_database_overrides(config: &mut DatabaseConfig, args: DatabaseArgs) {
    if let Some(host) = args.host {
        config.host = Some(host);
    }
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(database) = args.database {
        config.dbname = Some(database);
    }
    if let Some(user) = args.user {
        config.user = Some(user);
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(table) = args.table {
        config.table = Some(table);
    }
    if let Some(timeout) = args.connect_timeout {
        config.connect_timeout_secs = Some(timeout);
    }
    if let Some(ssl) = args.ssl {
        match ssl.parse() {
            Ok(mode) => config.ssl_mode = mode,
            Err(e) => warn!("{e}, keeping {:?}", config.ssl_mode),
        }
    }
}

fn is_input_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INPUT_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Collecte les fichiers GeoJSON
///
/// Un fichier passé explicitement est toujours retenu ; dans les répertoires,
/// seules les extensions connues le sont.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_dir(path, &mut files)
                .with_context(|| format!("Cannot read directory {}", path.display()))?;
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn collect_dir(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            collect_dir(&entry_path, files)?;
        } else if is_input_file(&entry_path) {
            files.push(entry_path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_input_file() {
        assert!(is_input_file(Path::new("a.geojson")));
        assert!(is_input_file(Path::new("dir/b.JSON")));
        assert!(!is_input_file(Path::new("c.shp")));
        assert!(!is_input_file(Path::new("geojson")));
    }

    #[test]
    fn test_collect_inputs_recurses_with_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        for name in ["a.geojson", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        std::fs::write(nested.join("b.json"), "{}").unwrap();

        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.geojson", "b.json"]);
    }

    #[test]
    fn test_explicit_file_is_kept() {
        let files = collect_inputs(&[PathBuf::from("upload.txt")]).unwrap();
        assert_eq!(files, vec![PathBuf::from("upload.txt")]);
    }

    #[test]
    fn test_overrides_replace_env_values() {
        let mut config = DatabaseConfig {
            host: Some("env-host".into()),
            table: Some("env_table".into()),
            ..Default::default()
        };
        apply_database_overrides(
            &mut config,
            DatabaseArgs {
                host: Some("cli-host:6543".into()),
                ssl: Some("require".into()),
                ..Default::default()
            },
        );
        assert_eq!(config.host.as_deref(), Some("cli-host:6543"));
        assert_eq!(config.table.as_deref(), Some("env_table"));
        assert_eq!(config.ssl_mode, geojson_pg::config::SslMode::Require);
    }

    #[test]
    fn test_pool_covers_concurrent_jobs() {
        let mut config = DatabaseConfig::default();
        reserve_pool_slots(&mut config, 8);
        assert_eq!(config.pool_size, Some(8));

        let mut config = DatabaseConfig {
            pool_size: Some(16),
            ..Default::default()
        };
        reserve_pool_slots(&mut config, 8);
        assert_eq!(config.pool_size, Some(16));

        let mut config = DatabaseConfig::default();
        reserve_pool_slots(&mut config, 1);
        assert_eq!(config.pool_size, Some(DEFAULT_POOL_SIZE));
    }
}
