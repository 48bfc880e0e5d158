//! Point d'entrée CLI pour geojson-pg

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Ingérer des fichiers GeoJSON dans PostGIS
#[derive(Parser)]
#[command(name = "geojson-pg")]
#[command(author, version)]
#[command(about = "Valider et ingérer des FeatureCollections GeoJSON dans PostGIS")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Ingest {
            paths,
            jobs,
            structural_only,
            report,
            database,
        } => {
            info!(inputs = paths.len(), "Ingestion vers PostGIS");
            cli::cmd_ingest(&paths, jobs, structural_only, report.as_deref(), database).await?;
        }
        Commands::Check {
            paths,
            structural_only,
        } => {
            cli::cmd_check(&paths, structural_only).await?;
        }
        Commands::Health { database } => {
            cli::cmd_health(database).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
