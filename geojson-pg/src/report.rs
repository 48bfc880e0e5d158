//! Rapport d'exécution multi-fichiers
//!
//! Un `FileReport` par fichier (résultat ou erreur fatale), agrégés dans un
//! `RunReport` affichable sur la console ou sérialisable en JSON.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::error::IngestError;
use crate::pipeline::IngestionResult;

/// Statut d'un fichier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Toutes les features insérées
    Success,
    /// Insertions réussies avec des rejets
    PartialSuccess,
    /// Erreur fatale, ou aucune feature insérée malgré des rejets
    Failed,
}

/// Résultat d'un fichier
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Absent si le fichier a échoué fatalement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<IngestionResult>,
    /// Libellé stable de l'erreur fatale (`IngestError::kind`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn from_outcome(path: &Path, outcome: &Result<IngestionResult, IngestError>) -> Self {
        match outcome {
            Ok(result) => Self::completed(path, result.clone()),
            Err(e) => Self::failed(path, e),
        }
    }

    pub fn completed(path: &Path, result: IngestionResult) -> Self {
        let has_errors = !result.is_complete();
        let has_success = result.inserted > 0;

        let status = if has_errors && has_success {
            FileStatus::PartialSuccess
        } else if has_errors {
            FileStatus::Failed
        } else {
            FileStatus::Success
        };

        Self {
            path: path.to_path_buf(),
            status,
            result: Some(result),
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(path: &Path, error: &IngestError) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed,
            result: None,
            error_kind: Some(error.kind().to_string()),
            error: Some(error.to_string()),
        }
    }
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub duration_secs: f64,

    // Compteurs globaux
    pub files_processed: usize,
    pub files_failed: usize,
    pub features_inserted: usize,
    pub features_skipped: usize,
    pub features_rejected: usize,

    pub files: Vec<FileReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute le rapport d'un fichier
    pub fn record(&mut self, file: FileReport) {
        self.files_processed += 1;
        if file.status == FileStatus::Failed {
            self.files_failed += 1;
        }
        if let Some(result) = &file.result {
            self.features_inserted += result.inserted;
            self.features_skipped += result.skipped;
            self.features_rejected += result.validation_failures.len();
        }
        self.files.push(file);
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }

    /// Trie les fichiers par chemin (l'ordre de traitement est non déterministe)
    pub fn sort(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("INGESTION REPORT");
        println!("{}", "=".repeat(60));

        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Files: {} processed, {} failed",
            self.files_processed, self.files_failed
        );
        println!(
            "Features: {} inserted, {} skipped, {} rejected",
            self.features_inserted, self.features_skipped, self.features_rejected
        );

        println!("\n--- FILES ---");
        for file in &self.files {
            match (&file.result, &file.error) {
                (Some(r), _) => println!(
                    "  {:?} {}: {} inserted, {} skipped, {} rejected",
                    file.status,
                    file.path.display(),
                    r.inserted,
                    r.skipped,
                    r.validation_failures.len()
                ),
                (None, Some(e)) => println!("  {:?} {}: {}", file.status, file.path.display(), e),
                (None, None) => println!("  {:?} {}", file.status, file.path.display()),
            }

            if let Some(r) = &file.result {
                let reasons: Vec<&String> = r
                    .validation_failures
                    .iter()
                    .chain(&r.insertion_failures)
                    .collect();
                for reason in reasons.iter().take(10) {
                    println!("      {}", reason);
                }
                if reasons.len() > 10 {
                    println!("      ... and {} more", reasons.len() - 10);
                }
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} files ({} failed): {} inserted, {} skipped, {} rejected",
            self.files_processed,
            self.files_failed,
            self.features_inserted,
            self.features_skipped,
            self.features_rejected
        )
    }
}
