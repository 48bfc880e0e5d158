//! Résultat d'une ingestion

use serde::Serialize;

/// Bilan d'un fichier ingéré
///
/// `attempted` compte les features valides envoyées à la base ;
/// `inserted + skipped == attempted` sauf erreur fatale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionResult {
    pub attempted: usize,
    pub inserted: usize,
    pub skipped: usize,
    /// Rejets de validation, dans l'ordre du fichier
    pub validation_failures: Vec<String>,
    /// Échecs d'insertion ligne à ligne
    pub insertion_failures: Vec<String>,
}

impl IngestionResult {
    /// Features lues dans le fichier (valides et rejetées)
    pub fn total_features(&self) -> usize {
        self.attempted + self.validation_failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.validation_failures.is_empty() && self.insertion_failures.is_empty()
    }

    pub(crate) fn record_inserted(&mut self) {
        self.attempted += 1;
        self.inserted += 1;
    }

    /// Échec d'insertion : compté et consigné
    pub(crate) fn record_failed(&mut self, reason: String) {
        self.attempted += 1;
        self.skipped += 1;
        self.insertion_failures.push(reason);
    }

    /// Feature écartée sans tentative d'insertion (ni succès, ni échec)
    pub(crate) fn record_skipped(&mut self) {
        self.attempted += 1;
        self.skipped += 1;
    }
}
